// Report Parser
// Line-oriented state machine turning a free-text explanation into an AnalysisReport

use crate::models::{AnalysisReport, NO_RISK_FACTOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Summary,
    Risk,
    Explanation,
    Action,
}

/// Header keywords in match priority order: (localized, english, section)
const HEADERS: [(&str, &str, Section); 4] = [
    ("摘要", "summary", Section::Summary),
    ("风险因素", "risk", Section::Risk),
    ("解释", "explain", Section::Explanation),
    ("建议", "action", Section::Action),
];

fn header_section(line: &str) -> Option<Section> {
    let lower = line.to_lowercase();
    HEADERS
        .iter()
        .find(|(local, english, _)| line.contains(local) || lower.contains(english))
        .map(|&(_, _, section)| section)
}

fn bullet_content(line: &str) -> Option<&str> {
    if line.starts_with('-') || line.starts_with('•') {
        Some(line.trim_start_matches(['-', '•', ' ']).trim())
    } else {
        None
    }
}

fn append(field: &mut String, line: &str) {
    field.push_str(line);
    field.push(' ');
}

/// Parse an explanation reply. Total: any input yields a populated report.
pub fn parse_report(content: &str) -> AnalysisReport {
    let mut summary = String::new();
    let mut risk_factors: Vec<String> = Vec::new();
    let mut explanation = String::new();
    let mut action_suggestion = String::new();
    let mut section = Section::None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        // header lines carry no content
        if let Some(next) = header_section(line) {
            section = next;
            continue;
        }

        match section {
            Section::None => {}
            Section::Summary => append(&mut summary, line),
            Section::Explanation => append(&mut explanation, line),
            Section::Action => append(&mut action_suggestion, line),
            Section::Risk => {
                if let Some(item) = bullet_content(line) {
                    risk_factors.push(item.to_string());
                }
            }
        }
    }

    if risk_factors.is_empty() {
        risk_factors.push(NO_RISK_FACTOR.to_string());
    }

    AnalysisReport {
        summary: summary.trim().to_string(),
        risk_factors,
        explanation: explanation.trim().to_string(),
        action_suggestion: action_suggestion.trim().to_string(),
    }
}
