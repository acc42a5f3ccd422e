// Text Processing Service
// Canonical message normalization and script detection

use regex::Regex;
use std::sync::OnceLock;

/// Upper bound on normalization passes; every pass after the first only removes characters
const MAX_NORMALIZE_PASSES: usize = 8;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"http\S+|www\S+|https\S+").expect("valid url pattern"))
}

fn digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit pattern"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

fn cjk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{4e00}-\u{9fff}]").expect("valid cjk pattern"))
}

/// One pass of the fixed five-step pipeline
fn normalize_once(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_urls = url_re().replace_all(&lowered, "");
    let no_digits = digit_re().replace_all(&no_urls, "");
    let no_punct: String = no_digits.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    whitespace_re().replace_all(&no_punct, " ").trim().to_string()
}

/// Normalize raw message text into its canonical model-input form.
///
/// Lowercase, strip URL-like tokens, digit runs and ASCII punctuation, then collapse
/// whitespace. The pass is repeated until stable: removing digits or punctuation can
/// fuse a fresh URL-like token ("ht.tp" -> "http"), and the result must be idempotent.
/// Never fails; input made only of URLs/digits/punctuation yields an empty string.
pub fn normalize(text: &str) -> String {
    let mut current = normalize_once(text);
    for _ in 1..MAX_NORMALIZE_PASSES {
        let next = normalize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

pub fn normalize_batch<S: AsRef<str>>(texts: &[S]) -> Vec<String> {
    texts.iter().map(|t| normalize(t.as_ref())).collect()
}

/// True when the text contains any CJK Unified Ideograph.
/// A script heuristic, not language identification.
pub fn is_foreign_script(text: &str) -> bool {
    cjk_re().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pipeline() {
        let input = "FREE entry!! Call 08002986030 now, visit http://win.example.com/x?a=1 or www.prize.co.uk";
        assert_eq!(normalize(input), "free entry call now visit or");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Hello\t\n  World  "), "hello world");
    }

    #[test]
    fn test_degenerate_input_is_empty() {
        assert_eq!(normalize("12345 !!! https://x.y"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Had your mobile 11 months or more? U R entitled to Update to the latest colour mobiles!",
            "ht.tp//fused and w1w1w.site",
            "恭喜您获得iPhone 15 Pro Max，点击链接领取：http://fake-link.com",
            "ΣΊΣΥΦΟΣ   Straße  İstanbul",
            "...",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_fused_url_token_is_removed() {
        // punctuation removal joins "ht.tp" into a url prefix
        assert_eq!(normalize("see ht.tp//spam now"), "see now");
    }

    #[test]
    fn test_full_width_punctuation_survives() {
        assert_eq!(normalize("你好，世界"), "你好，世界");
    }

    #[test]
    fn test_is_foreign_script() {
        assert!(is_foreign_script("\u{4e2d}\u{6587}"));
        assert!(is_foreign_script("Free prize 领取 now"));
        assert!(!is_foreign_script("plain ascii text"));
        assert!(!is_foreign_script("café naïve"));
    }

    #[test]
    fn test_normalize_batch_preserves_order() {
        let out = normalize_batch(&["B 1", "a!"]);
        assert_eq!(out, vec!["b".to_string(), "a".to_string()]);
    }
}
