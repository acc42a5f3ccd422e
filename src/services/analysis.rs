// Analysis Orchestrator
// Translation, classification and LLM explanation for a single message

use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{
    AnalysisOutcome, EvaluationMetrics, LabeledExample, ModelComparison, ModelSlot, PredictionResult,
};
use crate::services::classification::ClassifierBank;
use crate::services::errors::{AnalysisError, ClassifierError};
use crate::services::providers::{ChatClient, ChatPrompt};
use crate::services::report_parser::parse_report;
use crate::services::translation::TranslationBridge;

/// Slot used when the caller does not name one
pub const DEFAULT_SLOT: ModelSlot = ModelSlot::LightGbm;

pub const EXPLANATION_TEMPERATURE: f64 = 0.3;
pub const EXPLANATION_MAX_TOKENS: i32 = 1000;

const EXPLANATION_SYSTEM_PROMPT: &str = "你是一个专业的垃圾短信分析专家，擅长识别和分析垃圾短信的特征。";

fn explanation_prompt(text: &str, prediction: &PredictionResult) -> ChatPrompt {
    let user = format!(
        "你是一个专业的垃圾短信分析专家。请分析以下短信内容，并提供详细的分析报告。

短信内容: {text}

预测结果:
- 是否为垃圾短信: {is_spam}
- 垃圾短信概率: {probability:.2}%
- 使用的模型: {model}

请提供以下分析:
1. 简要摘要短信内容（不超过50字）
2. 识别出导致预测结果的关键风险因素（如：中奖信息、紧急通知、诱导点击等）
3. 解释为什么模型会做出这样的预测
4. 根据预测结果，给出具体的行动建议（如：删除、举报、忽略等）

请用中文回答，保持专业和客观。",
        text = text,
        is_spam = prediction.is_spam,
        probability = prediction.probability * 100.0,
        model = prediction.model_used,
    );
    ChatPrompt {
        system: EXPLANATION_SYSTEM_PROMPT.to_string(),
        user,
        temperature: EXPLANATION_TEMPERATURE,
        max_tokens: EXPLANATION_MAX_TOKENS,
    }
}

/// Entry point for callers. Holds the bank for the life of the process;
/// share it behind an `Arc` once training or loading is done.
pub struct AnalysisOrchestrator {
    bank: ClassifierBank,
    translator: TranslationBridge,
    client: Arc<dyn ChatClient>,
}

impl AnalysisOrchestrator {
    pub fn new(bank: ClassifierBank, client: Arc<dyn ChatClient>) -> Self {
        Self {
            bank,
            translator: TranslationBridge::new(client.clone()),
            client,
        }
    }

    pub fn bank(&self) -> &ClassifierBank {
        &self.bank
    }

    fn classify(&self, slot: ModelSlot, text: &str) -> Result<PredictionResult, ClassifierError> {
        let (label, probability) = self.bank.predict(slot, text)?;
        Ok(PredictionResult {
            is_spam: label.is_spam(),
            probability,
            model_used: slot,
        })
    }

    /// Classify a message and ask the LLM to explain the decision.
    /// Translation failures degrade silently; explanation failures propagate.
    pub async fn analyze(&self, text: &str, slot: ModelSlot) -> Result<AnalysisOutcome, AnalysisError> {
        let translation = self.translator.maybe_translate(text).await;
        let prediction = self.classify(slot, translation.text())?;
        info!(
            "[ANALYZE] slot={} is_spam={} probability={:.4}",
            slot, prediction.is_spam, prediction.probability
        );

        let reply = self
            .client
            .chat(explanation_prompt(text, &prediction))
            .await
            .map_err(|e| {
                warn!("[ANALYZE] explanation request failed: {}", e);
                AnalysisError::ExplanationRequest(e)
            })?;
        info!("[ANALYZE] explanation received in {}ms", reply.latency_ms);

        Ok(AnalysisOutcome {
            prediction,
            analysis: parse_report(&reply.content),
            translation_failure: translation.failure().map(str::to_string),
        })
    }

    /// Same as `analyze`, with the slot given by identifier
    pub async fn analyze_named(&self, text: &str, slot: &str) -> Result<AnalysisOutcome, AnalysisError> {
        let slot: ModelSlot = slot.parse()?;
        self.analyze(text, slot).await
    }

    /// Predict with both slots on one translation and report whether they agree
    pub async fn compare(&self, text: &str) -> Result<ModelComparison, ClassifierError> {
        let translation = self.translator.maybe_translate(text).await;
        let logistic_regression = self.classify(ModelSlot::LogReg, translation.text())?;
        let lightgbm = self.classify(ModelSlot::LightGbm, translation.text())?;
        let agreement = logistic_regression.is_spam == lightgbm.is_spam;
        info!("[ANALYZE] compare agreement={}", agreement);

        Ok(ModelComparison {
            logistic_regression,
            lightgbm,
            agreement,
        })
    }

    /// Retrain one slot in place; not to be run concurrently with inference
    pub fn train(&mut self, slot: ModelSlot, data: &[LabeledExample]) -> Result<(), ClassifierError> {
        self.bank.train(slot, data)
    }

    pub fn evaluate(&self, slot: ModelSlot, data: &[LabeledExample]) -> Result<EvaluationMetrics, ClassifierError> {
        self.bank.evaluate(slot, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NO_RISK_FACTOR;
    use crate::services::classification::bank::tests::{small_config, trained_bank, training_examples};
    use crate::services::providers::{ChatResult, ProviderError};
    use crate::services::translation::tests::StubChat;
    use crate::services::translation::TRANSLATION_TEMPERATURE;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TRANSLATED: &str =
        "Congratulations you have won an iPhone Pro Max, click the link to claim your prize: http://fake-link.com";
    const EXPLANATION: &str = "摘要:\n中奖诈骗短信\n风险因素:\n- 中奖信息\n- 诱导点击链接\n解释:\n典型的中奖诱导\n建议:\n直接删除";

    /// Answers translation and explanation prompts differently
    struct ScriptedChat {
        translations: AtomicUsize,
        explanations: AtomicUsize,
        fail_translation: bool,
        fail_explanation: bool,
    }

    impl ScriptedChat {
        fn new(fail_explanation: bool) -> Self {
            Self {
                translations: AtomicUsize::new(0),
                explanations: AtomicUsize::new(0),
                fail_translation: false,
                fail_explanation,
            }
        }

        fn failing_translation() -> Self {
            Self {
                fail_translation: true,
                ..Self::new(false)
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn chat(&self, prompt: ChatPrompt) -> Result<ChatResult, ProviderError> {
            if prompt.temperature == TRANSLATION_TEMPERATURE {
                self.translations.fetch_add(1, Ordering::SeqCst);
                if self.fail_translation {
                    return Err(ProviderError::ApiError {
                        status: 502,
                        message: "bad gateway".to_string(),
                    });
                }
                return Ok(ChatResult {
                    content: TRANSLATED.to_string(),
                    latency_ms: 1,
                });
            }
            self.explanations.fetch_add(1, Ordering::SeqCst);
            if self.fail_explanation {
                return Err(ProviderError::MissingContent);
            }
            Ok(ChatResult {
                content: EXPLANATION.to_string(),
                latency_ms: 1,
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    const SCENARIO: &str = "恭喜您获得iPhone 15 Pro Max，点击链接领取：http://fake-link.com";

    #[tokio::test]
    async fn test_chinese_prize_message_scenario() {
        let chat = Arc::new(ScriptedChat::new(false));
        let orchestrator = AnalysisOrchestrator::new(trained_bank(), chat.clone());

        let outcome = orchestrator.analyze(SCENARIO, ModelSlot::LightGbm).await.unwrap();
        assert!(outcome.prediction.is_spam);
        assert!(outcome.prediction.probability > 0.5);
        assert_eq!(outcome.prediction.model_used, ModelSlot::LightGbm);
        assert_eq!(outcome.analysis.summary, "中奖诈骗短信");
        assert_eq!(outcome.analysis.risk_factors, vec!["中奖信息", "诱导点击链接"]);
        assert_eq!(outcome.analysis.action_suggestion, "直接删除");
        assert!(outcome.translation_failure.is_none());
        assert_eq!(chat.translations.load(Ordering::SeqCst), 1);
        assert_eq!(chat.explanations.load(Ordering::SeqCst), 1);

        let comparison = orchestrator.compare(SCENARIO).await.unwrap();
        assert!(comparison.logistic_regression.is_spam);
        assert!(comparison.logistic_regression.probability > 0.5);
        assert!(comparison.lightgbm.is_spam);
        assert!(comparison.lightgbm.probability > 0.5);
        assert!(comparison.agreement);
        assert_eq!(chat.translations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explanation_failure_is_surfaced() {
        let chat = Arc::new(ScriptedChat::new(true));
        let orchestrator = AnalysisOrchestrator::new(trained_bank(), chat.clone());
        let err = orchestrator
            .analyze("are we still meeting for lunch tomorrow", ModelSlot::LogReg)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ExplanationRequest(ProviderError::MissingContent)));
        assert_eq!(chat.translations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_analyze_survives_translation_failure() {
        let chat = Arc::new(ScriptedChat::failing_translation());
        let orchestrator = AnalysisOrchestrator::new(trained_bank(), chat.clone());
        let text = "中奖了 claim your prize";

        let outcome = orchestrator.analyze(text, ModelSlot::LogReg).await.unwrap();
        let failure = outcome.translation_failure.as_deref().unwrap();
        assert!(failure.contains("502"), "failure: {}", failure);

        // classified on the untranslated text
        let (_, expected) = orchestrator.bank().predict(ModelSlot::LogReg, text).unwrap();
        assert_eq!(outcome.prediction.probability, expected);
        assert_eq!(outcome.prediction.model_used, ModelSlot::LogReg);

        assert_eq!(outcome.analysis.summary, "中奖诈骗短信");
        assert_eq!(outcome.analysis.risk_factors, vec!["中奖信息", "诱导点击链接"]);
        assert_eq!(outcome.analysis.explanation, "典型的中奖诱导");
        assert_eq!(chat.translations.load(Ordering::SeqCst), 1);
        assert_eq!(chat.explanations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compare_survives_translation_failure() {
        // compare makes no explanation call, so the failed translation is the only one
        let stub = Arc::new(StubChat::failing());
        let orchestrator = AnalysisOrchestrator::new(trained_bank(), stub.clone());
        let comparison = orchestrator.compare("中奖了 claim your prize").await.unwrap();
        assert_eq!(comparison.logistic_regression.model_used, ModelSlot::LogReg);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unloaded_slot_fails_before_explanation() {
        let chat = Arc::new(ScriptedChat::new(false));
        let orchestrator = AnalysisOrchestrator::new(ClassifierBank::new(small_config()), chat.clone());
        let err = orchestrator.analyze("hello", ModelSlot::LogReg).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Classifier(ClassifierError::ModelNotLoaded(ModelSlot::LogReg))
        ));
        assert_eq!(chat.explanations.load(Ordering::SeqCst), 0);

        let err = orchestrator.analyze_named("hello", "svm").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Classifier(ClassifierError::UnknownSlot(_))));
    }

    #[tokio::test]
    async fn test_train_then_evaluate_through_orchestrator() {
        let chat = Arc::new(ScriptedChat::new(false));
        let mut orchestrator = AnalysisOrchestrator::new(ClassifierBank::new(small_config()), chat);
        let data = training_examples();
        orchestrator.train(ModelSlot::LogReg, &data).unwrap();
        let metrics = orchestrator.evaluate(ModelSlot::LogReg, &data).unwrap();
        assert_eq!(metrics.classification_report.weighted_avg.support, data.len());
        assert!(orchestrator.bank().is_loaded(ModelSlot::LogReg));
        assert!(!orchestrator.bank().is_loaded(ModelSlot::LightGbm));

        let outcome = orchestrator.analyze("running late", ModelSlot::LogReg).await.unwrap();
        assert_ne!(outcome.analysis.risk_factors, vec![NO_RISK_FACTOR]);
    }
}
