// Translation Bridge
// Translates CJK-script messages to English before classification

use std::sync::Arc;
use tracing::{info, warn};

use crate::services::providers::{ChatClient, ChatPrompt};
use crate::services::text_processor::is_foreign_script;

pub const TRANSLATION_TEMPERATURE: f64 = 0.1;
pub const TRANSLATION_MAX_TOKENS: i32 = 500;

const TRANSLATION_SYSTEM_PROMPT: &str =
    "你是一个专业的翻译助手。请将中文短信翻译成英文，保持原意不变，不要添加任何额外内容。";

/// Outcome of a translation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Translated(String),
    /// Input returned unchanged; `failure` is set when a request was made and failed
    Original { text: String, failure: Option<String> },
}

impl Translation {
    pub fn text(&self) -> &str {
        match self {
            Self::Translated(text) | Self::Original { text, .. } => text,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Original { failure, .. } => failure.as_deref(),
            Self::Translated(_) => None,
        }
    }
}

pub struct TranslationBridge {
    client: Arc<dyn ChatClient>,
}

impl TranslationBridge {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    fn prompt(text: &str) -> ChatPrompt {
        ChatPrompt {
            system: TRANSLATION_SYSTEM_PROMPT.to_string(),
            user: format!("请将以下中文短信翻译成英文：\n\n{}", text),
            temperature: TRANSLATION_TEMPERATURE,
            max_tokens: TRANSLATION_MAX_TOKENS,
        }
    }

    /// Translate when the text contains CJK ideographs; never fails
    pub async fn maybe_translate(&self, text: &str) -> Translation {
        if !is_foreign_script(text) {
            return Translation::Original {
                text: text.to_string(),
                failure: None,
            };
        }

        info!("[TRANSLATE] CJK text detected, requesting translation");
        match self.client.chat(Self::prompt(text)).await {
            Ok(result) => {
                let translated = result.content.trim().to_string();
                info!(
                    "[TRANSLATE] done in {}ms: {}",
                    result.latency_ms, translated
                );
                Translation::Translated(translated)
            }
            Err(e) => {
                warn!("[TRANSLATE] failed, using original text: {}", e);
                Translation::Original {
                    text: text.to_string(),
                    failure: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::providers::{ChatResult, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub client replying with a fixed string, or failing when `reply` is None
    pub(crate) struct StubChat {
        pub reply: Option<String>,
        pub calls: AtomicUsize,
    }

    impl StubChat {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatClient for StubChat {
        async fn chat(&self, _prompt: ChatPrompt) -> Result<ChatResult, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(content) => Ok(ChatResult {
                    content: content.clone(),
                    latency_ms: 1,
                }),
                None => Err(ProviderError::ApiError {
                    status: 503,
                    message: "unavailable".to_string(),
                }),
            }
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_ascii_text_skips_network() {
        let stub = Arc::new(StubChat::replying("unused"));
        let bridge = TranslationBridge::new(stub.clone());
        let out = bridge.maybe_translate("Free entry, call now").await;
        assert_eq!(out, Translation::Original { text: "Free entry, call now".into(), failure: None });
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cjk_text_calls_client_once() {
        let stub = Arc::new(StubChat::replying("  Chinese  \n"));
        let bridge = TranslationBridge::new(stub.clone());
        let out = bridge.maybe_translate("\u{4e2d}\u{6587}").await;
        assert_eq!(out, Translation::Translated("Chinese".into()));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_original() {
        let stub = Arc::new(StubChat::failing());
        let bridge = TranslationBridge::new(stub.clone());
        let out = bridge.maybe_translate("中奖了").await;
        assert_eq!(out.text(), "中奖了");
        assert!(out.failure().unwrap().contains("503"));
        assert_eq!(stub.call_count(), 1);
    }

    #[test]
    fn test_prompt_shape() {
        let prompt = TranslationBridge::prompt("你好");
        assert!(prompt.user.ends_with("\n\n你好"));
        assert_eq!(prompt.temperature, 0.1);
        assert_eq!(prompt.max_tokens, 500);
    }
}
