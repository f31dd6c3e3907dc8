use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::CompletionConfig;
use crate::llm::{ChatMessage, CompletionRequest, CompletionService};
use crate::prompts::{EMPTY_REPLY_FALLBACK, PERSONA_PROMPT, TECHNICAL_DIFFICULTY_FALLBACK};

/// Anything that can answer one user utterance with one reply.
///
/// Implementations are total: they always produce text and never fail, so the
/// conversation only has to handle a lost task, not an error value.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, user_text: &str) -> String;
}

/// Fixed sampling parameters for every request a generator sends
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl From<&CompletionConfig> for GenerationSettings {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Turns a user utterance into an in-character reply.
///
/// Each call is stateless: the persona instruction and the single user turn
/// are the whole request. Earlier exchanges are never replayed.
#[derive(Clone)]
pub struct ResponseGenerator {
    service: Arc<dyn CompletionService>,
    settings: GenerationSettings,
}

impl ResponseGenerator {
    pub fn new(service: Arc<dyn CompletionService>, settings: GenerationSettings) -> Self {
        Self { service, settings }
    }

    /// Request sent for `user_text`
    pub fn build_request(&self, user_text: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(PERSONA_PROMPT),
                ChatMessage::user(user_text),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// Generate a reply. Failures are logged and replaced by a fallback reply.
    pub async fn generate(&self, user_text: &str) -> String {
        let request = self.build_request(user_text);

        match self.service.complete(&request).await {
            Ok(response) => match response.first_content() {
                Some(content) => {
                    info!(reply_chars = content.chars().count(), "generated reply");
                    content.to_string()
                }
                None => {
                    warn!(
                        choices = response.choices.len(),
                        "completion response carried no content"
                    );
                    EMPTY_REPLY_FALLBACK.to_string()
                }
            },
            Err(e) => {
                error!(error = %e, "error calling completion service");
                TECHNICAL_DIFFICULTY_FALLBACK.to_string()
            }
        }
    }
}

#[async_trait]
impl Responder for ResponseGenerator {
    async fn respond(&self, user_text: &str) -> String {
        self.generate(user_text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRole, CompletionError, CompletionResponse};
    use reqwest::StatusCode;
    use std::sync::Mutex;

    /// Replays one canned outcome and records every request it sees.
    struct StubService {
        outcome: fn() -> Result<CompletionResponse, CompletionError>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl StubService {
        fn new(outcome: fn() -> Result<CompletionResponse, CompletionError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for StubService {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, CompletionError> {
            self.seen.lock().unwrap().push(request.clone());
            (self.outcome)()
        }
    }

    fn settings() -> GenerationSettings {
        GenerationSettings::from(&CompletionConfig::default())
    }

    #[test]
    fn request_carries_persona_and_single_user_turn() {
        let service = StubService::new(|| Ok(CompletionResponse::default()));
        let generator = ResponseGenerator::new(service, settings());

        let request = generator.build_request("What about housing?");
        assert_eq!(request.model, "gpt-3.5-turbo");
        assert_eq!(request.max_tokens, 500);
        assert!((request.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.messages[0].content, PERSONA_PROMPT);
        assert_eq!(request.messages[1].role, ChatRole::User);
        assert_eq!(request.messages[1].content, "What about housing?");
    }

    #[tokio::test]
    async fn returns_generated_content_verbatim() {
        let service = StubService::new(|| Ok(CompletionResponse::with_content("  Welcome.\n")));
        let generator = ResponseGenerator::new(service, settings());
        assert_eq!(generator.generate("Hello").await, "  Welcome.\n");
    }

    #[tokio::test]
    async fn empty_content_uses_the_clarifying_fallback() {
        let service = StubService::new(|| Ok(CompletionResponse::default()));
        let generator = ResponseGenerator::new(service, settings());
        assert_eq!(generator.generate("Hello").await, EMPTY_REPLY_FALLBACK);
    }

    #[tokio::test]
    async fn service_errors_use_the_technical_fallback() {
        let service = StubService::new(|| {
            Err(CompletionError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "boom".to_string(),
            })
        });
        let generator = ResponseGenerator::new(service, settings());
        assert_eq!(generator.generate("Hello").await, TECHNICAL_DIFFICULTY_FALLBACK);

        let service = StubService::new(|| {
            Err(CompletionError::Decode(
                serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
            ))
        });
        let generator = ResponseGenerator::new(service, settings());
        assert_eq!(generator.generate("Hello").await, TECHNICAL_DIFFICULTY_FALLBACK);
    }

    #[tokio::test]
    async fn calls_are_independent_of_earlier_exchanges() {
        let service = StubService::new(|| Ok(CompletionResponse::with_content("ok")));
        let generator = ResponseGenerator::new(service.clone(), settings());

        generator.generate("first").await;
        generator.generate("second").await;

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].messages.len(), 2);
        assert_eq!(seen[1].messages[1].content, "second");
    }
}
