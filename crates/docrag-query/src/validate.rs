//! Generate-then-validate answering loop.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use docrag_core::{ChatMessage, ChatModel, ChatOptions, RagError, Result};

use crate::prompt::{retry_prompt, validation_prompt};

/// Outcome of the validation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// A response was accepted by the validator.
    Passed,
    /// Every attempt was rejected; the last response is returned.
    FailedMaxRetries,
}

/// One generate/validate round.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationAttempt {
    /// 1-based attempt number.
    pub attempt: u32,

    /// Generated response.
    pub response: String,

    /// Validator verdict, trimmed.
    pub validation: String,
}

/// Result of [`Validator::run`].
#[derive(Debug, Clone)]
pub struct ValidatedAnswer {
    /// Accepted response, or the last one when all were rejected.
    pub response: String,

    pub status: ValidationStatus,

    /// Every round in order.
    pub attempts: Vec<ValidationAttempt>,
}

/// Settings for the loop.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Rounds before giving up.
    pub max_attempts: u32,

    /// Temperature for generated responses.
    pub answer_temperature: f32,

    /// Temperature for verdicts.
    pub validator_temperature: f32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            answer_temperature: 0.7,
            validator_temperature: 0.3,
        }
    }
}

/// Asks the model, has a second call judge the reply, and retries with the
/// judge's feedback until a reply passes or attempts run out.
#[derive(Clone)]
pub struct Validator {
    chat: Arc<dyn ChatModel>,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(chat: Arc<dyn ChatModel>, config: ValidatorConfig) -> Self {
        Self { chat, config }
    }

    pub async fn run(&self, history: &[ChatMessage], prompt: &str) -> Result<ValidatedAnswer> {
        if self.config.max_attempts == 0 {
            return Err(RagError::invalid_argument("max_attempts must be positive"));
        }

        let answer_options = ChatOptions::with_temperature(self.config.answer_temperature);
        let validator_options = ChatOptions::with_temperature(self.config.validator_temperature);

        let mut attempts = Vec::new();
        let mut current_prompt = prompt.to_string();

        for attempt in 1..=self.config.max_attempts {
            let mut messages = history.to_vec();
            messages.push(ChatMessage::user(current_prompt.as_str()));
            let response = self.chat.complete(&messages, &answer_options).await?;

            let verdict = self
                .chat
                .complete(
                    &[ChatMessage::user(validation_prompt(prompt, &response))],
                    &validator_options,
                )
                .await?
                .trim()
                .to_string();

            let passed = verdict.starts_with("VALID");
            attempts.push(ValidationAttempt {
                attempt,
                response: response.clone(),
                validation: verdict.clone(),
            });

            if passed {
                info!(attempt, "Response passed validation");
                return Ok(ValidatedAnswer {
                    response,
                    status: ValidationStatus::Passed,
                    attempts,
                });
            }

            warn!(attempt, verdict = %verdict, "Response rejected by validator");
            current_prompt = retry_prompt(&current_prompt, &verdict);
        }

        let response = attempts
            .last()
            .map(|a| a.response.clone())
            .unwrap_or_default();

        Ok(ValidatedAnswer {
            response,
            status: ValidationStatus::FailedMaxRetries,
            attempts,
        })
    }
}
