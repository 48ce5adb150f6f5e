//! Email analysis through a generative model.
//!
//! `Analyzer::analyze` never fails: after `max_retries` unsuccessful attempts
//! it returns `AnalysisResult::Degraded` so the run can go on.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::classifier::extract_unsubscribe_link;
use crate::config::AnalyzerConfig;
use crate::email::Email;
use crate::llm::TextModel;

pub mod prompt;
pub mod recovery;
pub mod types;

pub use types::{AnalysisResult, Analysis, DegradedAnalysis, LearningSegment, Section, VocabularyEntry, DEGRADED_SUMMARY};

/// Why a single attempt did not produce an analysis
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("model call failed: {0}")]
    Transport(String),

    #[error("unparseable response: {0}")]
    Parse(String),
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Parse failure: try again right away
    Retry,
    /// Model call failure: wait, then try again
    BackoffRetry(Duration),
    /// No attempts left
    Exhausted,
}

/// Retry policy: bounded attempts, exponential backoff on transport failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    /// `base_delay * 2^(attempt - 1)`, attempts numbered from 1
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub fn next_step(&self, attempt: u32, error: &AttemptError) -> RetryStep {
        if attempt >= self.max_retries {
            return RetryStep::Exhausted;
        }
        match error {
            AttemptError::Parse(_) => RetryStep::Retry,
            AttemptError::Transport(_) => RetryStep::BackoffRetry(self.backoff_delay(attempt)),
        }
    }
}

impl From<&AnalyzerConfig> for RetryPolicy {
    fn from(config: &AnalyzerConfig) -> Self {
        RetryPolicy::new(config.max_retries, Duration::from_millis(config.retry_base_delay_ms))
    }
}

pub struct Analyzer {
    model: Arc<dyn TextModel>,
    policy: RetryPolicy,
}

impl Analyzer {
    pub fn new(model: Arc<dyn TextModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    pub async fn analyze(&self, email: &Email, translation_mode: bool) -> AnalysisResult {
        // Independent of the model, so it survives a degraded result
        let unsubscribe_link = extract_unsubscribe_link(&email.body);
        let prompt = prompt::build_prompt(email, translation_mode);

        info!(
            "🤖 Analyzing '{}' with {} (translation: {})",
            email.subject,
            self.model.model_name(),
            translation_mode
        );

        let mut attempt = 1;
        loop {
            let error = match self.attempt(&prompt).await {
                Ok(analysis) => {
                    debug!("Analysis succeeded on attempt {}/{}", attempt, self.policy.max_retries);
                    return AnalysisResult::from_model(analysis, translation_mode, unsubscribe_link);
                }
                Err(e) => e,
            };

            match self.policy.next_step(attempt, &error) {
                RetryStep::Retry => {
                    warn!("Attempt {}/{} failed: {} - retrying", attempt, self.policy.max_retries, error);
                }
                RetryStep::BackoffRetry(delay) => {
                    warn!(
                        "Attempt {}/{} failed: {} - retrying in {:?}",
                        attempt, self.policy.max_retries, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryStep::Exhausted => {
                    error!("❌ Analysis of '{}' failed after {} attempt(s): {}", email.subject, attempt, error);
                    return AnalysisResult::degraded(
                        format!("AI processing failed after {} attempt(s): {}", attempt, error),
                        unsubscribe_link,
                    );
                }
            }

            attempt += 1;
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<types::ModelAnalysis, AttemptError> {
        let response = self
            .model
            .generate(prompt)
            .await
            .map_err(|e| AttemptError::Transport(format!("{:#}", e)))?;

        recovery::parse_model_response(&response).map_err(|e| {
            debug!("Raw response: {}", response);
            e
        })
    }
}
