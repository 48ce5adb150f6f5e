//! Text generation models used by the analyzer.

use anyhow::Result;
use async_trait::async_trait;

pub mod gemini;

pub use gemini::GeminiClient;

/// Single blocking prompt/response call to a generative text model
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
