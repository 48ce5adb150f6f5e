use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::config::Config;
use crate::email::{DigestProcessor, RunOutcome};
use crate::gmail_client::GmailClient;
use crate::llm::GeminiClient;

/// Wires the Gmail and Gemini clients into a processor and runs one pass.
///
/// Errors only when the mailbox cannot be reached at all; everything after
/// that is reported through the returned `RunOutcome`.
pub async fn run_once(config: Config, is_dry_run: bool) -> Result<RunOutcome> {
    info!("🔐 Authenticating with Gmail...");
    let gmail = GmailClient::new(&config.gmail)
        .await
        .context("Unable to connect to Gmail API")?;

    let model = GeminiClient::new(&config.gemini)?;
    let processor = DigestProcessor::new(config, Arc::new(gmail), Arc::new(model));

    let outcome = if is_dry_run {
        processor.run_dry_run().await
    } else {
        processor.run().await
    };

    Ok(outcome)
}
