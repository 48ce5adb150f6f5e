use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, error, info, warn};

use crate::analyzer::{Analyzer, RetryPolicy};
use crate::classifier::is_transactional;
use crate::config::Config;
use crate::email::common::{is_same_address, Disposition, Email, MessageRef, RunOutcome, RunStats};
use crate::email::formatter::{format_forward_body, label_for};
use crate::execution_log::{send_execution_log, ExecutionLog};
use crate::llm::TextModel;
use crate::mailbox::Mailbox;

pub const MISSING_API_KEY_ERROR: &str = "GEMINI_API_KEY not found in environment variables.";

/// Runs the digest pipeline over the unread messages of one mailbox.
///
/// Messages go through a fixed filter chain, one at a time:
/// already-summarized thread, self-sent, transactional, then analysis and forward.
pub struct DigestProcessor {
    config: Config,
    mailbox: Arc<dyn Mailbox>,
    analyzer: Analyzer,
}

impl DigestProcessor {
    pub fn new(config: Config, mailbox: Arc<dyn Mailbox>, model: Arc<dyn TextModel>) -> Self {
        let analyzer = Analyzer::new(model, RetryPolicy::from(&config.analyzer));
        DigestProcessor {
            config,
            mailbox,
            analyzer,
        }
    }

    pub async fn run(&self) -> RunOutcome {
        info!("Starting inbox digest run");
        self.run_common(false).await
    }

    /// Analyzes and prints the digests without forwarding, labelling or reporting
    pub async fn run_dry_run(&self) -> RunOutcome {
        println!("\n{}", "=".repeat(80));
        println!("🧪 MODE DRY-RUN - INBOX DIGEST");
        println!("{}", "=".repeat(80));

        self.run_common(true).await
    }

    async fn run_common(&self, is_dry_run: bool) -> RunOutcome {
        let mut stats = RunStats::new();
        let mut user_address = None;

        let error = match self.process_unread(&mut stats, &mut user_address, is_dry_run).await {
            Ok(()) => None,
            Err(e) => {
                let message = format!("{:#}", e);
                error!("❌ Error during execution: {}", message);
                Some(message)
            }
        };

        Self::log_statistics(&stats, is_dry_run);

        if !is_dry_run {
            self.report(&stats, error.clone(), user_address).await;
        }

        RunOutcome::new(stats, error)
    }

    async fn process_unread(
        &self,
        stats: &mut RunStats,
        user_address: &mut Option<String>,
        is_dry_run: bool,
    ) -> Result<()> {
        // 1. The model credential is required before touching any message
        if self.config.gemini.api_key.is_none() {
            anyhow::bail!(MISSING_API_KEY_ERROR);
        }

        // 2. Identity and unread listing
        info!("🔐 Resolving authenticated mailbox address...");
        let address = self.mailbox
            .get_authenticated_address()
            .await
            .context("Unable to resolve the authenticated address")?;
        *user_address = Some(address.clone());

        info!("📬 Checking for unread emails...");
        let messages = self.mailbox
            .list_unread(self.config.digest.max_results)
            .await
            .context("Unable to list unread messages")?;

        stats.total = messages.len();

        if messages.is_empty() {
            info!("No unread messages found.");
            return Ok(());
        }

        info!("Found {} unread email(s). Processing...", messages.len());

        // 3. One message at a time, in listing order
        for (index, message_ref) in messages.iter().enumerate() {
            if is_dry_run {
                println!("📧 Email {}/{} (ID: {})", index + 1, messages.len(), message_ref.id);
                println!("{}", "-".repeat(60));
            } else {
                info!("Processing message {}/{} (ID: {})", index + 1, messages.len(), message_ref.id);
            }

            if let Some(disposition) = self.process_message(message_ref, &address, is_dry_run).await {
                stats.record(disposition);
            }
        }

        Ok(())
    }

    /// Runs one message through the filter chain.
    ///
    /// `None` means the content could not be fetched and the message lands in no bucket.
    async fn process_message(
        &self,
        message_ref: &MessageRef,
        user_address: &str,
        is_dry_run: bool,
    ) -> Option<Disposition> {
        let email = match self.mailbox.get_content(message_ref).await {
            Ok(email) => email,
            Err(e) => {
                warn!("Unable to fetch content of message {}: {:#}", message_ref.id, e);
                return None;
            }
        };

        if self.thread_already_summarized(message_ref, user_address).await {
            info!("⏭️  Skipping '{}' - thread already has a summary", email.subject);
            return Some(Disposition::AlreadySummarized);
        }

        if is_same_address(&email.sender, user_address) {
            info!("⏭️  Skipping email from self: {}", email.sender);
            return Some(Disposition::SelfSent);
        }

        if is_transactional(&email) {
            info!("⏭️  Skipping purchase email: {}", email.subject);
            return Some(Disposition::Purchase);
        }

        info!("Subject: {}", email.subject);
        info!("From: {}", email.sender);

        let translation_mode = self.is_translation_source(&email);
        let analysis = self.analyzer.analyze(&email, translation_mode).await;

        info!("Summary: {}", analysis.summary());
        info!("Action Required: {}", analysis.action_required());

        let summary_text = format_forward_body(&email, &analysis);
        let label = label_for(&analysis);

        if is_dry_run {
            println!("{}", summary_text);
            println!("🏷️  Label: {}\n", label);
            return Some(Disposition::Processed);
        }

        info!("📤 Forwarding to {}...", user_address);
        match self.mailbox.forward(&email.id, user_address, &summary_text).await {
            Ok(sent) => debug!("Forwarded message id: {} (thread: {:?})", sent.id, sent.thread_id),
            Err(e) => error!("❌ Failed to forward message {}: {:#}", email.id, e),
        }

        if let Err(e) = self.mailbox.apply_label(&email.id, label).await {
            error!("❌ Failed to apply label '{}' to message {}: {:#}", label, email.id, e);
        } else {
            info!("🏷️  Applied label: {}", label);
        }

        Some(Disposition::Processed)
    }

    async fn thread_already_summarized(&self, message_ref: &MessageRef, user_address: &str) -> bool {
        if message_ref.thread_id.is_empty() {
            return false;
        }

        match self.mailbox.thread_has_summary(&message_ref.thread_id, user_address).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Unable to inspect thread {}: {:#}", message_ref.thread_id, e);
                false
            }
        }
    }

    fn is_translation_source(&self, email: &Email) -> bool {
        let domain = self.config.digest.translation_domain.to_lowercase();
        !domain.is_empty() && email.sender_address().ends_with(&domain)
    }

    async fn report(&self, stats: &RunStats, error: Option<String>, user_address: Option<String>) {
        let to = match user_address {
            Some(address) => address,
            None => match self.mailbox.get_authenticated_address().await {
                Ok(address) => address,
                Err(e) => {
                    error!("❌ Failed to send execution log: no recipient address ({:#})", e);
                    return;
                }
            },
        };

        let log = ExecutionLog::new(*stats, error, Local::now());
        send_execution_log(self.mailbox.as_ref(), &to, &log).await;
    }

    fn log_statistics(stats: &RunStats, is_dry_run: bool) {
        let lines = [
            format!("Total unread emails: {}", stats.total),
            format!("Filtered (self-sent): {}", stats.self_sent),
            format!("Filtered (purchase): {}", stats.purchase),
            format!("Filtered (already summarized): {}", stats.already_summarized),
            format!("Processed & forwarded: {}", stats.processed),
        ];

        if is_dry_run {
            println!("{}", "=".repeat(80));
            println!("🏁 SUMMARY STATISTICS");
            for line in &lines {
                println!("   {}", line);
            }
            println!("{}", "=".repeat(80));
        } else {
            info!("📊 SUMMARY STATISTICS");
            for line in &lines {
                info!("   {}", line);
            }
        }
    }
}
