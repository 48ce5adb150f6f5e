/// Common structures and utilities for email processing
use serde::Serialize;

/// Reference to an unread message as returned by the mailbox listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

/// Email content fetched from the mailbox, body already converted to plain text
#[derive(Debug, Clone)]
pub struct Email {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender: String,
    pub body: String,
}

impl Email {
    /// Bare address of the sender, lowercased
    pub fn sender_address(&self) -> String {
        bare_address(&self.sender).to_lowercase()
    }
}

/// Per-run counters. Every examined message lands in at most one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub self_sent: usize,
    pub purchase: usize,
    pub already_summarized: usize,
    pub processed: usize,
}

/// Where a message ended up in the filter chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    AlreadySummarized,
    SelfSent,
    Purchase,
    Processed,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::AlreadySummarized => self.already_summarized += 1,
            Disposition::SelfSent => self.self_sent += 1,
            Disposition::Purchase => self.purchase += 1,
            Disposition::Processed => self.processed += 1,
        }
    }

    /// Messages counted in a bucket; `total - filtered_or_processed()` were skipped on fetch
    pub fn filtered_or_processed(&self) -> usize {
        self.self_sent + self.purchase + self.already_summarized + self.processed
    }
}

/// Result of one agent run, handed to the trigger layer
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    pub stats: RunStats,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn new(stats: RunStats, error: Option<String>) -> Self {
        Self {
            success: error.is_none(),
            stats,
            error,
        }
    }
}

/// Extracts the address from a `Name <user@domain>` header value.
///
/// Without angle brackets the trimmed input is returned as is. An unclosed
/// bracket takes everything after `<`.
pub fn bare_address(sender: &str) -> &str {
    match sender.split_once('<') {
        Some((_, rest)) => rest.split('>').next().unwrap_or(rest).trim(),
        None => sender.trim(),
    }
}

/// True when `sender` resolves to `user_address`, ignoring case
pub fn is_same_address(sender: &str, user_address: &str) -> bool {
    let user = bare_address(user_address);
    !user.is_empty() && bare_address(sender).eq_ignore_ascii_case(user)
}

/// A forward previously sent by the agent: from the user, subject starting with `Fwd:`
pub fn is_agent_summary(subject: &str, sender: &str, user_address: &str) -> bool {
    subject.trim_start().starts_with("Fwd:") && is_same_address(sender, user_address)
}
