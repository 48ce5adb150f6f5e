use anyhow::Result;
use async_trait::async_trait;

use crate::email::{Email, MessageRef};
use crate::execution_log::ExecutionLog;

/// Identifiers of a message accepted by the mailbox for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub id: String,
    pub thread_id: Option<String>,
}

/// Mailbox operations the digest pipeline relies on.
///
/// `GmailClient` is the production implementation; tests use in-memory fakes.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Address of the authenticated user (self-sent detection and forward target)
    async fn get_authenticated_address(&self) -> Result<String>;

    async fn list_unread(&self, max_results: u32) -> Result<Vec<MessageRef>>;

    /// Subject, sender and plain-text body of a message
    async fn get_content(&self, message_ref: &MessageRef) -> Result<Email>;

    /// Whether the thread already holds a forwarded summary sent by `user_address`
    async fn thread_has_summary(&self, thread_id: &str, user_address: &str) -> Result<bool>;

    /// Forwards the original message with `summary_text` on top, in the original's thread
    async fn forward(&self, original_id: &str, to_address: &str, summary_text: &str) -> Result<SendResult>;

    /// Applies `label_name`, creating the label first when it does not exist
    async fn apply_label(&self, message_id: &str, label_name: &str) -> Result<()>;

    async fn send_report(&self, to_address: &str, log: &ExecutionLog) -> Result<SendResult>;
}
