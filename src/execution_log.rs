use chrono::{DateTime, Local};
use log::{error, info};

use crate::email::RunStats;
use crate::mailbox::Mailbox;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Execution summary mailed to the user at the end of every run
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    pub stats: RunStats,
    pub error: Option<String>,
    pub executed_at: DateTime<Local>,
}

impl ExecutionLog {
    pub fn new(stats: RunStats, error: Option<String>, executed_at: DateTime<Local>) -> Self {
        Self { stats, error, executed_at }
    }

    pub fn status(&self) -> &'static str {
        if self.error.is_some() { "FAILED" } else { "SUCCESS" }
    }

    pub fn execution_time(&self) -> String {
        self.executed_at.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn subject(&self) -> String {
        format!("Inbox Digest Log - {} - {}", self.status(), self.execution_time())
    }

    pub fn body(&self) -> String {
        let error_section = self
            .error
            .as_ref()
            .map(|e| format!("\nERRORS:\n{}\n", e))
            .unwrap_or_default();

        format!(
            "Inbox Digest Execution Log\n\
             ========================\n\
             \n\
             Status: {status}\n\
             Execution Time: {time}\n\
             \n\
             STATISTICS:\n\
             --------------\n\
             Total unread emails: {total}\n\
             Filtered (self-sent): {self_sent}\n\
             Filtered (purchase): {purchase}\n\
             Filtered (already summarized): {already_summarized}\n\
             Processed & forwarded: {processed}\n\
             {error_section}\n\
             ========================\n\
             \n\
             This is an automated execution log from your inbox digest agent.\n",
            status = self.status(),
            time = self.execution_time(),
            total = self.stats.total,
            self_sent = self.stats.self_sent,
            purchase = self.stats.purchase,
            already_summarized = self.stats.already_summarized,
            processed = self.stats.processed,
            error_section = error_section,
        )
    }
}

/// Sends the execution log; failures are logged, never returned
pub async fn send_execution_log(mailbox: &dyn Mailbox, to: &str, log: &ExecutionLog) -> bool {
    info!("📨 Sending execution log to {}...", to);

    match mailbox.send_report(to, log).await {
        Ok(sent) => {
            info!("✅ Execution log sent (message id: {})", sent.id);
            true
        }
        Err(e) => {
            error!("❌ Failed to send execution log: {:#}", e);
            false
        }
    }
}
