//! In-memory mailbox and model used by the integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use inbox_digest::config::Config;
use inbox_digest::email::{Email, MessageRef};
use inbox_digest::execution_log::ExecutionLog;
use inbox_digest::llm::TextModel;
use inbox_digest::mailbox::{Mailbox, SendResult};

pub const USER: &str = "me@example.com";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.gemini.api_key = Some("test-key".to_string());
    config.analyzer.retry_base_delay_ms = 0;
    config
}

pub fn email(id: &str, thread_id: &str, sender: &str, subject: &str, body: &str) -> Email {
    Email {
        id: id.to_string(),
        thread_id: thread_id.to_string(),
        subject: subject.to_string(),
        sender: sender.to_string(),
        body: body.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Forwarded {
    pub original_id: String,
    pub to: String,
    pub summary_text: String,
}

#[derive(Default)]
pub struct FakeMailbox {
    /// `None` makes `get_authenticated_address` fail
    pub user_address: Option<String>,
    pub messages: Vec<Email>,
    pub fail_listing: bool,
    /// Message ids whose content cannot be fetched
    pub unreadable: HashSet<String>,
    /// Thread ids that already hold a summary
    pub summarized_threads: HashSet<String>,
    pub fail_forward: bool,
    pub fail_label: bool,

    pub listed_with: Mutex<Vec<u32>>,
    pub forwards: Mutex<Vec<Forwarded>>,
    pub labels: Mutex<Vec<(String, String)>>,
    pub reports: Mutex<Vec<(String, ExecutionLog)>>,
}

impl FakeMailbox {
    pub fn with_messages(messages: Vec<Email>) -> Self {
        FakeMailbox {
            user_address: Some(USER.to_string()),
            messages,
            ..Default::default()
        }
    }

    pub fn forwards(&self) -> Vec<Forwarded> {
        self.forwards.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<(String, String)> {
        self.labels.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<(String, ExecutionLog)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn get_authenticated_address(&self) -> Result<String> {
        match &self.user_address {
            Some(address) => Ok(address.clone()),
            None => anyhow::bail!("profile unavailable"),
        }
    }

    async fn list_unread(&self, max_results: u32) -> Result<Vec<MessageRef>> {
        self.listed_with.lock().unwrap().push(max_results);
        if self.fail_listing {
            anyhow::bail!("listing unavailable");
        }

        Ok(self
            .messages
            .iter()
            .take(max_results as usize)
            .map(|m| MessageRef {
                id: m.id.clone(),
                thread_id: m.thread_id.clone(),
            })
            .collect())
    }

    async fn get_content(&self, message_ref: &MessageRef) -> Result<Email> {
        if self.unreadable.contains(&message_ref.id) {
            anyhow::bail!("message {} not found", message_ref.id);
        }
        self.messages
            .iter()
            .find(|m| m.id == message_ref.id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("message {} not found", message_ref.id))
    }

    async fn thread_has_summary(&self, thread_id: &str, _user_address: &str) -> Result<bool> {
        Ok(self.summarized_threads.contains(thread_id))
    }

    async fn forward(&self, original_id: &str, to_address: &str, summary_text: &str) -> Result<SendResult> {
        if self.fail_forward {
            anyhow::bail!("send quota exceeded");
        }
        let mut forwards = self.forwards.lock().unwrap();
        forwards.push(Forwarded {
            original_id: original_id.to_string(),
            to: to_address.to_string(),
            summary_text: summary_text.to_string(),
        });
        Ok(SendResult {
            id: format!("fwd-{}", forwards.len()),
            thread_id: None,
        })
    }

    async fn apply_label(&self, message_id: &str, label_name: &str) -> Result<()> {
        if self.fail_label {
            anyhow::bail!("label quota exceeded");
        }
        self.labels
            .lock()
            .unwrap()
            .push((message_id.to_string(), label_name.to_string()));
        Ok(())
    }

    async fn send_report(&self, to_address: &str, log: &ExecutionLog) -> Result<SendResult> {
        self.reports
            .lock()
            .unwrap()
            .push((to_address.to_string(), log.clone()));
        Ok(SendResult {
            id: "report".to_string(),
            thread_id: None,
        })
    }
}

/// Replays a scripted list of responses; the last one repeats once the script runs out
pub struct FakeModel {
    script: Vec<Result<String, String>>,
    calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(script: Vec<Result<String, String>>) -> Self {
        FakeModel {
            script,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new(vec![Ok(response.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextModel for FakeModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let step = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| Err("empty script".to_string()));

        step.map_err(|e| anyhow::anyhow!(e))
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

pub const READ_LATER_JSON: &str = r#"{
    "summary": "The team meeting moved to Thursday.",
    "sections": [{"topic": "Schedule", "insight": "Thursday at 10am"}],
    "action_required": false,
    "reason": "Informational only"
}"#;

pub const ACTION_JSON: &str = r#"{
    "summary": "Alice asks for feedback on the draft.",
    "sections": [],
    "action_required": true,
    "reason": "A reply is expected"
}"#;
