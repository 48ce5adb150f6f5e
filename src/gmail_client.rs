use std::io::Cursor;

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::api::{Label, Message, MessagePartHeader, ModifyMessageRequest, Scope};
use google_gmail1::Gmail;
use hyper_rustls::HttpsConnector;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox as Address, MultiPart, SinglePart};
use log::{debug, info, warn};
use mail_parser::{HeaderValue, MessageParser};
use yup_oauth2 as oauth2;

use crate::config::GmailConfig;
use crate::email::common::is_agent_summary;
use crate::email::{Email, MessageRef};
use crate::execution_log::ExecutionLog;
use crate::mailbox::{Mailbox, SendResult};

const USER_ID: &str = "me";
const UNREAD_QUERY: &str = "is:unread";
const UNKNOWN_SENDER: &str = "Unknown Sender";
const NO_SUBJECT: &str = "No Subject";

pub struct GmailClient {
    hub: Gmail<HttpsConnector<hyper::client::HttpConnector>>,
}

impl GmailClient {
    pub async fn new(config: &GmailConfig) -> Result<Self> {
        info!("Connecting to Gmail API via OAuth2");

        // Read OAuth2 client credentials from file
        let secret = oauth2::read_application_secret(&config.credentials_path)
            .await
            .context("Unable to read OAuth2 client credentials file")?;

        // Scope::Modify covers reading, labelling and sending
        let auth = oauth2::InstalledFlowAuthenticator::builder(
            secret,
            oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(&config.token_cache_path)
        .build()
        .await
        .context("Unable to create OAuth2 authenticator")?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();

        let client = hyper::Client::builder().build(connector);
        let hub = Gmail::new(client, auth);

        info!("✅ Gmail API connection established successfully");

        Ok(GmailClient { hub })
    }

    /// Raw RFC822 bytes and thread id of a message
    async fn fetch_raw(&self, message_id: &str) -> Result<(Vec<u8>, Option<String>)> {
        debug!("Raw retrieval for ID: {}", message_id);

        let (_, message) = self.hub
            .users()
            .messages_get(USER_ID, message_id)
            .format("raw")
            .add_scope(Scope::Modify)
            .doit()
            .await
            .context("Unable to retrieve email")?;

        // Raw content is already decoded by the Gmail API (RFC822 format)
        let raw = message.raw.context("No raw content in email")?;
        debug!("Email retrieved, size: {} bytes", raw.len());

        Ok((raw, message.thread_id))
    }

    /// Finds a label id by name, creating the label when missing
    async fn get_or_create_label(&self, label_name: &str) -> Result<String> {
        let (_, list) = self.hub
            .users()
            .labels_list(USER_ID)
            .add_scope(Scope::Modify)
            .doit()
            .await
            .context("Unable to list labels")?;

        let existing = list
            .labels
            .unwrap_or_default()
            .into_iter()
            .find(|l| l.name.as_deref() == Some(label_name))
            .and_then(|l| l.id);

        if let Some(id) = existing {
            return Ok(id);
        }

        let request = Label {
            name: Some(label_name.to_string()),
            label_list_visibility: Some("labelShow".to_string()),
            message_list_visibility: Some("show".to_string()),
            ..Default::default()
        };

        let (_, created) = self.hub
            .users()
            .labels_create(request, USER_ID)
            .add_scope(Scope::Modify)
            .doit()
            .await
            .with_context(|| format!("Unable to create label '{}'", label_name))?;

        info!("Created new label: {}", label_name);
        created.id.context("Created label has no id")
    }

    async fn send_raw(&self, raw: Vec<u8>, thread_id: Option<String>) -> Result<SendResult> {
        let mime_type: mime::Mime = "message/rfc822".parse().context("Invalid upload mime type")?;

        let request = Message {
            thread_id,
            ..Default::default()
        };

        let (_, sent) = self.hub
            .users()
            .messages_send(request, USER_ID)
            .add_scope(Scope::Modify)
            .upload(Cursor::new(raw), mime_type)
            .await
            .context("Unable to send message")?;

        Ok(SendResult {
            id: sent.id.unwrap_or_default(),
            thread_id: sent.thread_id,
        })
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn get_authenticated_address(&self) -> Result<String> {
        let (_, profile) = self.hub
            .users()
            .get_profile(USER_ID)
            .add_scope(Scope::Modify)
            .doit()
            .await
            .context("Unable to retrieve Gmail profile")?;

        profile.email_address.context("Gmail profile has no email address")
    }

    async fn list_unread(&self, max_results: u32) -> Result<Vec<MessageRef>> {
        info!("Searching for unread emails (max {})", max_results);

        let (_, result) = self.hub
            .users()
            .messages_list(USER_ID)
            .q(UNREAD_QUERY)
            .max_results(max_results)
            .add_scope(Scope::Modify)
            .doit()
            .await
            .context("Error searching for unread emails")?;

        let messages: Vec<MessageRef> = result
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|msg| {
                let id = msg.id?;
                Some(MessageRef {
                    id,
                    thread_id: msg.thread_id.unwrap_or_default(),
                })
            })
            .collect();

        info!("Found {} unread email(s)", messages.len());
        Ok(messages)
    }

    async fn get_content(&self, message_ref: &MessageRef) -> Result<Email> {
        let (raw, thread_id) = self.fetch_raw(&message_ref.id).await?;

        let resolved = MessageRef {
            id: message_ref.id.clone(),
            thread_id: thread_id.unwrap_or_else(|| message_ref.thread_id.clone()),
        };
        parse_email(&raw, &resolved)
    }

    async fn thread_has_summary(&self, thread_id: &str, user_address: &str) -> Result<bool> {
        let (_, thread) = self.hub
            .users()
            .threads_get(USER_ID, thread_id)
            .format("metadata")
            .add_metadata_headers("Subject")
            .add_metadata_headers("From")
            .add_scope(Scope::Modify)
            .doit()
            .await
            .context("Unable to retrieve thread")?;

        for message in thread.messages.unwrap_or_default() {
            let trashed = message
                .label_ids
                .as_ref()
                .is_some_and(|labels| labels.iter().any(|l| l == "TRASH"));
            if trashed {
                continue;
            }

            let headers = message.payload.and_then(|p| p.headers).unwrap_or_default();
            let subject = header_value(&headers, "Subject").unwrap_or_default();
            let from = header_value(&headers, "From").unwrap_or_default();

            if is_agent_summary(&subject, &from, user_address) {
                debug!("Thread {} already summarized by message {:?}", thread_id, message.id);
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn forward(&self, original_id: &str, to_address: &str, summary_text: &str) -> Result<SendResult> {
        let (raw, thread_id) = self.fetch_raw(original_id).await?;

        let message = build_forward(&raw, to_address, summary_text)
            .with_context(|| format!("Unable to build forward of message {}", original_id))?;

        let sent = self.send_raw(message, thread_id).await?;
        info!("Forwarded message id: {} (thread: {})", sent.id, sent.thread_id.as_deref().unwrap_or("N/A"));
        Ok(sent)
    }

    async fn apply_label(&self, message_id: &str, label_name: &str) -> Result<()> {
        let label_id = self.get_or_create_label(label_name).await?;

        let request = ModifyMessageRequest {
            add_label_ids: Some(vec![label_id]),
            ..Default::default()
        };

        self.hub
            .users()
            .messages_modify(request, USER_ID, message_id)
            .add_scope(Scope::Modify)
            .doit()
            .await
            .context("Unable to modify email labels")?;

        debug!("Label '{}' applied to {}", label_name, message_id);
        Ok(())
    }

    async fn send_report(&self, to_address: &str, log: &ExecutionLog) -> Result<SendResult> {
        let message = build_report(to_address, log)?;
        self.send_raw(message, None).await
    }
}

/// Parses a raw RFC822 message into an `Email`.
///
/// Missing headers fall back to `Unknown Sender` and `No Subject`. HTML-only
/// messages come back converted to text.
pub fn parse_email(raw: &[u8], message_ref: &MessageRef) -> Result<Email> {
    let parsed = MessageParser::default()
        .parse(raw)
        .context("Unable to parse email")?;

    let sender = parsed.from()
        .and_then(|addrs| addrs.first())
        .map(|addr| {
            match (&addr.name, &addr.address) {
                (Some(name), Some(email)) => format!("{} <{}>", name, email),
                (None, Some(email)) => email.to_string(),
                _ => UNKNOWN_SENDER.to_string(),
            }
        })
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

    let subject = parsed.subject().unwrap_or(NO_SUBJECT).to_string();

    let body = parsed
        .body_text(0)
        .map(|text| text.into_owned())
        .unwrap_or_default();

    Ok(Email {
        id: message_ref.id.clone(),
        thread_id: message_ref.thread_id.clone(),
        subject,
        sender,
        body,
    })
}

/// Builds the forward of `raw` to `to_address`: the summary as a plain part,
/// then the untouched original as a `message/rfc822` part.
///
/// `In-Reply-To`/`References` point at the original when it has a Message-ID.
pub fn build_forward(raw: &[u8], to_address: &str, summary_text: &str) -> Result<Vec<u8>> {
    let parsed = MessageParser::default()
        .parse(raw)
        .context("Unable to parse original email")?;

    let subject = format!("Fwd: {}", parsed.subject().unwrap_or(NO_SUBJECT));
    let me: Address = to_address.parse().context("Invalid forward address")?;

    let mut builder = lettre::Message::builder()
        .from(me.clone())
        .to(me)
        .subject(subject);

    if let Some(message_id) = parsed.message_id() {
        let message_id = format!("<{}>", message_id);
        let mut references = reference_ids(parsed.references());
        references.push(message_id.clone());
        builder = builder.in_reply_to(message_id).references(references.join(" "));
    } else {
        warn!("Original message has no Message-ID, relying on thread id only");
    }

    let original_part = SinglePart::builder()
        .header(ContentType::parse("message/rfc822").context("Invalid embedded message type")?)
        .body(raw.to_vec());

    let message = builder
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(summary_text.to_string()))
                .singlepart(original_part),
        )
        .context("Unable to build forward message")?;

    Ok(message.formatted())
}

/// Plain-text execution log addressed to the user
pub fn build_report(to_address: &str, log: &ExecutionLog) -> Result<Vec<u8>> {
    let me: Address = to_address.parse().context("Invalid report address")?;

    let message = lettre::Message::builder()
        .from(me.clone())
        .to(me)
        .subject(log.subject())
        .header(ContentType::TEXT_PLAIN)
        .body(log.body())
        .context("Unable to build execution log message")?;

    Ok(message.formatted())
}

fn header_value(headers: &[MessagePartHeader], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.name.as_deref() == Some(name))
        .and_then(|h| h.value.clone())
}

/// Message ids of a References header, in angle brackets
fn reference_ids(references: &HeaderValue) -> Vec<String> {
    match references {
        HeaderValue::Text(id) => vec![format!("<{}>", id)],
        HeaderValue::TextList(ids) => ids.iter().map(|id| format!("<{}>", id)).collect(),
        _ => Vec::new(),
    }
}
