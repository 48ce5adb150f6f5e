use log::{debug, warn};
use regex::Regex;

use crate::email::Email;

/// Number of body characters inspected for transactional keywords
const BODY_SCAN_CHARS: usize = 500;

const PURCHASE_KEYWORDS: &[&str] = &[
    "order", "purchase", "receipt", "invoice", "payment", "transaction",
    "shipped", "delivery", "tracking", "confirmation", "your order",
    "thank you for your order", "order number", "tracking number",
    "order confirmation", "purchase confirmation", "order placed",
    "order received", "order summary", "billing", "charge",
];

/// Sender fragments of common e-commerce platforms
const COMMERCE_SENDERS: &[&str] = &[
    "amazon", "rakuten", "ebay", "paypal", "stripe", "shopify",
    "shop.", "store.", "orders@", "noreply@", "no-reply@",
];

/// Unsubscribe-style links, tried in order
const UNSUBSCRIBE_PATTERNS: &[&str] = &[
    r#"(?i)https?://[^\s<>"]+?unsubscribe[^\s<>"]*"#,
    r#"(?i)https?://[^\s<>"]+?optout[^\s<>"]*"#,
    r#"(?i)https?://[^\s<>"]+?opt-out[^\s<>"]*"#,
    r#"(?i)https?://[^\s<>"]+?remove[^\s<>"]*"#,
    r#"(?i)https?://[^\s<>"]+?preferences[^\s<>"]*"#,
];

/// Detects purchase/transactional emails.
///
/// A single keyword is too weak a signal ("confirmation" shows up everywhere),
/// so an email is flagged when either:
/// - 2 or more distinct keywords appear in the subject or body prefix
/// - the sender looks like a commerce platform and at least 1 keyword appears
pub fn is_transactional(email: &Email) -> bool {
    let subject = email.subject.to_lowercase();
    let body: String = email.body.chars().take(BODY_SCAN_CHARS).collect::<String>().to_lowercase();
    let sender = email.sender.to_lowercase();

    let keyword_count = count_keywords(&subject, &body);
    let is_commerce_sender = COMMERCE_SENDERS.iter().any(|fragment| sender.contains(fragment));

    let transactional = keyword_count >= 2 || (is_commerce_sender && keyword_count >= 1);

    debug!(
        "Transactional check for '{}': {} keyword(s), commerce sender: {} => {}",
        email.subject, keyword_count, is_commerce_sender, transactional
    );

    transactional
}

fn count_keywords(subject: &str, body: &str) -> usize {
    PURCHASE_KEYWORDS
        .iter()
        .filter(|keyword| subject.contains(*keyword) || body.contains(*keyword))
        .count()
}

/// Extracts the first unsubscribe-style link from an email body.
///
/// Trailing punctuation and HTML leftovers (`,;.)]`) are stripped.
pub fn extract_unsubscribe_link(body: &str) -> Option<String> {
    for pattern in UNSUBSCRIBE_PATTERNS {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!("Invalid unsubscribe pattern {}: {}", pattern, e);
                continue;
            }
        };

        if let Some(found) = re.find(body) {
            let link = found
                .as_str()
                .trim_end_matches([',', ';', '.', ')', ']']);
            debug!("Found unsubscribe link: {} (pattern: {})", link, pattern);
            return Some(link.to_string());
        }
    }

    None
}
