mod common;

use std::sync::Arc;

use common::{email, test_config, FakeMailbox, FakeModel, ACTION_JSON, READ_LATER_JSON, USER};
use inbox_digest::email::processor::MISSING_API_KEY_ERROR;
use inbox_digest::email::{DigestProcessor, RunStats};
use inbox_digest::email::formatter::{ACTION_REQUIRED_LABEL, READ_LATER_LABEL};

fn meeting_email(id: &str) -> inbox_digest::email::Email {
    email(
        id,
        &format!("thread-{}", id),
        "Bob <bob@example.org>",
        "Team meeting",
        "Hi, the team meeting moved to Thursday at 10am. See you there.",
    )
}

#[tokio::test]
async fn test_empty_inbox_reports_zero_stats() {
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![]));
    let model = Arc::new(FakeModel::always(READ_LATER_JSON));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    let outcome = processor.run().await;

    assert!(outcome.success);
    assert_eq!(outcome.stats, RunStats::new());
    assert_eq!(model.calls(), 0);

    let reports = mailbox.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, USER);
    assert_eq!(reports[0].1.stats, RunStats::new());
    assert!(reports[0].1.subject().starts_with("Inbox Digest Log - SUCCESS - "));
}

#[tokio::test]
async fn test_self_sent_is_not_forwarded() {
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![email(
        "m1",
        "t1",
        "Me <ME@example.com>",
        "Note to self",
        "Remember to call the plumber.",
    )]));
    let model = Arc::new(FakeModel::always(READ_LATER_JSON));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    let outcome = processor.run().await;

    assert!(outcome.success);
    assert_eq!(outcome.stats.total, 1);
    assert_eq!(outcome.stats.self_sent, 1);
    assert_eq!(outcome.stats.processed, 0);
    assert!(mailbox.forwards().is_empty());
    assert!(mailbox.labels().is_empty());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_purchase_skips_model() {
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![email(
        "m1",
        "t1",
        "Shop <news@example.shop>",
        "Your order has shipped",
        "Use the tracking number below to follow your parcel.",
    )]));
    let model = Arc::new(FakeModel::always(READ_LATER_JSON));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    let outcome = processor.run().await;

    assert!(outcome.success);
    assert_eq!(outcome.stats.purchase, 1);
    assert_eq!(outcome.stats.processed, 0);
    assert_eq!(model.calls(), 0);
    assert!(mailbox.forwards().is_empty());
}

#[tokio::test]
async fn test_model_failure_still_forwards_degraded_summary() {
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![meeting_email("m1")]));
    let model = Arc::new(FakeModel::new(vec![Err("connection reset".to_string())]));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    let outcome = processor.run().await;

    assert!(outcome.success, "model failures must not fail the run");
    assert_eq!(outcome.stats.processed, 1);
    assert_eq!(model.calls(), 3);

    let forwards = mailbox.forwards();
    assert_eq!(forwards.len(), 1);
    assert_eq!(forwards[0].original_id, "m1");
    assert_eq!(forwards[0].to, USER);
    assert!(forwards[0].summary_text.contains("Error summarizing email."));
    assert!(forwards[0].summary_text.contains("Action Required: NO"));
    assert!(forwards[0].summary_text.contains("AI processing failed after 3 attempt(s)"));

    assert_eq!(mailbox.labels(), vec![("m1".to_string(), READ_LATER_LABEL.to_string())]);
}

#[tokio::test]
async fn test_already_summarized_thread_is_skipped() {
    let mut mailbox = FakeMailbox::with_messages(vec![meeting_email("m1")]);
    mailbox.summarized_threads.insert("thread-m1".to_string());
    let mailbox = Arc::new(mailbox);
    let model = Arc::new(FakeModel::always(READ_LATER_JSON));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    let outcome = processor.run().await;

    assert_eq!(outcome.stats.already_summarized, 1);
    assert_eq!(outcome.stats.processed, 0);
    assert_eq!(model.calls(), 0);
    assert!(mailbox.forwards().is_empty());
}

#[tokio::test]
async fn test_labels_follow_action_required() {
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![meeting_email("m1"), meeting_email("m2")]));
    let model = Arc::new(FakeModel::new(vec![
        Ok(ACTION_JSON.to_string()),
        Ok(format!("```json\n{}\n```", READ_LATER_JSON)),
    ]));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    let outcome = processor.run().await;

    assert!(outcome.success);
    assert_eq!(outcome.stats.processed, 2);
    assert_eq!(
        mailbox.labels(),
        vec![
            ("m1".to_string(), ACTION_REQUIRED_LABEL.to_string()),
            ("m2".to_string(), READ_LATER_LABEL.to_string()),
        ]
    );

    let forwards = mailbox.forwards();
    assert!(forwards[0].summary_text.contains("Action Required: YES"));
    assert!(forwards[1].summary_text.contains("• Schedule: Thursday at 10am"));
}

#[tokio::test]
async fn test_stats_buckets_add_up() {
    let mut mailbox = FakeMailbox::with_messages(vec![
        meeting_email("m1"),
        email("m2", "t2", USER, "Note", "groceries"),
        email("m3", "t3", "orders@shop.example", "Receipt", "Thanks for your purchase"),
        meeting_email("m4"),
        meeting_email("m5"),
    ]);
    mailbox.summarized_threads.insert("thread-m4".to_string());
    mailbox.unreadable.insert("m5".to_string());
    let mailbox = Arc::new(mailbox);
    let model = Arc::new(FakeModel::always(READ_LATER_JSON));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model);

    let outcome = processor.run().await;

    assert!(outcome.success);
    assert_eq!(
        outcome.stats,
        RunStats {
            total: 5,
            self_sent: 1,
            purchase: 1,
            already_summarized: 1,
            processed: 1,
        }
    );
    // The unreadable message lands in no bucket
    assert_eq!(outcome.stats.filtered_or_processed(), 4);
    assert_eq!(mailbox.reports()[0].1.stats, outcome.stats);
}

#[tokio::test]
async fn test_missing_api_key_fails_run_but_reports() {
    let mut config = test_config();
    config.gemini.api_key = None;
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![meeting_email("m1")]));
    let model = Arc::new(FakeModel::always(READ_LATER_JSON));
    let processor = DigestProcessor::new(config, mailbox.clone(), model.clone());

    let outcome = processor.run().await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some(MISSING_API_KEY_ERROR));
    assert_eq!(outcome.stats, RunStats::new());
    assert!(mailbox.listed_with.lock().unwrap().is_empty());
    assert_eq!(model.calls(), 0);

    let reports = mailbox.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, USER);
    assert_eq!(reports[0].1.status(), "FAILED");
    assert!(reports[0].1.body().contains(MISSING_API_KEY_ERROR));
}

#[tokio::test]
async fn test_listing_failure_is_reported() {
    let mut mailbox = FakeMailbox::with_messages(vec![meeting_email("m1")]);
    mailbox.fail_listing = true;
    let mailbox = Arc::new(mailbox);
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), Arc::new(FakeModel::always(READ_LATER_JSON)));

    let outcome = processor.run().await;

    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap_or_default().contains("listing unavailable"));
    assert_eq!(mailbox.reports().len(), 1);
    assert_eq!(mailbox.reports()[0].1.status(), "FAILED");
}

#[tokio::test]
async fn test_no_recipient_means_no_report() {
    let mut mailbox = FakeMailbox::with_messages(vec![meeting_email("m1")]);
    mailbox.user_address = None;
    let mailbox = Arc::new(mailbox);
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), Arc::new(FakeModel::always(READ_LATER_JSON)));

    let outcome = processor.run().await;

    assert!(!outcome.success);
    assert!(mailbox.reports().is_empty());
}

#[tokio::test]
async fn test_forward_and_label_failures_still_count_as_processed() {
    let mut mailbox = FakeMailbox::with_messages(vec![meeting_email("m1")]);
    mailbox.fail_forward = true;
    mailbox.fail_label = true;
    let mailbox = Arc::new(mailbox);
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), Arc::new(FakeModel::always(READ_LATER_JSON)));

    let outcome = processor.run().await;

    assert!(outcome.success);
    assert_eq!(outcome.stats.processed, 1);
    assert!(mailbox.forwards().is_empty());
    assert!(mailbox.labels().is_empty());
}

#[tokio::test]
async fn test_max_results_is_passed_to_listing() {
    let mut config = test_config();
    config.digest.max_results = 2;
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![
        meeting_email("m1"),
        meeting_email("m2"),
        meeting_email("m3"),
    ]));
    let processor = DigestProcessor::new(config, mailbox.clone(), Arc::new(FakeModel::always(READ_LATER_JSON)));

    let outcome = processor.run().await;

    assert_eq!(*mailbox.listed_with.lock().unwrap(), vec![2]);
    assert_eq!(outcome.stats.total, 2);
    assert_eq!(outcome.stats.processed, 2);
}

#[tokio::test]
async fn test_dry_run_has_no_side_effects() {
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![meeting_email("m1")]));
    let model = Arc::new(FakeModel::always(ACTION_JSON));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    let outcome = processor.run_dry_run().await;

    assert!(outcome.success);
    assert_eq!(outcome.stats.processed, 1);
    assert_eq!(model.calls(), 1);
    assert!(mailbox.forwards().is_empty());
    assert!(mailbox.labels().is_empty());
    assert!(mailbox.reports().is_empty());
}

#[tokio::test]
async fn test_translation_sender_gets_study_corner() {
    let response = r#"{
        "summary": "An article about tea culture.",
        "sections": [],
        "action_required": false,
        "reason": "Newsletter",
        "learning_segments": [{
            "original": "我喜欢喝茶",
            "pinyin": "wǒ xǐhuan hē chá",
            "translation": "I like drinking tea",
            "vocabulary": [{"word": "茶", "pinyin": "chá", "english": "tea"}]
        }]
    }"#;
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![email(
        "m1",
        "t1",
        "FT中文网 <daily@newsletter.ftchinese.com>",
        "每日英语",
        "我喜欢喝茶",
    )]));
    let model = Arc::new(FakeModel::always(response));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    let outcome = processor.run().await;

    assert_eq!(outcome.stats.processed, 1);
    assert!(model.prompts.lock().unwrap()[0].contains("learning_segments"));

    let summary = &mailbox.forwards()[0].summary_text;
    assert!(summary.contains("=== CHINESE STUDY CORNER ==="));
    assert!(summary.contains("Pinyin:   wǒ xǐhuan hē chá"));
    assert!(summary.contains("  • 茶: chá - tea"));
}

#[tokio::test]
async fn test_study_corner_dropped_for_other_senders() {
    let response = r#"{
        "summary": "s",
        "action_required": false,
        "reason": "r",
        "learning_segments": [{"original": "你好", "pinyin": "nǐ hǎo", "translation": "hello", "vocabulary": []}]
    }"#;
    let mailbox = Arc::new(FakeMailbox::with_messages(vec![meeting_email("m1")]));
    let model = Arc::new(FakeModel::always(response));
    let processor = DigestProcessor::new(test_config(), mailbox.clone(), model.clone());

    processor.run().await;

    assert!(!model.prompts.lock().unwrap()[0].contains("learning_segments"));
    assert!(!mailbox.forwards()[0].summary_text.contains("STUDY CORNER"));
}
