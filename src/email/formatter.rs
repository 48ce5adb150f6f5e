//! Text of the summary placed on top of a forwarded email.

use std::fmt::Write;

use crate::analyzer::{AnalysisResult, LearningSegment, Section};
use crate::email::Email;

pub const ACTION_REQUIRED_LABEL: &str = "ActionRequired";
pub const READ_LATER_LABEL: &str = "ReadLater";

/// Label applied to the original message after forwarding
pub fn label_for(analysis: &AnalysisResult) -> &'static str {
    if analysis.action_required() {
        ACTION_REQUIRED_LABEL
    } else {
        READ_LATER_LABEL
    }
}

pub fn format_forward_body(email: &Email, analysis: &AnalysisResult) -> String {
    let unsubscribe_section = analysis
        .unsubscribe_link()
        .map(|link| format!("\n\nUnsubscribe Link: {}\n", link))
        .unwrap_or_default();

    format!(
        "=== EMAIL SUMMARY ===\n\
         \n\
         Original Sender: {sender}\n\
         Subject: {subject}\n\
         \n\
         Summary:\n\
         {summary}{insights}{translation}\n\
         Action Required: {action}\n\
         Reason: {reason}{unsubscribe}\n\
         ========================\n",
        sender = email.sender,
        subject = email.subject,
        summary = analysis.summary(),
        insights = format_insights(analysis.sections()),
        translation = analysis.learning_segments().map(format_study_corner).unwrap_or_default(),
        action = if analysis.action_required() { "YES" } else { "NO" },
        reason = analysis.reason(),
        unsubscribe = unsubscribe_section,
    )
}

fn format_insights(sections: &[Section]) -> String {
    if sections.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\nInsights:\n");
    for section in sections {
        let _ = writeln!(out, "• {}: {}", section.topic, section.insight);
    }
    out
}

fn format_study_corner(segments: &[LearningSegment]) -> String {
    if segments.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\n=== CHINESE STUDY CORNER ===\n");
    for (i, segment) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "\n[Segment {}]\nOriginal: {}\n\nPinyin:   {}\n\nEnglish:  {}\n\n",
            i + 1,
            segment.original,
            segment.pinyin,
            segment.translation
        );

        if !segment.vocabulary.is_empty() {
            out.push_str("Vocabulary:\n");
            for vocab in &segment.vocabulary {
                let _ = writeln!(out, "  • {}: {} - {}", vocab.word, vocab.pinyin, vocab.english);
            }
            out.push('\n');
        }
    }
    out.push_str("\n=============================\n");
    out
}
