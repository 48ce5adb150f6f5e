use crate::email::Email;

/// Body characters embedded in the prompt
pub const MAX_BODY_CHARS: usize = 4000;

const BASE_SCHEMA: &str = r#"{
    "summary": "A concise 1-2 sentence overall summary of the email",
    "sections": [
        {
            "topic": "Topic or theme of this section",
            "insight": "Key insight, information, or takeaway from this section"
        }
    ],
    "action_required": true,
    "reason": "Brief explanation of why action is or isn't required"
}"#;

const TRANSLATION_SCHEMA: &str = r#"{
    "summary": "A concise 1-2 sentence overall summary of the email, in English",
    "sections": [
        {
            "topic": "Topic or theme of this section",
            "insight": "Key insight, information, or takeaway from this section"
        }
    ],
    "action_required": false,
    "reason": "Brief explanation of why action is or isn't required",
    "learning_segments": [
        {
            "original": "A logical chunk of the original Chinese text",
            "pinyin": "Pinyin transliteration of the chunk, with tone marks",
            "translation": "Natural English translation of the chunk",
            "vocabulary": [
                {
                    "word": "Key word from the chunk",
                    "pinyin": "Pinyin of the word",
                    "english": "English meaning"
                }
            ]
        }
    ]
}"#;

const BASE_RULES: &str = "\
- summary: Concise overall summary of the email (1-2 sentences)
- sections: Break down the email into logical sections. For short emails, create 1 section. For longer emails with multiple topics, create multiple sections (2-5 sections)
- Each section must have a \"topic\" (the subject/theme) and an \"insight\" (the key information or takeaway)
- action_required: true if the email requires a response or action from the recipient, false otherwise
- reason: Brief explanation (one sentence)";

const TRANSLATION_RULES: &str = "\
- learning_segments: Split the main Chinese content into 3-5 logical chunks for a language learner
- Each segment must have the original text, its pinyin, an English translation, and 2-5 vocabulary entries";

/// First `max_chars` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Builds the analysis instruction for one email
pub fn build_prompt(email: &Email, translation_mode: bool) -> String {
    let (schema, extra_rules) = if translation_mode {
        (TRANSLATION_SCHEMA, format!("\n{}", TRANSLATION_RULES))
    } else {
        (BASE_SCHEMA, String::new())
    };

    format!(
        "You are an intelligent email assistant. Analyze the following email and provide a structured response.\n\
         \n\
         Email Subject: {subject}\n\
         Email Sender: {sender}\n\
         Email Body:\n\
         {body}\n\
         \n\
         IMPORTANT: You must respond with ONLY valid JSON in this exact format (no additional text):\n\
         {schema}\n\
         \n\
         Rules:\n\
         {rules}{extra_rules}\n\
         - Output ONLY the JSON object, nothing else\n",
        subject = email.subject,
        sender = email.sender,
        body = truncate_chars(&email.body, MAX_BODY_CHARS),
        schema = schema,
        rules = BASE_RULES,
        extra_rules = extra_rules,
    )
}
