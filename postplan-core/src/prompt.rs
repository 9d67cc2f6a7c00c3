//! Prompt template for the idea generator.
//!
//! The four labels below are what [`crate::parser`] looks for in the reply.
//! Renaming one here without the parser silently breaks extraction.

pub const LABEL_IDEA: &str = "Idea:";
pub const LABEL_CAPTION: &str = "Caption:";
pub const LABEL_BEST_TIME: &str = "Best time:";
pub const LABEL_HASHTAGS: &str = "Hashtags:";

/// Render the instruction sent to the language model.
pub fn build_prompt(topic: &str, count: u8) -> String {
    format!(
        "You are a top social media strategist.
Topic: {topic}

Generate exactly {count} complete post ideas with this exact format:

1. {LABEL_IDEA} [short description of the content, 8-12 words]
   {LABEL_CAPTION} [viral caption with emojis, under 180 chars]
   {LABEL_BEST_TIME} [e.g. Wednesday 7 PM]
   {LABEL_HASHTAGS} #A #B #C #D

2. {LABEL_IDEA} ...
   {LABEL_CAPTION} ...
   {LABEL_BEST_TIME} ...
   {LABEL_HASHTAGS} ...

Separate ideas with one blank line. Start directly with 1. No intro text."
    )
}
