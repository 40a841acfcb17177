//! # Default Prompt
//!
//! The instruction sent alongside every image. It can be replaced through the
//! server's `pipeline.prompt` setting.

pub const STOCK_METADATA_PROMPT: &str = r#"You are a professional Adobe Stock contributor.

Analyze the image and write metadata optimized for Adobe Stock search.

RULES:
- Title: 5 to 12 words, descriptive, no symbols or punctuation
- Description: one clear commercial sentence
- Keywords: EXACTLY 49 keywords, comma separated, singular form, most important first

Return ONLY a valid JSON object, with no other text:
{
  "title": "",
  "description": "",
  "keywords": ""
}"#;

/// The number of keywords the prompt asks for. Advisory only.
pub const EXPECTED_KEYWORD_COUNT: usize = 49;
