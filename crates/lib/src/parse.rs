//! # Response Parsing
//!
//! Turns the model's raw text into `ExtractedMetadata`. The text must be a
//! single JSON object; the only tolerance is one surrounding Markdown code
//! fence, which some models add even when told not to.

use crate::types::ExtractedMetadata;
use regex::Regex;
use std::sync::OnceLock;

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^```(?:json|JSON)?\s*\n?([\s\S]*?)\n?\s*```$").expect("code fence regex is valid")
    })
}

/// Strips a single Markdown code fence wrapping the whole response, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    code_fence()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed)
}

/// Parses the model's response text as `{"title", "description", "keywords"}`.
///
/// Missing fields, non-string values, and any prose around the object are errors.
pub fn parse_metadata(raw: &str) -> Result<ExtractedMetadata, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_object() {
        let meta = parse_metadata(
            r#"{"title":"Red Apple On Table","description":"A fresh red apple.","keywords":"apple,fruit"}"#,
        )
        .unwrap();
        assert_eq!(meta.title, "Red Apple On Table");
        assert_eq!(meta.keyword_count(), 2);
    }

    #[test]
    fn strips_fenced_json() {
        let raw = "```json\n{\"title\":\"t\",\"description\":\"d\",\"keywords\":\"k\"}\n```";
        let meta = parse_metadata(raw).unwrap();
        assert_eq!(meta.description, "d");
    }

    #[test]
    fn rejects_prose_around_json() {
        let raw = "Sure! Here is the metadata: {\"title\":\"t\",\"description\":\"d\",\"keywords\":\"k\"}";
        assert!(parse_metadata(raw).is_err());
    }

    #[test]
    fn rejects_missing_field() {
        let err = parse_metadata(r#"{"title":"t","description":"d"}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `keywords`"));
    }

    #[test]
    fn ignores_extra_fields() {
        let meta =
            parse_metadata(r#"{"title":"t","description":"d","keywords":"k","category":"food"}"#)
                .unwrap();
        assert_eq!(meta.keywords, "k");
    }
}
