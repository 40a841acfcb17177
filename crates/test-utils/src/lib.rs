//! # Shared Test Utilities
//!
//! Mock providers, canned API bodies, and fixtures shared by the `stockmeta`
//! and `stockmeta-server` test suites.

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use calamine::{open_workbook_from_rs, Reader, Xlsx};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use stockmeta::{
    errors::InferenceError, providers::ai::VisionProvider, ImagePayload, UploadedImage,
};

static INIT: Once = Once::new();

/// Initializes a compact tracing subscriber once per test binary.
pub fn setup_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();
    });
}

// --- Fixtures ---

/// A keyword string with exactly 49 distinct singular terms.
pub fn forty_nine_keywords() -> String {
    let mut keywords = vec!["apple", "fruit", "table", "red", "fresh"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    keywords.extend((keywords.len()..49).map(|i| format!("term{i}")));
    keywords.join(",")
}

/// The JSON text a well-behaved model returns.
pub fn metadata_json(title: &str, description: &str) -> String {
    json!({
        "title": title,
        "description": description,
        "keywords": forty_nine_keywords(),
    })
    .to_string()
}

/// An OpenAI-compatible chat-completions body whose first choice carries `content`.
pub fn chat_completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "mock-vision-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// A Gemini `generateContent` body whose first candidate carries `text`.
pub fn gemini_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

/// A JPEG upload with arbitrary bytes. The bytes double as the mock lookup key.
pub fn jpeg(filename: &str, bytes: &[u8]) -> UploadedImage {
    UploadedImage::new(filename, "image/jpeg", bytes.to_vec())
}

/// Base64 of `bytes`, as it appears inside an inline data URI.
pub fn base64_of(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Reads every row of a sheet in an xlsx buffer as strings.
pub fn read_xlsx_rows(bytes: &[u8], sheet: &str) -> Result<Vec<Vec<String>>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range(sheet)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

/// The sheet names of an xlsx buffer, in workbook order.
pub fn xlsx_sheet_names(bytes: &[u8]) -> Result<Vec<String>> {
    let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))?;
    Ok(workbook.sheet_names())
}

// --- Mock Vision Provider ---

#[derive(Clone, Debug)]
enum MockReply {
    Text(String),
    Status(u16),
}

#[derive(Clone, Debug)]
struct MockEntry {
    reply: MockReply,
    delay: Duration,
}

/// A scripted `VisionProvider`.
///
/// Replies are keyed by image content: the decoded bytes for inline payloads,
/// the URL for reference payloads. Unknown images get the default reply, or an
/// HTTP 404 error when none is set.
#[derive(Clone, Debug, Default)]
pub struct MockVisionProvider {
    entries: Arc<Mutex<HashMap<Vec<u8>, MockEntry>>>,
    default_reply: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<ImagePayload>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockVisionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies with `text` to every image that has no scripted reply.
    pub fn with_default(self, text: impl Into<String>) -> Self {
        *self.default_reply.lock().unwrap() = Some(text.into());
        self
    }

    /// Scripts the reply for an image (inline bytes or reference URL bytes).
    pub fn respond(&self, key: &[u8], text: impl Into<String>) {
        self.respond_after(key, text, Duration::ZERO);
    }

    /// Scripts a reply that is only returned after `delay`.
    pub fn respond_after(&self, key: &[u8], text: impl Into<String>, delay: Duration) {
        self.insert(key, MockReply::Text(text.into()), delay);
    }

    /// Scripts an API error with the given HTTP status.
    pub fn fail(&self, key: &[u8], status: u16) {
        self.insert(key, MockReply::Status(status), Duration::ZERO);
    }

    fn insert(&self, key: &[u8], reply: MockReply, delay: Duration) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_vec(), MockEntry { reply, delay });
    }

    /// Every payload received, in call order.
    pub fn calls(&self) -> Vec<ImagePayload> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// The highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn key_for(image: &ImagePayload) -> Vec<u8> {
        match image {
            ImagePayload::Inline { data, .. } => general_purpose::STANDARD
                .decode(data)
                .unwrap_or_else(|_| data.as_bytes().to_vec()),
            ImagePayload::Url { url, .. } => url.as_bytes().to_vec(),
        }
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    async fn describe_image(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<String, InferenceError> {
        self.calls.lock().unwrap().push(image.clone());
        self.prompts.lock().unwrap().push(prompt.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let entry = self
            .entries
            .lock()
            .unwrap()
            .get(&Self::key_for(image))
            .cloned();
        let reply = match entry {
            Some(entry) => {
                if !entry.delay.is_zero() {
                    tokio::time::sleep(entry.delay).await;
                }
                entry.reply
            }
            None => {
                let default_reply = self.default_reply.lock().unwrap().clone();
                default_reply.map_or(MockReply::Status(404), MockReply::Text)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Status(status) => Err(InferenceError::Api {
                status,
                body: "mock failure".to_string(),
            }),
        }
    }
}
