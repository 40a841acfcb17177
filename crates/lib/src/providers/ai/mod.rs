pub mod gemini;
pub mod openai;

use crate::{encoding::ImagePayload, errors::InferenceError};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a vision-capable language model.
///
/// Implementations send one prompt and one image per call and return the
/// model's raw text reply, untouched.
#[async_trait]
pub trait VisionProvider: Send + Sync + Debug + DynClone {
    async fn describe_image(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<String, InferenceError>;
}

dyn_clone::clone_trait_object!(VisionProvider);
