//! # Request Handlers
//!
//! `general` holds the liveness endpoints; `generate` holds the batch upload
//! endpoint.

pub mod general;
pub mod generate;

pub use general::{health_check, root};
pub use generate::generate_handler;
