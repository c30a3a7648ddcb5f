//! # SOP Check Completion
//!
//! The boundary to the generative service used for requirement decomposition
//! and adjudication.
//!
//! - [`TextCompletion`]: one prompt in, raw text out
//! - [`HttpCompletionClient`]: OpenAI-compatible chat-completions transport
//! - [`RetryPolicy`]: capped exponential backoff shared by every caller
//! - [`extract_json_array`] / [`extract_json_object`]: strip fences and prose
//!   around the JSON payload of a reply

mod client;
mod error;
mod json;
mod retry;

pub use client::{CompletionConfig, HttpCompletionClient, TextCompletion};
pub use error::{CompletionError, Result};
pub use json::{extract_json_array, extract_json_object, extract_json_span};
pub use retry::{RetryPolicy, Retryable};
