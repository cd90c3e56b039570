//! Vision language model client.

mod client;

pub use client::{CompletionBackend, LlmClient, LlmConfig, LlmError};
