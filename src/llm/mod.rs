//! Entity extraction through a language model.

pub mod client;
pub mod entities;
mod types;

pub use client::{ClaudeClient, EntityExtractionProvider, LlmError};
pub use entities::{EntityExtractor, ModelChoice};
