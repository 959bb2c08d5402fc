//! LLM integration module.
//!
//! Provides the [`LanguageModel`] capability, an OpenAI-compatible client
//! implementing it, and the prompts used by the QA chains.

mod client;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::Prompts;

use crate::BoxFuture;
use crate::error::Result;

/// Text-in, text-out language model.
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Complete a single prompt.
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
}
