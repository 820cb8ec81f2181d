//! LLM client and prompt templates.

pub mod client;
pub mod prompts;

pub use client::{GenerationService, LlmClient, Message, Role};
pub use prompts::{FALLBACK_PHRASE, Prompts};
