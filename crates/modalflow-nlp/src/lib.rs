//! # Modalflow NLP
//!
//! Model-backed intent recognition.
//!
//! This crate provides:
//! - LlmClient trait with an OpenAI-compatible HTTP implementation
//! - LlmNlpEngine implementing the core NlpEngine contract, with a
//!   deterministic rule-based fallback when the model is unreachable

mod client;
mod engine;

pub use client::{HttpLlmClient, LlmClient, LlmError, LlmRequest, MockLlmClient};
pub use engine::LlmNlpEngine;
