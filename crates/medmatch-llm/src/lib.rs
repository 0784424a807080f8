//! Model-assisted extraction and ranking for MedMatch.
//!
//! Talks to any OpenAI-compatible chat endpoint (llama.cpp server, vLLM,
//! hosted APIs). [`AssistedParser`] plugs into the core extractor as its
//! fallback parser; [`AssistedRanker`] replaces the deterministic ranker and
//! falls back to it on any failure.

pub mod assisted;
pub mod backend;
pub mod extraction;
pub mod prompts;

pub use assisted::{assisted_pair, AssistedParser, AssistedRanker};
pub use backend::{ChatMessage, CompletionBackend, MockBackend, OpenAiCompatBackend};
pub use extraction::{AssistError, AssistResult};
