//! Research pipeline LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::TextGenerator`] trait for any endpoint that
//! speaks the OpenAI chat-completions protocol. Additional providers are added
//! as new `impl` blocks in this crate without any changes to the `pipeline`
//! crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting and response parsing
//! live here; status-code classification is shared through `provider-http`.
//! The [`pipeline`] crate sees only [`pipeline::TextGenerator`] and
//! [`pipeline::GenerationError`]. Nothing is retried; rate-limit hints are
//! surfaced through [`pipeline::ProviderFailure::RateLimited`].

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiGenerator};
