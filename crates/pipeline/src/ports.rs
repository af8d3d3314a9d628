//! Port traits: the seams between orchestration and the outside world.
//!
//! [`Stage`] is implemented by the `nodes` crate; [`TextGenerator`] and
//! [`SearchProvider`] are implemented by the `llm` and `search` infrastructure
//! crates and injected into stage constructors, so tests can substitute
//! deterministic fakes.

use async_trait::async_trait;

use crate::errors::{GenerationError, SearchError, StageError};
use crate::state::StateRecord;
use crate::types::SearchHit;

/// One named processing step.
///
/// A stage reads the accumulated state and returns a typed update holding
/// only the fields it owns. It keeps no data between invocations.
#[async_trait]
pub trait Stage<S: StateRecord>: Send + Sync {
    /// Fields this stage is allowed to write (and to overwrite).
    fn owned_fields(&self) -> &[S::Field];

    /// Runs the stage against `state`.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`] when a required field is missing or an external
    /// collaborator call fails. The executor wraps it with the stage name.
    async fn run(&self, state: &S) -> Result<S::Update, StageError>;
}

/// Text-generation capability: rendered instruction in, generated text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name for logs and errors (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Generates a completion for `instruction`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] on provider or network failure.
    async fn generate(&self, instruction: &str) -> Result<String, GenerationError>;
}

/// Web-search capability.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logs and errors (e.g. `"tavily"`).
    fn name(&self) -> &str;

    /// Searches for `query`, returning hits in provider ranking order.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on provider or network failure.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}
