//! Error taxonomy for the research pipeline.
//!
//! Every error here is fatal to the invocation that produced it. Nothing is
//! retried inside the pipeline; collaborator errors expose a [`RetryPolicy`]
//! hint so that a caller can decide on retry and back-off externally.
//!
//! | Error | Raised when |
//! |-------|-------------|
//! | [`MissingFieldError`] | a stage reads a state field no earlier stage populated |
//! | [`TemplateRenderError`] | a prompt template cannot be rendered |
//! | [`GenerationError`] / [`SearchError`] | an external collaborator call fails |
//! | [`StageError`] | any of the above, plus contract violations and cancellation, inside one stage |
//! | [`StageExecutionError`] | the executor wraps a [`StageError`] with the failing stage's name |
//! | [`GraphError`] / [`GraphValidationError`] | the graph is mis-wired, before any invocation |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PipelineRunId, StageName};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// The pipeline itself never retries; this is advice for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, e.g. derived from a
        /// `Retry-After` header. `None` means apply the caller's own schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without human intervention.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// State and template errors
// ---------------------------------------------------------------------------

/// The initial query was empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query must not be empty")]
pub struct EmptyQueryError;

/// A name does not match any field of the state record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown state field '{0}'")]
pub struct UnknownFieldError(pub String);

/// A stage read a state field that no earlier stage has populated.
///
/// Always a graph-wiring bug, never a user-recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("state field '{field}' has not been populated by an earlier stage")]
pub struct MissingFieldError {
    /// Name of the field that was read.
    pub field: String,
}

impl MissingFieldError {
    /// Creates an error for `field`.
    pub fn new(field: impl std::fmt::Display) -> Self {
        Self {
            field: field.to_string(),
        }
    }
}

/// A prompt template could not be rendered against the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateRenderError {
    /// A placeholder names a field that is not yet populated.
    #[error("template '{template}' cannot be rendered: {source}")]
    MissingField {
        /// Template name.
        template: String,
        /// The underlying state read failure.
        #[source]
        source: MissingFieldError,
    },

    /// A placeholder names no known state field.
    #[error("template '{template}' references unknown placeholder '{{{{{placeholder}}}}}'")]
    UnknownPlaceholder {
        /// Template name.
        template: String,
        /// The expression between the mustaches.
        placeholder: String,
    },

    /// The template text does not parse.
    #[error("template '{template}' is malformed: {reason}")]
    Syntax {
        template: String,
        reason: String,
    },

    /// Rendering was requested for a template that was never registered.
    #[error("template '{template}' is not registered")]
    NotRegistered { template: String },
}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// How an external provider call failed.
///
/// Shared by [`GenerationError`] and [`SearchError`]; the pipeline does not
/// distinguish transient from permanent failures, but [`Self::retry_policy`]
/// gives the caller enough to do so.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFailure {
    /// The request never produced an HTTP response (DNS, connect, TLS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not complete within the client timeout.
    #[error("request timed out")]
    Timeout,

    /// The provider rejected the credential (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The provider asked the caller to slow down (HTTP 429).
    #[error("rate limited{}", format_retry_after(.retry_after))]
    RateLimited {
        /// Delay requested by the provider, if it sent one.
        retry_after: Option<Duration>,
    },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The provider answered but the body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderFailure {
    /// Returns the retry advice for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport(_) | Self::Timeout => RetryPolicy::Retryable { after: None },
            Self::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Status { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            Self::Status { .. } | Self::AuthFailed(_) | Self::InvalidResponse(_) => {
                RetryPolicy::NonRetryable
            }
        }
    }
}

fn format_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(": retry after {}s", d.as_secs()),
        None => String::new(),
    }
}

/// The text-generation collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("generation provider '{provider}' failed: {failure}")]
pub struct GenerationError {
    /// Name of the provider that failed (e.g. `"openai"`).
    pub provider: String,
    /// What went wrong.
    #[source]
    pub failure: ProviderFailure,
}

impl GenerationError {
    /// Creates a [`GenerationError`].
    pub fn new(provider: impl Into<String>, failure: ProviderFailure) -> Self {
        Self {
            provider: provider.into(),
            failure,
        }
    }

    /// Returns the retry advice for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.failure.retry_policy()
    }
}

/// The web-search collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("search provider '{provider}' failed: {failure}")]
pub struct SearchError {
    /// Name of the provider that failed (e.g. `"tavily"`).
    pub provider: String,
    /// What went wrong.
    #[source]
    pub failure: ProviderFailure,
}

impl SearchError {
    /// Creates a [`SearchError`].
    pub fn new(provider: impl Into<String>, failure: ProviderFailure) -> Self {
        Self {
            provider: provider.into(),
            failure,
        }
    }

    /// Returns the retry advice for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.failure.retry_policy()
    }
}

// ---------------------------------------------------------------------------
// Stage and execution errors
// ---------------------------------------------------------------------------

/// The way a stage's output broke the monotonic-state contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    /// The update wrote a field the stage does not own.
    WroteUnownedField,
    /// A field populated before the stage ran is absent afterwards.
    DroppedField,
    /// A field the stage does not own changed value.
    AlteredField,
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::WroteUnownedField => "wrote a field it does not own",
            Self::DroppedField => "dropped a previously populated field",
            Self::AlteredField => "altered a field it does not own",
        })
    }
}

/// Why a single stage failed.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage read a field that was not yet populated.
    #[error(transparent)]
    MissingField(#[from] MissingFieldError),

    /// The stage's prompt template could not be rendered.
    #[error(transparent)]
    TemplateRender(#[from] TemplateRenderError),

    /// The generation collaborator failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The search collaborator failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// The stage's output did not preserve the accumulated state.
    #[error("state contract violated on field '{field}': stage {violation}")]
    StateContractViolation {
        /// Field the violation concerns.
        field: String,
        /// What the stage did wrong.
        violation: ContractViolation,
    },

    /// The invocation's cancellation token fired while the stage was running.
    #[error("cancelled")]
    Cancelled,

    /// The invocation's overall deadline passed while the stage was running.
    #[error("deadline of {}s exceeded", .deadline.as_secs_f64())]
    DeadlineExceeded {
        /// The configured overall deadline.
        deadline: Duration,
    },
}

impl StageError {
    /// Returns the retry advice for this failure.
    ///
    /// Only collaborator failures and deadline overruns are retryable; every
    /// other variant indicates a wiring bug or a deliberate abort.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Generation(e) => e.retry_policy(),
            Self::Search(e) => e.retry_policy(),
            Self::DeadlineExceeded { .. } => RetryPolicy::Retryable { after: None },
            _ => RetryPolicy::NonRetryable,
        }
    }
}

/// A pipeline invocation failed in a specific stage.
///
/// No partial state accompanies this error; later stages never ran.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {cause}")]
pub struct StageExecutionError {
    /// The run that failed.
    pub run_id: PipelineRunId,
    /// The stage that failed.
    pub stage: StageName,
    /// The underlying failure.
    #[source]
    pub cause: StageError,
}

// ---------------------------------------------------------------------------
// Graph construction and validation errors
// ---------------------------------------------------------------------------

/// A graph-building call referenced stages incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A stage with this name is already registered.
    #[error("stage '{name}' is already registered")]
    DuplicateStage {
        /// The duplicated name.
        name: String,
    },

    /// Stage and pipeline names must be non-empty.
    #[error("names must not be empty")]
    EmptyName,

    /// The name does not refer to a registered stage.
    #[error("stage '{name}' is not registered")]
    UnknownStage {
        /// The unknown name.
        name: String,
    },
}

/// The graph is structurally invalid; detected by `compile()` before any
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphValidationError {
    /// `set_entry` was never called.
    #[error("no entry stage has been set")]
    EntryUnset,

    /// `set_terminal` was never called.
    #[error("no terminal stage has been set")]
    TerminalUnset,

    /// Following edges from the entry revisits a stage.
    #[error("cycle detected: {}", format_path(.path))]
    Cycle {
        /// The walk up to and including the revisited stage.
        path: Vec<StageName>,
    },

    /// A non-terminal stage has no outgoing edge, so the terminal is unreachable.
    #[error("stage '{stage}' has no outgoing edge; terminal is unreachable")]
    DeadEnd {
        /// The stage without an edge.
        stage: StageName,
    },

    /// A stage has more than one outgoing edge; only chains are executable.
    #[error("stage '{stage}' has {} outgoing edges ({}); only a single chain is supported", .targets.len(), format_path(.targets))]
    Branching {
        /// The stage with several edges.
        stage: StageName,
        /// Every edge target, in insertion order.
        targets: Vec<StageName>,
    },

    /// The terminal stage has an outgoing edge.
    #[error("terminal stage '{stage}' must not have an outgoing edge (found edge to '{target}')")]
    TerminalHasEdge {
        /// The terminal stage.
        stage: StageName,
        /// The edge target.
        target: StageName,
    },

    /// A registered stage is not on the entry-to-terminal chain.
    #[error("stage '{stage}' is not reachable from the entry stage")]
    Unreachable {
        /// The stranded stage.
        stage: StageName,
    },
}

fn format_path(path: &[StageName]) -> String {
    path.iter()
        .map(StageName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
