//! Core orchestration domain for the research pipeline.
//!
//! This crate contains the State Record, the pipeline graph and its
//! compilation, prompt templates, the port traits for stages and external
//! collaborators, and the error taxonomy. Infrastructure crates implement the
//! traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`StageName`, `PipelineRunId`, `SourceLocator`, ...) |
//! | [`types`] | Shared value types (`ApiKey`, `Temperature`, `SearchHit`) |
//! | [`state`] | `StateRecord` contract, `ResearchState` and its typed updates |
//! | [`template`] | `PromptTemplate` and the Handlebars-backed `PromptSet` |
//! | [`graph`] | `PipelineGraph` builder and `CompiledPipeline` |
//! | [`ports`] | `Stage`, `TextGenerator` and `SearchProvider` traits |
//! | [`errors`] | Error taxonomy and retry advice |

pub mod errors;
pub mod graph;
pub mod identifiers;
pub mod ports;
pub mod state;
pub mod template;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{
    ContractViolation, EmptyQueryError, GenerationError, GraphError, GraphValidationError,
    MissingFieldError, ProviderFailure, RetryPolicy, SearchError, StageError,
    StageExecutionError, TemplateRenderError, UnknownFieldError,
};
pub use graph::{CompiledPipeline, CompiledStage, PipelineGraph};
pub use identifiers::{PipelineName, PipelineRunId, SourceLocator, StageName};
pub use ports::{SearchProvider, Stage, TextGenerator};
pub use state::{Field, FieldValue, ResearchState, ResearchUpdate, StateRecord};
pub use template::{PromptSet, PromptTemplate};
pub use types::{ApiKey, SearchHit, Temperature};
