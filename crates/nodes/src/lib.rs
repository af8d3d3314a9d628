//! Research pipeline stage implementations, LLM gateway and executor.
//!
//! This crate provides the four research stages (retrieval, summarization,
//! drafting, critique), the [`LlmGateway`] every generation call goes through,
//! and the [`PipelineExecutor`] that drives a compiled pipeline.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between the state record in
//! the [`pipeline`] crate and the collaborator traits (search, generation).
//! They contain no transport details of their own.

pub mod executor;
pub mod gateway;
pub mod prompts;
pub mod stages;

use std::sync::Arc;

use pipeline::{
    CompiledPipeline, GraphError, GraphValidationError, PipelineGraph, PipelineName,
    PromptSet, ResearchState, SearchProvider, TemplateRenderError, TextGenerator,
};
use thiserror::Error;

pub use executor::{apply_update, PipelineExecutor};
pub use gateway::LlmGateway;
pub use stages::{
    assemble_final_answer, CritiqueStage, DraftingStage, RetrievalStage, SummarizationStage,
};

/// Name of the compiled research pipeline.
pub const PIPELINE_NAME: &str = "research";

pub const RETRIEVAL: &str = "retrieval";
pub const SUMMARIZATION: &str = "summarization";
pub const DRAFTING: &str = "drafting";
pub const CRITIQUE: &str = "critique";

/// The research pipeline could not be assembled.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Validation(#[from] GraphValidationError),

    #[error(transparent)]
    Template(#[from] TemplateRenderError),
}

/// Wires the four stages into the `retrieval -> summarization -> drafting ->
/// critique` chain and compiles it.
///
/// Prompt templates are registered and validated here, so a malformed one
/// fails at startup rather than mid-run.
///
/// # Errors
///
/// Returns [`BuildError`] if a template is malformed or the graph fails
/// validation.
pub fn research_pipeline(
    generator: Arc<dyn TextGenerator>,
    search: Arc<dyn SearchProvider>,
) -> Result<CompiledPipeline<ResearchState>, BuildError> {
    let mut templates = PromptSet::new();
    for template in &prompts::ALL {
        templates.register(template)?;
    }

    let gateway = LlmGateway::new(generator, Arc::new(templates));
    let name = PipelineName::new(PIPELINE_NAME).ok_or(GraphError::EmptyName)?;
    let mut graph = PipelineGraph::new(name);
    graph
        .register(RETRIEVAL, RetrievalStage::new(search))?
        .register(SUMMARIZATION, SummarizationStage::new(gateway.clone()))?
        .register(DRAFTING, DraftingStage::new(gateway.clone()))?
        .register(CRITIQUE, CritiqueStage::new(gateway))?;
    graph
        .connect(RETRIEVAL, SUMMARIZATION)?
        .connect(SUMMARIZATION, DRAFTING)?
        .connect(DRAFTING, CRITIQUE)?;
    graph.set_entry(RETRIEVAL)?.set_terminal(CRITIQUE)?;

    Ok(graph.compile()?)
}
