use async_trait::async_trait;
use pipeline::{Field, ResearchState, ResearchUpdate, SourceLocator, Stage, StageError};

use crate::gateway::LlmGateway;
use crate::prompts;

/// Produces `final_answer` and `review`.
///
/// `final_answer` is assembled from `drafted_answer` and `sources` without any
/// external call; `review` is generated independently and never feeds back
/// into the answer. The stage writes both fields or neither: a failed review
/// request fails the stage.
pub struct CritiqueStage {
    gateway: LlmGateway,
}

impl CritiqueStage {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Stage<ResearchState> for CritiqueStage {
    fn owned_fields(&self) -> &[Field] {
        &[Field::FinalAnswer, Field::Review]
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, StageError> {
        let final_answer = assemble_final_answer(state.drafted_answer()?, state.sources()?);
        let review = self.gateway.complete(&prompts::CRITIQUE, state).await?;
        Ok(ResearchUpdate::new()
            .final_answer(final_answer)
            .review(review))
    }
}

/// Appends a `Sources:` block listing one locator per line to `drafted`.
pub fn assemble_final_answer(drafted: &str, sources: &[SourceLocator]) -> String {
    let listed: Vec<&str> = sources.iter().map(SourceLocator::as_str).collect();
    format!("{drafted}\n\nSources:\n{}", listed.join("\n"))
}
