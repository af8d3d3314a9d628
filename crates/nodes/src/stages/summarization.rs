use async_trait::async_trait;
use pipeline::{Field, ResearchState, ResearchUpdate, Stage, StageError};

use crate::gateway::LlmGateway;
use crate::prompts;

/// Condenses `raw_results` into `research_notes`.
pub struct SummarizationStage {
    gateway: LlmGateway,
}

impl SummarizationStage {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Stage<ResearchState> for SummarizationStage {
    fn owned_fields(&self) -> &[Field] {
        &[Field::ResearchNotes]
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, StageError> {
        let notes = self.gateway.complete(&prompts::SUMMARY, state).await?;
        Ok(ResearchUpdate::new().research_notes(notes))
    }
}
