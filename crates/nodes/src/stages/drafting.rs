use async_trait::async_trait;
use pipeline::{Field, ResearchState, ResearchUpdate, Stage, StageError};

use crate::gateway::LlmGateway;
use crate::prompts;

/// Writes `drafted_answer` from `research_notes`.
pub struct DraftingStage {
    gateway: LlmGateway,
}

impl DraftingStage {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Stage<ResearchState> for DraftingStage {
    fn owned_fields(&self) -> &[Field] {
        &[Field::DraftedAnswer]
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, StageError> {
        let draft = self.gateway.complete(&prompts::ANALYSIS, state).await?;
        Ok(ResearchUpdate::new().drafted_answer(draft))
    }
}
