//! The LLM gateway every generation-backed stage calls through.
//!
//! Rendering and the provider call are kept together so each stage makes
//! exactly one generation request per invocation, and every request is logged
//! the same way.

use std::sync::Arc;

use pipeline::{PromptSet, PromptTemplate, ResearchState, StageError, TextGenerator};
use tokio::time::Instant;
use tracing::debug;

/// Renders prompt templates and forwards them to a [`TextGenerator`].
#[derive(Clone)]
pub struct LlmGateway {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptSet>,
}

impl LlmGateway {
    /// `prompts` must already hold every template passed to [`Self::complete`].
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Arc<PromptSet>) -> Self {
        Self { generator, prompts }
    }

    /// Renders `template` against `state` and returns the generated text.
    ///
    /// # Errors
    ///
    /// [`StageError::TemplateRender`] if a placeholder's field is unset (no
    /// request is sent); [`StageError::Generation`] if the provider fails.
    pub async fn complete(
        &self,
        template: &PromptTemplate,
        state: &ResearchState,
    ) -> Result<String, StageError> {
        let instruction = self.prompts.render(template, state)?;
        let started = Instant::now();
        debug!(
            provider = self.generator.name(),
            template = template.name(),
            instruction_chars = instruction.chars().count(),
            "sending generation request"
        );

        let text = self.generator.generate(&instruction).await?;

        debug!(
            provider = self.generator.name(),
            template = template.name(),
            response_chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation response received"
        );
        Ok(text)
    }
}
