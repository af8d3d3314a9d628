//! The four research stages, in pipeline order.

mod critique;
mod drafting;
mod retrieval;
mod summarization;

pub use critique::{assemble_final_answer, CritiqueStage};
pub use drafting::DraftingStage;
pub use retrieval::RetrievalStage;
pub use summarization::SummarizationStage;
