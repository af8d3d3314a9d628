use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    Field, ResearchState, ResearchUpdate, SearchHit, SearchProvider, SourceLocator, Stage,
    StageError,
};
use tracing::debug;

/// Searches the web for the query.
///
/// Writes `raw_results` (hit contents joined by newlines, in provider order)
/// and `sources` (the locators of those hits, skipping hits without one).
pub struct RetrievalStage {
    search: Arc<dyn SearchProvider>,
}

impl RetrievalStage {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Stage<ResearchState> for RetrievalStage {
    fn owned_fields(&self) -> &[Field] {
        &[Field::RawResults, Field::Sources]
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, StageError> {
        let hits = self.search.search(state.query()).await?;
        let (raw_results, sources) = collate(hits);
        debug!(
            provider = self.search.name(),
            sources = sources.len(),
            raw_chars = raw_results.chars().count(),
            "search results collated"
        );
        Ok(ResearchUpdate::new()
            .raw_results(raw_results)
            .sources(sources))
    }
}

fn collate(hits: Vec<SearchHit>) -> (String, Vec<SourceLocator>) {
    let raw_results = hits
        .iter()
        .map(|hit| hit.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let sources = hits.into_iter().filter_map(|hit| hit.locator).collect();
    (raw_results, sources)
}
