use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::aggregate::aggregate;
use super::provider::{SearchError, SearchProvider};
use crate::config::ResourceMode;
use crate::fetch::{PageFetcher, redact_url};
use crate::llm::EntityExtractor;
use crate::model::{AggregatedResult, EnrichedHit, ExtractedEntities, SearchHit};

/// One hit after every pipeline stage.
#[derive(Debug)]
pub struct ProcessedHit {
    pub hit: EnrichedHit,
    /// `None` when the hit was skipped or its extraction failed.
    pub entities: Option<ExtractedEntities>,
}

#[derive(Debug)]
pub struct SearchReport {
    pub hits: Vec<ProcessedHit>,
    pub result: AggregatedResult,
}

/// Runs search → text extraction → entity extraction → aggregation for
/// one query. Per-hit failures are absorbed; only provider errors escape.
#[derive(Clone)]
pub struct Orchestrator {
    search: Option<Arc<dyn SearchProvider>>,
    fetcher: PageFetcher,
    extractor: EntityExtractor,
    mode: ResourceMode,
}

impl Orchestrator {
    pub fn new(
        search: Option<Arc<dyn SearchProvider>>,
        fetcher: PageFetcher,
        extractor: EntityExtractor,
        mode: ResourceMode,
    ) -> Self {
        Self {
            search,
            fetcher,
            extractor,
            mode,
        }
    }

    pub async fn run(&self, query: &str) -> Result<SearchReport, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let provider = self
            .search
            .as_deref()
            .ok_or(SearchError::ProviderMisconfigured)?;

        let hits = provider.search(query).await?;
        info!(hits = hits.len(), mode = ?self.mode, "search results received");

        let enriched = join_all(hits.into_iter().map(|hit| self.attach_text(hit))).await;

        let selected = select_for_extraction(&enriched, self.mode);
        let sent_to_model = selected.iter().filter(|send| **send).count();
        let entities = join_all(
            enriched
                .iter()
                .zip(selected)
                .enumerate()
                .map(|(index, (hit, send))| self.attach_entities(index, hit, send)),
        )
        .await;

        let result = aggregate(entities.iter().map(Option::as_ref));

        info!(
            hits = enriched.len(),
            with_text = enriched.iter().filter(|h| h.has_text()).count(),
            text_failures = enriched.iter().filter(|h| h.extraction_error.is_some()).count(),
            sent_to_model,
            companies = result.companies.len(),
            "search pipeline complete"
        );

        let hits = enriched
            .into_iter()
            .zip(entities)
            .map(|(hit, entities)| ProcessedHit { hit, entities })
            .collect();
        Ok(SearchReport { hits, result })
    }

    async fn attach_text(&self, hit: SearchHit) -> EnrichedHit {
        if hit.link.is_empty() {
            return EnrichedHit {
                hit,
                text: String::new(),
                extraction_error: None,
            };
        }

        match self.fetcher.extract_text(&hit.link).await {
            Ok(text) => EnrichedHit {
                hit,
                text,
                extraction_error: None,
            },
            Err(e) => {
                warn!(url = %redact_url(&hit.link), error = %e, "text extraction failed");
                EnrichedHit {
                    hit,
                    text: String::new(),
                    extraction_error: Some(e.to_string()),
                }
            }
        }
    }

    async fn attach_entities(
        &self,
        index: usize,
        hit: &EnrichedHit,
        send: bool,
    ) -> Option<ExtractedEntities> {
        if !send {
            debug!(index, has_text = hit.has_text(), "entity extraction skipped");
            return None;
        }

        match self.extractor.extract(&hit.text, self.mode).await {
            Ok(entities) => Some(entities),
            Err(e) => {
                warn!(index, url = %redact_url(&hit.hit.link), error = %e, "entity extraction failed");
                None
            }
        }
    }
}

/// Which hits go to the model, aligned with `hits`. Hits without text never
/// do; constrained mode additionally keeps only the first hit with text.
pub fn select_for_extraction(hits: &[EnrichedHit], mode: ResourceMode) -> Vec<bool> {
    let first_with_text = hits.iter().position(EnrichedHit::has_text);
    hits.iter()
        .enumerate()
        .map(|(index, hit)| match mode {
            ResourceMode::Normal => hit.has_text(),
            ResourceMode::Constrained => Some(index) == first_with_text,
        })
        .collect()
}
