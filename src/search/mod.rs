//! Search orchestration: provider lookup, per-page enrichment and cross-page aggregation.

pub mod aggregate;
pub mod engine;
pub mod provider;

pub use engine::Orchestrator;
pub use provider::{SearchError, SearchProvider, SerpApiClient};
