//! Data passed between pipeline stages and returned to HTTP callers.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// One organic result from the search provider. `link` may be empty or malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// A search hit after text extraction. `text` is empty when the page could
/// not be read; `extraction_error` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedHit {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
}

impl EnrichedHit {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A company as reported by the model for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyEntity {
    pub name: String,
    pub description: String,
    pub category: String,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub companies: Vec<CompanyEntity>,
}

/// A company merged across every page of one query, keyed by exact name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatedCompany {
    pub name: String,
    pub industry: String,
    pub description: String,
    pub signals: IndexSet<String>,
}

/// The response payload of one search, also the body of a saved map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatedResult {
    pub companies: Vec<AggregatedCompany>,
    pub industries: IndexSet<String>,
    pub signals: IndexSet<String>,
    /// Nothing populates this yet; kept so clients can rely on the field.
    pub people: IndexSet<String>,
}
