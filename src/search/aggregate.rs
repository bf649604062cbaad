//! Cross-page merge of extracted entities.

use indexmap::{IndexMap, IndexSet};

use crate::model::{AggregatedCompany, AggregatedResult, ExtractedEntities};

/// Accumulates entity batches. Companies merge on exact name; the first
/// occurrence owns `industry` and `description`, later ones only add signals.
#[derive(Debug, Default)]
pub struct Aggregator {
    companies: IndexMap<String, AggregatedCompany>,
    industries: IndexSet<String>,
    signals: IndexSet<String>,
    people: IndexSet<String>,
}

impl Aggregator {
    pub fn add(&mut self, entities: &ExtractedEntities) {
        for company in &entities.companies {
            if !company.category.trim().is_empty() {
                self.industries.insert(company.category.clone());
            }
            self.signals.extend(company.signals.iter().cloned());

            self.companies
                .entry(company.name.clone())
                .or_insert_with(|| AggregatedCompany {
                    name: company.name.clone(),
                    industry: company.category.clone(),
                    description: company.description.clone(),
                    signals: IndexSet::new(),
                })
                .signals
                .extend(company.signals.iter().cloned());
        }
    }

    pub fn finish(self) -> AggregatedResult {
        AggregatedResult {
            companies: self.companies.into_values().collect(),
            industries: self.industries,
            signals: self.signals,
            people: self.people,
        }
    }
}

/// Merges per-hit results; `None` entries (skipped or failed hits) are ignored.
pub fn aggregate<'a>(
    batches: impl IntoIterator<Item = Option<&'a ExtractedEntities>>,
) -> AggregatedResult {
    let mut aggregator = Aggregator::default();
    for entities in batches.into_iter().flatten() {
        aggregator.add(entities);
    }
    aggregator.finish()
}
