//! Deterministic provider fakes shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::llm::client::{CompletionRequest, EntityExtractionProvider, LlmError};
use crate::maps::{MapStore, SavedMap, StoreError};
use crate::model::SearchHit;
use crate::search::provider::{SearchError, SearchProvider};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub system: String,
    pub user: String,
}

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

/// Model fake that records every prompt and answers through `respond`.
pub struct FakeModel {
    respond: Responder,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeModel {
    pub fn with(respond: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::with(move |_| Ok(reply.clone()))
    }

    pub fn failing() -> Self {
        Self::with(|_| Err(LlmError::RateLimited))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntityExtractionProvider for FakeModel {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: request.model.to_string(),
            system: request.system.to_string(),
            user: request.user.clone(),
        });
        (self.respond)(&request.user)
    }
}

/// Search fake returning a fixed hit list (or a fixed failure).
pub struct FakeSearch {
    outcome: Mutex<Option<Result<Vec<SearchHit>, SearchError>>>,
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn returning(hits: Vec<SearchHit>) -> Self {
        Self {
            outcome: Mutex::new(None),
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: SearchError) -> Self {
        Self {
            outcome: Mutex::new(Some(Err(error))),
            hits: Vec::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        match self.outcome.lock().unwrap().take() {
            Some(outcome) => outcome,
            None => Ok(self.hits.clone()),
        }
    }
}

pub fn hit(title: &str, link: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        link: link.to_string(),
        snippet: String::new(),
    }
}

/// Map store whose every operation fails.
pub struct BrokenStore;

impl BrokenStore {
    fn error() -> StoreError {
        StoreError::Backend("connection refused".to_string())
    }
}

#[async_trait]
impl MapStore for BrokenStore {
    async fn create(&self, _map: SavedMap) -> Result<(), StoreError> {
        Err(Self::error())
    }

    async fn get(&self, _id: Uuid) -> Result<Option<SavedMap>, StoreError> {
        Err(Self::error())
    }

    async fn list_by_owner(&self, _session_id: &str) -> Result<Vec<SavedMap>, StoreError> {
        Err(Self::error())
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, StoreError> {
        Err(Self::error())
    }
}
