/// Search index integration
///
/// The core only ever pushes documents into the index; queries are served
/// elsewhere. Every push is best-effort and runs detached from the request
/// that triggered it (see [`IndexNotifier`]).

pub mod elasticsearch;
pub mod notifier;

pub use elasticsearch::ElasticsearchIndex;
pub use notifier::IndexNotifier;

use crate::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kinds of documents kept in the search index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Video,
    User,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Video => "video",
            DocumentKind::User => "user",
        }
    }
}

/// Search index backend trait
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or replace a document
    async fn upsert_document(
        &self,
        kind: DocumentKind,
        id: &str,
        fields: serde_json::Value,
    ) -> AppResult<()>;

    /// Remove a document; removing an absent document succeeds
    async fn delete_document(&self, kind: DocumentKind, id: &str) -> AppResult<()>;
}

/// Index used when search is disabled: accepts and drops everything
#[derive(Debug, Clone, Default)]
pub struct DisabledIndex;

#[async_trait]
impl SearchIndex for DisabledIndex {
    async fn upsert_document(
        &self,
        kind: DocumentKind,
        id: &str,
        _fields: serde_json::Value,
    ) -> AppResult<()> {
        tracing::trace!(kind = kind.as_str(), id, "search disabled, skipping upsert");
        Ok(())
    }

    async fn delete_document(&self, kind: DocumentKind, id: &str) -> AppResult<()> {
        tracing::trace!(kind = kind.as_str(), id, "search disabled, skipping delete");
        Ok(())
    }
}
