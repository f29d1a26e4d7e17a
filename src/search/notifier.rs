/// Detached, best-effort index notifications
use crate::{
    metrics,
    search::{DocumentKind, SearchIndex},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Dispatches index updates after the triggering transaction has committed.
///
/// Each notification runs on its own task with its own deadline; the outcome
/// is only logged. Callers may drop the returned handle.
#[derive(Clone)]
pub struct IndexNotifier {
    index: Arc<dyn SearchIndex>,
    timeout: Duration,
}

impl IndexNotifier {
    pub fn new(index: Arc<dyn SearchIndex>, timeout: Duration) -> Self {
        Self { index, timeout }
    }

    /// Create or replace a document, fire-and-forget
    pub fn upsert(
        &self,
        kind: DocumentKind,
        id: impl Into<String>,
        fields: serde_json::Value,
    ) -> JoinHandle<()> {
        let index = Arc::clone(&self.index);
        let timeout = self.timeout;
        let id = id.into();

        tokio::spawn(async move {
            let outcome = tokio::time::timeout(timeout, index.upsert_document(kind, &id, fields)).await;
            match outcome {
                Ok(Ok(())) => debug!(kind = kind.as_str(), id = %id, "indexed document"),
                Ok(Err(e)) => {
                    metrics::record_side_effect_failure("index_upsert");
                    warn!(kind = kind.as_str(), id = %id, error = %e, "failed to index document");
                }
                Err(_) => {
                    metrics::record_side_effect_failure("index_upsert");
                    warn!(kind = kind.as_str(), id = %id, ?timeout, "indexing timed out");
                }
            }
        })
    }

    /// Remove a document, fire-and-forget
    pub fn delete(&self, kind: DocumentKind, id: impl Into<String>) -> JoinHandle<()> {
        let index = Arc::clone(&self.index);
        let timeout = self.timeout;
        let id = id.into();

        tokio::spawn(async move {
            let outcome = tokio::time::timeout(timeout, index.delete_document(kind, &id)).await;
            match outcome {
                Ok(Ok(())) => debug!(kind = kind.as_str(), id = %id, "removed document from index"),
                Ok(Err(e)) => {
                    metrics::record_side_effect_failure("index_delete");
                    warn!(kind = kind.as_str(), id = %id, error = %e, "failed to remove document from index");
                }
                Err(_) => {
                    metrics::record_side_effect_failure("index_delete");
                    warn!(kind = kind.as_str(), id = %id, ?timeout, "index removal timed out");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingIndex {
        upserts: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn upsert_document(
            &self,
            _kind: DocumentKind,
            id: &str,
            _fields: serde_json::Value,
        ) -> AppResult<()> {
            self.upserts.lock().unwrap().push(id.to_string());
            Ok(())
        }

        async fn delete_document(&self, _kind: DocumentKind, id: &str) -> AppResult<()> {
            self.deletes.lock().unwrap().push(id.to_string());
            Ok(())
        }
    }

    struct BrokenIndex;

    #[async_trait]
    impl SearchIndex for BrokenIndex {
        async fn upsert_document(
            &self,
            _kind: DocumentKind,
            _id: &str,
            _fields: serde_json::Value,
        ) -> AppResult<()> {
            Err(AppError::Unavailable("index down".to_string()))
        }

        async fn delete_document(&self, _kind: DocumentKind, _id: &str) -> AppResult<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_notifications_reach_index() {
        let index = Arc::new(RecordingIndex::default());
        let notifier = IndexNotifier::new(index.clone(), Duration::from_secs(1));

        notifier
            .upsert(DocumentKind::Video, "v1", serde_json::json!({"title": "t"}))
            .await
            .unwrap();
        notifier.delete(DocumentKind::Video, "v1").await.unwrap();

        assert_eq!(*index.upserts.lock().unwrap(), vec!["v1".to_string()]);
        assert_eq!(*index.deletes.lock().unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_failures_and_timeouts_are_contained() {
        let notifier = IndexNotifier::new(Arc::new(BrokenIndex), Duration::from_millis(50));

        // Neither task panics; failures only surface in logs and metrics
        notifier
            .upsert(DocumentKind::Video, "v1", serde_json::json!({}))
            .await
            .unwrap();
        notifier.delete(DocumentKind::Video, "v1").await.unwrap();
    }
}
