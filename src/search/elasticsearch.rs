/// Elasticsearch-backed search index
use crate::{
    config::SearchConfig,
    error::{AppError, AppResult},
    search::{DocumentKind, SearchIndex},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Talks to Elasticsearch's document API over HTTP
#[derive(Clone)]
pub struct ElasticsearchIndex {
    http_client: Client,
    base_url: String,
    videos_index: String,
    users_index: String,
}

impl ElasticsearchIndex {
    pub fn new(config: &SearchConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(config.notify_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build search client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            videos_index: config.videos_index.clone(),
            users_index: config.users_index.clone(),
        })
    }

    fn document_url(&self, kind: DocumentKind, id: &str) -> String {
        let index = match kind {
            DocumentKind::Video => &self.videos_index,
            DocumentKind::User => &self.users_index,
        };
        format!("{}/{}/_doc/{}", self.base_url, index, id)
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn upsert_document(
        &self,
        kind: DocumentKind,
        id: &str,
        fields: serde_json::Value,
    ) -> AppResult<()> {
        let url = self.document_url(kind, id);
        debug!("Indexing {} document {}", kind.as_str(), id);

        let response = self
            .http_client
            .put(&url)
            .json(&fields)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Search index unreachable: {}", e)))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::Unavailable(format!(
                    "Failed to index {} {}: status {}, body: {}",
                    kind.as_str(),
                    id,
                    status,
                    body
                )))
            }
        }
    }

    async fn delete_document(&self, kind: DocumentKind, id: &str) -> AppResult<()> {
        let url = self.document_url(kind, id);
        debug!("Removing {} document {}", kind.as_str(), id);

        let response = self
            .http_client
            .delete(&url)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Search index unreachable: {}", e)))?;

        // 404: document was never indexed
        match response.status() {
            StatusCode::OK | StatusCode::NOT_FOUND => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::Unavailable(format!(
                    "Failed to delete {} {}: status {}, body: {}",
                    kind.as_str(),
                    id,
                    status,
                    body
                )))
            }
        }
    }
}
