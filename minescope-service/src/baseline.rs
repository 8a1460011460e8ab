//! Detection baseline sources and the ordered fallback chain over them.

use crate::error::{ServiceError, ServiceResult};
use crate::http::{build_client, endpoint, json_body};
use crate::store::FileSnapshotStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Somewhere a detection baseline can be fetched from.
#[async_trait]
pub trait BaselineSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, analysis_id: &str) -> ServiceResult<Value>;
}

/// `GET {base}/analysis/{id}/results` on the local compute service or the proxy.
pub struct HttpBaselineSource {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpBaselineSource {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> ServiceResult<Self> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            client: build_client(timeout)?,
        })
    }

    pub fn url(&self, analysis_id: &str) -> String {
        endpoint(&self.base_url, analysis_id, "results")
    }
}

#[async_trait]
impl BaselineSource for HttpBaselineSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, analysis_id: &str) -> ServiceResult<Value> {
        let url = self.url(analysis_id);
        log::debug!("Fetching baseline from {}", url);
        let response = self.client.get(&url).send().await?;
        json_body(&url, response).await
    }
}

/// The baseline history record kept next to persisted snapshots.
pub struct HistoryBaselineSource {
    store: Arc<FileSnapshotStore>,
}

impl HistoryBaselineSource {
    pub fn new(store: Arc<FileSnapshotStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaselineSource for HistoryBaselineSource {
    fn name(&self) -> &str {
        "history"
    }

    async fn fetch(&self, analysis_id: &str) -> ServiceResult<Value> {
        self.store
            .load_history(analysis_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(analysis_id.to_string()))
    }
}

/// Tries each source in order; the first success wins.
pub struct BaselineChain {
    sources: Vec<Box<dyn BaselineSource>>,
}

/// A fetched baseline and the name of the source that supplied it.
#[derive(Debug, Clone)]
pub struct BaselineFetch {
    pub source: String,
    pub value: Value,
}

impl BaselineChain {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    pub fn with_source(mut self, source: impl BaselineSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub async fn fetch_from_any(&self, analysis_id: &str) -> ServiceResult<BaselineFetch> {
        let mut attempts = Vec::new();
        for source in &self.sources {
            match source.fetch(analysis_id).await {
                Ok(value) => {
                    log::info!("Loaded baseline for {} from {}", analysis_id, source.name());
                    return Ok(BaselineFetch {
                        source: source.name().to_string(),
                        value,
                    });
                }
                Err(err) => {
                    if err.is_transient() {
                        log::warn!("Baseline source {} unavailable: {}", source.name(), err);
                    } else {
                        log::error!("Baseline source {} failed: {}", source.name(), err);
                    }
                    attempts.push(format!("{}: {}", source.name(), err));
                }
            }
        }
        Err(ServiceError::AllSourcesFailed {
            analysis_id: analysis_id.to_string(),
            attempts,
        })
    }
}

impl Default for BaselineChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaselineSource for BaselineChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn fetch(&self, analysis_id: &str) -> ServiceResult<Value> {
        Ok(self.fetch_from_any(analysis_id).await?.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(&'static str, Option<Value>);

    #[async_trait]
    impl BaselineSource for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch(&self, analysis_id: &str) -> ServiceResult<Value> {
            self.1.clone().ok_or_else(|| ServiceError::NotFound(analysis_id.to_string()))
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let chain = BaselineChain::new()
            .with_source(Fixed("local", None))
            .with_source(Fixed("proxy", Some(json!({ "tiles": [] }))))
            .with_source(Fixed("history", Some(json!({ "tiles": [1] }))));
        let fetched = chain.fetch_from_any("a1").await.unwrap();
        assert_eq!(fetched.source, "proxy");
        assert_eq!(fetched.value, json!({ "tiles": [] }));
    }

    #[tokio::test]
    async fn test_all_failing_is_terminal() {
        let chain = BaselineChain::new()
            .with_source(Fixed("local", None))
            .with_source(Fixed("history", None));
        match chain.fetch_from_any("a1").await {
            Err(ServiceError::AllSourcesFailed { attempts, .. }) => assert_eq!(attempts.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_http_source_url() {
        let source = HttpBaselineSource::new("local", "http://127.0.0.1:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(source.url("abc"), "http://127.0.0.1:8000/analysis/abc/results");
        assert_eq!(source.name(), "local");
    }
}
