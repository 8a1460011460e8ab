//! Client for the backend's quantitative (DEM/volume) computation.

use crate::error::ServiceResult;
use crate::http::{build_client, endpoint, json_body};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

#[async_trait]
pub trait QuantCompute: Send + Sync {
    /// Run the computation for `analysis_id` over the detection baseline and
    /// return the raw response.
    async fn compute(&self, analysis_id: &str, results: &Value) -> ServiceResult<Value>;
}

/// `POST {base}/analysis/{id}/quantitative` with body `{ "results": ... }`.
pub struct HttpComputeClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpComputeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ServiceResult<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client(timeout)?,
        })
    }

    pub fn url(&self, analysis_id: &str) -> String {
        endpoint(&self.base_url, analysis_id, "quantitative")
    }
}

#[async_trait]
impl QuantCompute for HttpComputeClient {
    async fn compute(&self, analysis_id: &str, results: &Value) -> ServiceResult<Value> {
        let url = self.url(analysis_id);
        log::info!("Requesting quantitative analysis at {}", url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "results": results }))
            .send()
            .await?;
        json_body(&url, response).await
    }
}
