//! Shared reqwest plumbing for the compute service endpoints.

use crate::error::{ServiceError, ServiceResult};
use serde_json::Value;
use std::time::Duration;

pub(crate) fn build_client(timeout: Duration) -> ServiceResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("minescope/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub(crate) fn endpoint(base_url: &str, analysis_id: &str, leaf: &str) -> String {
    format!("{}/analysis/{}/{}", base_url.trim_end_matches('/'), analysis_id, leaf)
}

/// Turn a response into JSON, surfacing non-2xx statuses with their body.
pub(crate) async fn json_body(url: &str, response: reqwest::Response) -> ServiceResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }
    let value: Value = response.json().await?;
    if value.is_null() {
        return Err(ServiceError::Decode {
            origin: url.to_string(),
            message: "empty body".to_string(),
        });
    }
    Ok(value)
}
