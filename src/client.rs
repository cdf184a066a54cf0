//! HTTP client for the remote analysis service.
//!
//! Each workflow action maps to exactly one POST. Requests are sent at most
//! once, with no retry: the service runs model fits and plot generation, so
//! a repeated request costs real work and may not be idempotent. Failures
//! come back as [`WorkflowError`] and the caller decides what to do.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde_json::Value;

use crate::error::WorkflowError;
use crate::model::{
    AnalysisRequest, AnalysisResponse, ClientConfig, Endpoint, SummaryReport,
};

/// Boundary between the orchestrator and the network. Tests drive the
/// orchestrator through a fake implementation.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn send(&self, request: AnalysisRequest) -> Result<AnalysisResponse, WorkflowError>;
}

pub struct HttpAnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisClient {
    async fn send(&self, request: AnalysisRequest) -> Result<AnalysisResponse, WorkflowError> {
        let endpoint = request.endpoint();
        let url = format!("{}{}", self.base_url, endpoint.path());
        tracing::debug!(endpoint = endpoint.path(), "sending request");

        let builder = match &request {
            AnalysisRequest::Upload { file } => {
                let bytes = tokio::fs::read(file).await.map_err(|e| {
                    WorkflowError::Transport(format!("read {}: {e}", file.display()))
                })?;
                let file_name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "dataset".to_string());
                let part = multipart::Part::bytes(bytes).file_name(file_name);
                let form = multipart::Form::new().part("file", part);
                self.http.post(&url).multipart(form)
            }
            other => self.http.post(&url).json(&other.body()),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| WorkflowError::Transport(format!("{}: {e}", endpoint.path())))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| WorkflowError::Transport(format!("{}: {e}", endpoint.path())))?;

        let body: Value = serde_json::from_slice(&bytes).map_err(|_| {
            WorkflowError::Transport(format!(
                "{}: HTTP {} with a non-JSON body",
                endpoint.path(),
                status.as_u16()
            ))
        })?;
        interpret_response(endpoint, body)
    }
}

/// Decode a response body into the endpoint's typed payload.
///
/// A top-level `error` field is authoritative: if present and non-null the
/// action failed with the service's message, whatever the HTTP status line
/// said. The status code is otherwise not consulted at all.
pub fn interpret_response(
    endpoint: Endpoint,
    body: Value,
) -> Result<AnalysisResponse, WorkflowError> {
    if let Some(error) = body.get("error") {
        if !error.is_null() {
            let message = match error.as_str() {
                Some(text) => text.to_string(),
                None => error.to_string(),
            };
            return Err(WorkflowError::Service(message));
        }
    }

    let payload = match endpoint {
        Endpoint::Upload => AnalysisResponse::Upload(decode(endpoint, body)?),
        Endpoint::Analyze => AnalysisResponse::Analyze(decode(endpoint, body)?),
        Endpoint::Summarize => AnalysisResponse::Summary(decode_summary(body)?),
        Endpoint::Correlation => AnalysisResponse::Correlation(decode(endpoint, body)?),
        Endpoint::Distribution => AnalysisResponse::Distribution(decode(endpoint, body)?),
        Endpoint::HandleMissing => AnalysisResponse::HandleMissing(decode(endpoint, body)?),
        Endpoint::HandleOutliers => AnalysisResponse::HandleOutliers(decode(endpoint, body)?),
    };
    Ok(payload)
}

fn decode<T: serde::de::DeserializeOwned>(
    endpoint: Endpoint,
    body: Value,
) -> Result<T, WorkflowError> {
    serde_json::from_value(body).map_err(|e| {
        WorkflowError::Transport(format!(
            "{}: unexpected response shape: {e}",
            endpoint.path()
        ))
    })
}

/// The summarize endpoint has two live shapes: the documented
/// `{summary, missing_values}` and a split `{numeric_summary,
/// non_numeric_summary, missing_values}`. Fold the split form into one
/// summary object so downstream rendering sees a single shape.
fn decode_summary(body: Value) -> Result<SummaryReport, WorkflowError> {
    let shape = |detail: &str| {
        WorkflowError::Transport(format!(
            "{}: unexpected response shape: {detail}",
            Endpoint::Summarize.path()
        ))
    };

    let Value::Object(mut map) = body else {
        return Err(shape("expected a JSON object"));
    };
    let missing_values = map
        .remove("missing_values")
        .ok_or_else(|| shape("missing field `missing_values`"))?;

    if let Some(summary) = map.remove("summary") {
        return Ok(SummaryReport {
            summary,
            missing_values,
        });
    }

    let numeric = map.remove("numeric_summary");
    let non_numeric = map.remove("non_numeric_summary");
    if numeric.is_none() && non_numeric.is_none() {
        return Err(shape("missing field `summary`"));
    }
    let mut summary = serde_json::Map::new();
    if let Some(value) = numeric {
        summary.insert("numeric".to_string(), value);
    }
    if let Some(value) = non_numeric {
        summary.insert("non_numeric".to_string(), value);
    }
    Ok(SummaryReport {
        summary: Value::Object(summary),
        missing_values,
    })
}
