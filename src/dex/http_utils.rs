//! Venue-agnostic remote query client: timeout, bounded concurrency and linear retry
//! backoff around GraphQL POSTs and plain JSON GETs.

use crate::config::Config;
use crate::error::{ArbError, Result, RetryPolicy};
use crate::utils::truncate_for_log;
use log::debug;
use reqwest::RequestBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const LOG_TRUNCATE_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub message: String,
}

/// Uniform `{data, errors}` envelope. An HTTP 200 may still carry `errors`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<RemoteError>,
}

/// Some servers send `"errors": null` on success.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<RemoteError>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<RemoteError>>::deserialize(deserializer)?.unwrap_or_default())
}

impl QueryResponse {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Unwraps `data`, treating any reported error as a failed query.
    pub fn into_data(self) -> Result<Value> {
        if self.has_errors() {
            return Err(ArbError::RemoteErrors(
                self.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        self.data
            .ok_or_else(|| ArbError::ParseError("Response carried neither data nor errors".into()))
    }
}

pub struct QueryClient {
    http: reqwest::Client,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
}

impl QueryClient {
    pub fn new(timeout: Duration, retry: RetryPolicy, max_concurrent: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArbError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            retry,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.query_timeout_secs),
            RetryPolicy::new(
                config.query_max_retries,
                Duration::from_millis(config.query_retry_delay_ms),
            ),
            config.max_concurrent_requests,
        )
    }

    /// POSTs a GraphQL `query` (with optional `variables`) to `endpoint`.
    ///
    /// Transport failures and timeouts are retried with the identical payload.
    /// A non-2xx answer is returned as [`ArbError::HttpStatus`] without retrying.
    /// Callers must inspect `errors` on the returned envelope.
    pub async fn execute(
        &self,
        endpoint: &str,
        query: &str,
        variables: Option<&Value>,
    ) -> Result<QueryResponse> {
        let payload = json!({
            "query": query,
            "variables": variables.cloned().unwrap_or_else(|| json!({})),
        });
        debug!(
            "GraphQL request to {}: {}",
            endpoint,
            truncate_for_log(query, LOG_TRUNCATE_CHARS)
        );

        let client = self;
        let payload = &payload;
        let body = self
            .retry
            .execute(endpoint, move || client.send_once(client.http.post(endpoint).json(payload)))
            .await?;
        debug!("GraphQL response from {}: {}", endpoint, summarize_shape(&body));

        if !body.is_object() {
            return Err(ArbError::ParseError(format!(
                "GraphQL response from {} is not an object",
                endpoint
            )));
        }
        Ok(serde_json::from_value(body)?)
    }

    /// GETs a JSON document from `url` under the same timeout and retry policy,
    /// returned as the `data` of an error-free envelope.
    pub async fn get_json(&self, url: &str) -> Result<QueryResponse> {
        debug!("GET {}", url);
        let client = self;
        let body = self
            .retry
            .execute(url, move || client.send_once(client.http.get(url)))
            .await?;
        debug!("Response from {}: {}", url, summarize_shape(&body));
        Ok(QueryResponse {
            data: Some(body),
            errors: Vec::new(),
        })
    }

    async fn send_once(&self, request: RequestBuilder) -> Result<Value> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ArbError::NetworkError(format!("Request limiter closed: {}", e)))?;

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArbError::HttpStatus {
                status: status.as_u16(),
                body: truncate_for_log(&body, LOG_TRUNCATE_CHARS),
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

/// Compact shape description of a JSON body for debug logs, e.g.
/// `{data: {pools: [12]}, errors: [0]}`. Never includes values.
pub fn summarize_shape(value: &Value) -> String {
    summarize_at_depth(value, 0)
}

fn summarize_at_depth(value: &Value, depth: usize) -> String {
    match value {
        Value::Array(items) => format!("[{}]", items.len()),
        Value::Object(map) if depth < 2 => {
            let fields: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, summarize_at_depth(v, depth + 1)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
        Value::Object(map) => format!("{{{} keys}}", map.len()),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summarize_shape_counts_without_values() {
        let body = json!({
            "data": { "meta": {"block": {"number": 1}}, "pools": [{"id": "a"}, {"id": "b"}] },
            "errors": []
        });
        assert_eq!(
            summarize_shape(&body),
            "{data: {meta: {1 keys}, pools: [2]}, errors: [0]}"
        );
        assert_eq!(summarize_shape(&json!([1, 2, 3])), "[3]");
        assert_eq!(summarize_shape(&json!("secret")), "string");
    }

    #[test]
    fn test_null_errors_mean_success() {
        let response: QueryResponse =
            serde_json::from_value(json!({ "data": { "pools": [] }, "errors": null })).unwrap();
        assert!(!response.has_errors());
        assert_eq!(response.into_data().unwrap(), json!({ "pools": [] }));

        let bare: QueryResponse = serde_json::from_value(json!({ "data": { "pairs": [] } })).unwrap();
        assert!(bare.errors.is_empty());
    }

    #[test]
    fn test_into_data_surfaces_partial_errors() {
        let response: QueryResponse = serde_json::from_value(json!({
            "data": { "pools": [] },
            "errors": [{ "message": "Type `Pool` has no field `foo`", "locations": [] }]
        }))
        .unwrap();
        match response.into_data() {
            Err(ArbError::RemoteErrors(messages)) => {
                assert_eq!(messages, vec!["Type `Pool` has no field `foo`".to_string()])
            }
            other => panic!("expected remote errors, got {:?}", other),
        }
    }

    #[test]
    fn test_into_data_without_errors() {
        let response: QueryResponse =
            serde_json::from_value(json!({ "data": { "pairs": [] } })).unwrap();
        assert_eq!(response.into_data().unwrap(), json!({ "pairs": [] }));
    }
}
