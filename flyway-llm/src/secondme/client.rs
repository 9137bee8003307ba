//! SecondMe HTTP client with rate limiting

use super::types::Envelope;
use crate::{invalid_response, rate_limited, request_failed};
use flyway_core::FlywayResult;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

pub(crate) const PROVIDER: &str = "secondme";

/// Low-level SecondMe client. One instance is shared by every request.
pub struct SecondMeHttp {
    client: Client,
    base_url: String,
    rate_limiter: Arc<Semaphore>,
    last_request: Arc<AtomicU64>,
    min_request_interval_ms: u64,
    start_time: Instant,
}

impl SecondMeHttp {
    pub fn new(base_url: impl Into<String>, requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let min_interval_ms = (60_000 / rpm as u64).max(10);

        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(Semaphore::new(rpm as usize)),
            last_request: Arc::new(AtomicU64::new(0)),
            min_request_interval_ms: min_interval_ms,
            start_time: Instant::now(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    /// Send a request, waiting for a rate-limit permit first.
    pub async fn send(&self, request: RequestBuilder) -> FlywayResult<Response> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("Rate limiter error: {}", e)))?;

        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let last_ms = self.last_request.load(Ordering::Relaxed);
        let elapsed = now_ms.saturating_sub(last_ms);
        if last_ms != 0 && elapsed < self.min_request_interval_ms {
            let wait_ms = self.min_request_interval_ms - elapsed;
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }
        self.last_request.store(now_ms.max(1), Ordering::Relaxed);

        let response = request
            .send()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => rate_limited(PROVIDER, retry_after_ms),
            _ => request_failed(PROVIDER, status.as_u16() as i32, error_text),
        })
    }

    /// Send a request and unwrap the `{code, data}` envelope.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> FlywayResult<T> {
        let response = self.send(request).await?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| invalid_response(PROVIDER, format!("Failed to parse response: {}", e)))?;
        unwrap_envelope(envelope)
    }
}

pub(crate) fn unwrap_envelope<T>(envelope: Envelope<T>) -> FlywayResult<T> {
    if envelope.code != 0 {
        return Err(request_failed(
            PROVIDER,
            envelope.code as i32,
            envelope
                .message
                .unwrap_or_else(|| "non-zero response code".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| invalid_response(PROVIDER, "response envelope has no data"))
}

fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0) as i64)
}

impl std::fmt::Debug for SecondMeHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondMeHttp")
            .field("base_url", &self.base_url)
            .field("min_request_interval_ms", &self.min_request_interval_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyway_core::{FlywayError, GenerationError};

    #[test]
    fn test_url_joins_without_double_slash() {
        let http = SecondMeHttp::new("https://example.test/gate/lab/", 60);
        assert_eq!(
            http.url("/api/secondme/user/shades"),
            "https://example.test/gate/lab/api/secondme/user/shades"
        );
    }

    #[test]
    fn test_unwrap_envelope_non_zero_code() {
        let envelope: Envelope<Vec<String>> = Envelope {
            code: 40101,
            message: Some("token expired".to_string()),
            data: None,
        };
        let err = unwrap_envelope(envelope);
        assert!(matches!(
            err,
            Err(FlywayError::Generation(GenerationError::RequestFailed { status: 40101, .. }))
        ));
    }

    #[test]
    fn test_unwrap_envelope_missing_data() {
        let envelope: Envelope<Vec<String>> = Envelope {
            code: 0,
            message: None,
            data: None,
        };
        assert!(matches!(
            unwrap_envelope(envelope),
            Err(FlywayError::Generation(GenerationError::InvalidResponse { .. }))
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "1.5".parse().unwrap());
        assert_eq!(parse_retry_after_ms(&headers), Some(1500));
    }
}
