//! Rate-Limited HTTP Transport
//!
//! Thin wrapper around the HTTP client that applies basic auth on every
//! call and translates transport failures into typed errors:
//!
//! - unreachable server / failed transfer → [`ClientError::Connection`]
//! - non-JSON body where JSON is expected → [`ClientError::Decode`]
//!
//! The sliding-window [`RateLimiter`] lives here too. Only the metadata
//! fetch (the highest-volume, most frequently polled call) is throttled;
//! everything else goes out unthrottled.

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;
use reqwest::header::HeaderMap;
use reqwest::multipart::Form;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::connection::Credential;
use super::error::{ClientError, Result};

/// Maximum metadata fetches admitted per rolling window.
pub const RATE_LIMIT_CALLS: usize = 300;

/// Width of the rolling rate-limit window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter.
///
/// Admits at most `limit` calls per rolling `window`. Calls beyond the
/// limit suspend the caller until the window rolls over; they never fail
/// and never busy-spin. The window state is the only shared mutable
/// resource and is synchronized, so one limiter may be shared across
/// concurrent callers within a process.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `limit` calls per `window`.
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Waits until the rolling window admits one more call.
    ///
    /// Suspends (does not fail) when the window is full.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut calls = self.calls.lock().await;
                let now = Instant::now();

                while let Some(&oldest) = calls.front() {
                    if now.saturating_duration_since(oldest) >= self.window {
                        calls.pop_front();
                    } else {
                        break;
                    }
                }

                if calls.len() < self.limit {
                    calls.push_back(now);
                    return;
                }

                // Window is full; wait until the oldest call ages out.
                match calls.front() {
                    Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            debug!("rate limit reached, suspending for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

/// A response where the caller must inspect the status itself
/// (submission and label PATCH results).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl ApiResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// The `message` field of a JSON error body, or the raw body.
    pub fn message(&self) -> String {
        self.json()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| self.body.clone())
    }
}

/// HTTP transport shared by all client operations.
pub struct Transport {
    http: reqwest::Client,
    credential: Option<Credential>,
}

impl Transport {
    /// Creates a transport, attaching `credential` to every request when set.
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credential,
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credential {
            Some(cred) => builder.basic_auth(&cred.username, Some(&cred.secret)),
            None => builder,
        }
    }

    async fn read_json(url: &str, response: reqwest::Response) -> Result<Value> {
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::connection(url, e))?;
        serde_json::from_str(&body).map_err(|e| ClientError::decode(url, e))
    }

    async fn read_raw(url: &str, response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::connection(url, e))?;
        Ok(ApiResponse { status, body })
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        self.get_json_with(url, HeaderMap::new()).await
    }

    /// GET `url` with extra headers and decode the body as JSON.
    pub async fn get_json_with(&self, url: &str, headers: HeaderMap) -> Result<Value> {
        debug!("GET {}", url);
        let response = self
            .authed(self.http.get(url))
            .headers(headers)
            .send()
            .await
            .map_err(|e| ClientError::connection(url, e))?;
        Self::read_json(url, response).await
    }

    /// POST to `url` with an empty body and decode the response as JSON.
    pub async fn post_json(&self, url: &str) -> Result<Value> {
        debug!("POST {}", url);
        let response = self
            .authed(self.http.post(url))
            .send()
            .await
            .map_err(|e| ClientError::connection(url, e))?;
        Self::read_json(url, response).await
    }

    /// POST a multipart form to `url`, returning status and raw body.
    pub async fn post_multipart(&self, url: &str, form: Form) -> Result<ApiResponse> {
        debug!("POST (multipart) {}", url);
        let response = self
            .authed(self.http.post(url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::connection(url, e))?;
        Self::read_raw(url, response).await
    }

    /// PATCH a JSON payload to `url`, returning status and raw body.
    pub async fn patch_json(&self, url: &str, payload: &Value) -> Result<ApiResponse> {
        debug!("PATCH {}", url);
        let response = self
            .authed(self.http.patch(url))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ClientError::connection(url, e))?;
        Self::read_raw(url, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_limiter_admits_up_to_limit_immediately() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let before = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_delays_call_beyond_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let before = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        // The 4th call must wait for the window to roll over, never fail.
        assert!(Instant::now().duration_since(before) >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_window_rolls_forward() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        limiter.acquire().await;
        limiter.acquire().await;

        tokio::time::advance(Duration::from_secs(11)).await;

        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_shared_across_tasks() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(30)));
        let before = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.expect("task panicked");
        }

        // 4 acquisitions through a 2-per-30s limiter need at least one rollover.
        assert!(Instant::now().duration_since(before) >= Duration::from_secs(30));
    }

    #[test]
    fn test_api_response_success() {
        let resp = ApiResponse {
            status: 201,
            body: "{}".to_string(),
        };
        assert!(resp.is_success());

        let resp = ApiResponse {
            status: 400,
            body: "{}".to_string(),
        };
        assert!(!resp.is_success());
    }

    #[test]
    fn test_api_response_message_from_json() {
        let resp = ApiResponse {
            status: 400,
            body: r#"{"message": "duplicate label"}"#.to_string(),
        };
        assert_eq!(resp.message(), "duplicate label");
    }

    #[test]
    fn test_api_response_message_falls_back_to_body() {
        let resp = ApiResponse {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(resp.message(), "Bad Gateway");
    }

    #[test]
    fn test_api_response_json_none_for_non_json() {
        let resp = ApiResponse {
            status: 200,
            body: "<html></html>".to_string(),
        };
        assert!(resp.json().is_none());
    }
}
