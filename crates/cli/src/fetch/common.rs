//! Shared infrastructure for the acquisition collaborators.
//!
//! Each collaborator (feed, archive, github) reuses:
//! - `FetchClient`: HTTP client with retry, backoff, and status mapping
//! - `FetchError`: what a collaborator reports when it gives up
//!
//! A `FetchError` never aborts a run. The pipeline logs it and degrades the
//! affected cloud to an empty list.

use std::thread;
use std::time::Duration;

use thiserror::Error;

// ── Constants ───────────────────────────────────────────────────────

pub(crate) const MAX_RETRIES: u32 = 3;
pub(crate) const USER_AGENT: &str = concat!("lagtrack/", env!("CARGO_PKG_VERSION"));
const TIMEOUT_SECS: u64 = 30;
/// Longest `Retry-After` honored unless the backoff itself is longer.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{source_name} error (HTTP {status}): {message}")]
    Status {
        source_name: String,
        status: u16,
        message: String,
    },
    #[error("{source_name} rate limited after {attempts} attempts")]
    RateLimited { source_name: String, attempts: u32 },
    #[error("{source_name} upstream error after {attempts} attempts: {message}")]
    Upstream {
        source_name: String,
        attempts: u32,
        message: String,
    },
    #[error("failed to read {source_name} response body: {message}")]
    Body { source_name: String, message: String },
    #[error("failed to parse {source_name} response: {message}")]
    Parse { source_name: String, message: String },
    #[error("{source_name} returned no usable items")]
    NoItems { source_name: String },
    #[error("cannot build HTTP client: {0}")]
    Client(String),
}

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that handles retry, backoff, and error classification.
///
/// Collaborators own their URLs and headers. They pass a request-building
/// closure to [`FetchClient::request_with_retry_text`] which handles the
/// retry loop and maps HTTP status codes onto [`FetchError`].
pub(crate) struct FetchClient {
    pub(crate) http: reqwest::blocking::Client,
    source_name: String,
    base_backoff: Duration,
}

impl FetchClient {
    pub(crate) fn new(source_name: &str) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
            base_backoff: Duration::from_secs(1),
        })
    }

    /// Override the first retry delay (doubles on every retry).
    pub(crate) fn with_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    pub(crate) fn source_name(&self) -> &str {
        &self.source_name
    }

    /// GET with retry, parsing the body as JSON.
    pub(crate) fn request_with_retry(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, FetchError> {
        let text = self.request_with_retry_text(build_request)?;
        // Some providers prefix JSON with a BOM
        let trimmed = text.trim_start_matches('\u{feff}');
        serde_json::from_str(trimmed).map_err(|e| FetchError::Parse {
            source_name: self.source_name.clone(),
            message: format!("{} (body: {})", e, truncate(trimmed, 200)),
        })
    }

    /// GET with retry + exponential backoff, returning the raw body.
    ///
    /// `build_request` is called once per attempt. 401/403/4xx fail
    /// immediately; 429, 5xx and transport errors are retried.
    pub(crate) fn request_with_retry_text(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<String, FetchError> {
        let mut backoff = self.base_backoff;

        for attempt in 0..=MAX_RETRIES {
            let result = build_request(&self.http).send();

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status >= 400 && status < 500 && status != 429 {
                        let body = resp.text().unwrap_or_default();
                        return Err(FetchError::Status {
                            source_name: self.source_name.clone(),
                            status,
                            message: extract_error_message(&body),
                        });
                    }

                    if status == 429 || status >= 500 {
                        if attempt == MAX_RETRIES {
                            return Err(if status == 429 {
                                FetchError::RateLimited {
                                    source_name: self.source_name.clone(),
                                    attempts: MAX_RETRIES,
                                }
                            } else {
                                FetchError::Upstream {
                                    source_name: self.source_name.clone(),
                                    attempts: MAX_RETRIES,
                                    message: format!("HTTP {status}"),
                                }
                            });
                        }

                        // Respect Retry-After header for 429
                        let wait = if status == 429 {
                            let header = resp.headers().get("retry-after").and_then(|v| v.to_str().ok());
                            retry_after_wait(header, backoff)
                        } else {
                            backoff
                        };

                        tracing::warn!(
                            source = %self.source_name,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            wait_ms = wait.as_millis() as u64,
                            status,
                            "retrying"
                        );
                        thread::sleep(wait);
                        backoff *= 2;
                        continue;
                    }

                    return resp.text().map_err(|e| FetchError::Body {
                        source_name: self.source_name.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    // Network/timeout errors: retry
                    if attempt == MAX_RETRIES {
                        return Err(FetchError::Upstream {
                            source_name: self.source_name.clone(),
                            attempts: MAX_RETRIES,
                            message: e.to_string(),
                        });
                    }

                    tracing::warn!(
                        source = %self.source_name,
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        wait_ms = backoff.as_millis() as u64,
                        error = %e,
                        "retrying"
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }

        unreachable!()
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Delay before retrying a 429. A numeric `Retry-After` is honored up to
/// `max(backoff, 60s)`; anything else falls back to the backoff.
fn retry_after_wait(header: Option<&str>, backoff: Duration) -> Duration {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .map(|asked| asked.min(backoff.max(MAX_RETRY_AFTER)))
        .unwrap_or(backoff)
}

/// Pull a readable message out of an error body (GitHub uses `message`).
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| truncate(body.trim(), 200).to_string())
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client() -> FetchClient {
        FetchClient::new("Test").unwrap().with_backoff(Duration::from_millis(1))
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_retry_after_is_capped() {
        let backoff = Duration::from_millis(500);
        assert_eq!(retry_after_wait(Some("5"), backoff), Duration::from_secs(5));
        assert_eq!(retry_after_wait(Some("86400"), backoff), Duration::from_secs(60));
        assert_eq!(retry_after_wait(Some("86400"), Duration::from_secs(120)), Duration::from_secs(120));
        assert_eq!(retry_after_wait(Some("Wed, 21 Oct 2015 07:28:00 GMT"), backoff), backoff);
        assert_eq!(retry_after_wait(None, backoff), backoff);
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(extract_error_message(r#"{"message":"Not Found"}"#), "Not Found");
        assert_eq!(extract_error_message("  plain text "), "plain text");
    }

    #[test]
    fn test_not_found_fails_fast() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).json_body(serde_json::json!({"message": "Not Found"}));
        });

        let url = server.url("/missing");
        let err = client().request_with_retry_text(|http| http.get(&url)).unwrap_err();
        mock.assert_hits(1);
        match err {
            FetchError::Status { status, message, .. } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_server_error_retries_then_gives_up() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let url = server.url("/flaky");
        let err = client().request_with_retry_text(|http| http.get(&url)).unwrap_err();
        mock.assert_hits((MAX_RETRIES + 1) as usize);
        assert!(matches!(err, FetchError::Upstream { .. }));
    }

    #[test]
    fn test_json_body_parsed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).body("\u{feff}{\"ok\":true}");
        });

        let url = server.url("/ok");
        let body = client().request_with_retry(|http| http.get(&url)).unwrap();
        assert_eq!(body["ok"], true);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html>nope</html>");
        });

        let url = server.url("/html");
        let err = client().request_with_retry(|http| http.get(&url)).unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }
}
