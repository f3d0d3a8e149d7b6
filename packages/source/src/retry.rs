//! HTTP retry helpers for transient errors.
//!
//! Every page request goes through [`send_json`] so that timeouts,
//! connection resets, rate limiting and server errors are retried with
//! exponential backoff instead of failing the whole fetch.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retries for connection failures, timeouts, 429 and
/// 5xx responses. Backoff is 2s, 4s, 8s, 16s, 32s.
const MAX_RETRIES: u32 = 5;

/// Maximum number of full re-fetches when a response body arrives but is
/// not valid JSON (truncated or garbled).
const MAX_BODY_RETRIES: u32 = 3;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends a request and parses the response body as JSON.
///
/// `build_request` is called once per attempt because a
/// [`reqwest::RequestBuilder`] is consumed by `send()`.
///
/// HTTP 4xx other than 429 is permanent and returned immediately.
///
/// # Errors
///
/// Returns [`SourceError`] if the request still fails after all retries,
/// the server returns a non-retryable status, or the body is never valid
/// JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;

    loop {
        let response = send_with_retries(&build_request).await?;
        let url = response.url().to_string();
        let status = response.status();

        let decoded: Result<serde_json::Value, String> = match response.text().await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                format!(
                    "JSON parse failed: {e} ({} bytes, preview: {})",
                    text.len(),
                    preview(&text)
                )
            }),
            Err(e) => Err(format!("body read failed: {e}")),
        };

        match decoded {
            Ok(value) => return Ok(value),
            Err(reason) if body_attempt < MAX_BODY_RETRIES => {
                body_attempt += 1;
                let delay = backoff_delay(body_attempt);
                log::warn!(
                    "{reason} (body retry {body_attempt}/{MAX_BODY_RETRIES} in {delay:?})\n  \
                     url: {url}\n  status: {status}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(reason) => {
                log::error!("{reason}, giving up\n  url: {url}\n  status: {status}");
                return Err(SourceError::Normalization { message: reason });
            }
        }
    }
}

/// Sends the request, retrying transient failures up to [`MAX_RETRIES`]
/// times. Returns the first response with a 2xx or 3xx status.
#[allow(clippy::future_not_send)]
async fn send_with_retries<F>(build_request: &F) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        let failure = match build_request().send().await {
            Ok(response) => {
                let status = response.status();
                if !is_retryable_status(status) {
                    if status.is_client_error() {
                        return Err(SourceError::Normalization {
                            message: format!("HTTP {status}"),
                        });
                    }
                    return Ok(response);
                }
                SourceError::Normalization {
                    message: format!("HTTP {status}"),
                }
            }
            Err(e) if is_transient(&e) => SourceError::Http(e),
            Err(e) => return Err(SourceError::Http(e)),
        };

        if attempt >= MAX_RETRIES {
            log::error!("  giving up after {MAX_RETRIES} retries: {failure}");
            return Err(failure);
        }

        attempt += 1;
        let delay = backoff_delay(attempt);
        log::warn!("  {failure}; retry {attempt}/{MAX_RETRIES} in {delay:?}...");
        tokio::time::sleep(delay).await;
    }
}

/// Delay before retry number `attempt` (1-based): 2s, 4s, 8s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(10))
}

/// Returns `true` for statuses worth retrying: 429 and every 5xx.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
