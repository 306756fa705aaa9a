//! The retrying transport shared by every outbound HTTP caller (§4.4, §5 "Resource policies":
//! "a single HTTP client per external service with pooled connections and a retrying
//! transport").
//!
//! Retry policy, normative per §6:
//! - up to [`RETRY_TOTAL`] retries on HTTP 404, exponential backoff with base
//!   [`BACKOFF_FACTOR_SECS`];
//! - on a connection error, retry up to [`CONNECTION_RETRY_MAX`] times with a fixed
//!   [`CONNECTION_RETRY_WAIT_SECS`] wait;
//! - on exhaustion ("RetryError"), the call returns [`error_utils::HttpError::RetryExhausted`]
//!   and the caller logs `"⚠️ Cannot contact …"` and skips that host for this call, it does not
//!   abort the probe.

use std::time::Duration;

use error_utils::HttpError;
use serde::de::DeserializeOwned;
use tracing::warn;

pub const RETRY_TOTAL: u32 = 3;
pub const BACKOFF_FACTOR_SECS: f64 = 0.5;
pub const CONNECTION_RETRY_MAX: u32 = 5;
pub const CONNECTION_RETRY_WAIT_SECS: f64 = 0.5;

/// GETs `url` as JSON, applying the retry policy above. `host` labels the error/log messages.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    host: &str,
) -> Result<T, HttpError> {
    let response = get_with_retry(client, url, host).await?;
    response
        .json::<T>()
        .await
        .map_err(|source| HttpError::Decode {
            host: host.to_owned(),
            source,
        })
}

/// GETs `url`, returning the raw response body as bytes (used by clients that parse a
/// non-uniform payload shape, e.g. the liveness endpoint's per-[`crate`]`BeaconType` body).
pub async fn get_bytes(
    client: &reqwest::Client,
    url: &str,
    host: &str,
) -> Result<Vec<u8>, HttpError> {
    let response = get_with_retry(client, url, host).await?;
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|source| HttpError::Decode {
            host: host.to_owned(),
            source,
        })
}

pub async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    host: &str,
    body: &B,
) -> Result<T, HttpError> {
    let mut connection_attempt = 0u32;
    loop {
        match client.post(url).json(body).send().await {
            Ok(response) => {
                let response = check_status(response, host, 0).await?;
                return response.json::<T>().await.map_err(|source| HttpError::Decode {
                    host: host.to_owned(),
                    source,
                });
            }
            Err(source) if source.is_connect() => {
                connection_attempt += 1;
                if connection_attempt > CONNECTION_RETRY_MAX {
                    warn!(host, "⚠️ Cannot contact {host}");
                    return Err(HttpError::RetryExhausted {
                        host: host.to_owned(),
                    });
                }
                tokio::time::sleep(Duration::from_secs_f64(CONNECTION_RETRY_WAIT_SECS)).await;
            }
            Err(source) => {
                return Err(HttpError::Connection {
                    host: host.to_owned(),
                    source,
                })
            }
        }
    }
}

async fn get_with_retry(
    client: &reqwest::Client,
    url: &str,
    host: &str,
) -> Result<reqwest::Response, HttpError> {
    let mut connection_attempt = 0u32;
    let mut not_found_attempt = 0u32;
    loop {
        match client.get(url).send().await {
            Ok(response) => match check_status(response, host, not_found_attempt).await {
                Ok(response) => return Ok(response),
                Err(HttpError::NotFound { .. }) if not_found_attempt < RETRY_TOTAL => {
                    let backoff = BACKOFF_FACTOR_SECS * 2f64.powi(not_found_attempt as i32);
                    not_found_attempt += 1;
                    tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
                }
                Err(HttpError::NotFound { host }) => {
                    warn!(host, "⚠️ Cannot contact {host}");
                    return Err(HttpError::RetryExhausted { host });
                }
                Err(other) => return Err(other),
            },
            Err(source) if source.is_connect() => {
                connection_attempt += 1;
                if connection_attempt > CONNECTION_RETRY_MAX {
                    warn!(host, "⚠️ Cannot contact {host}");
                    return Err(HttpError::RetryExhausted {
                        host: host.to_owned(),
                    });
                }
                tokio::time::sleep(Duration::from_secs_f64(CONNECTION_RETRY_WAIT_SECS)).await;
            }
            Err(source) => {
                return Err(HttpError::Connection {
                    host: host.to_owned(),
                    source,
                })
            }
        }
    }
}

/// Maps a response's status to `Ok` (2xx), `NotFound` (404, handled by the retry loop above) or
/// `RemoteServerError` (other non-2xx, which bubbles to the caller per §4.4/§7).
async fn check_status(
    response: reqwest::Response,
    host: &str,
    _not_found_attempt: u32,
) -> Result<reqwest::Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status.as_u16() == 404 {
        Err(HttpError::NotFound {
            host: host.to_owned(),
        })
    } else {
        Err(HttpError::RemoteServerError {
            host: host.to_owned(),
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_json_against_unreachable_host_retries_then_fails() {
        let client = reqwest::Client::new();
        let result: Result<serde_json::Value, HttpError> =
            get_json(&client, "http://127.0.0.1:1/nope", "test-host").await;
        assert!(matches!(result, Err(HttpError::RetryExhausted { .. })));
    }
}
