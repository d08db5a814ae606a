//! Loading result sets from files and REST endpoints before they reach a pager.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PagerError;

const ERROR_BODY_MAX_BYTES: usize = 2048;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Envelope keys probed, in order, when a response is an object rather than an array.
pub(crate) const ENVELOPE_KEYS: [&str; 4] = ["data", "results", "items", "records"];

static HTTP_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    File(PathBuf),
    Url(String),
}

impl RecordSource {
    pub(crate) fn label(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
        }
    }
}

/// Returns a shared HTTP client with transient-error retry middleware.
///
/// - Retry: 3 attempts with exponential backoff for transient errors
/// - Timeouts: 30s overall, 10s connect
pub(crate) fn shared_client() -> Result<ClientWithMiddleware, PagerError> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let base_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("table-pager/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(PagerError::HttpClientInit)?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    let client = ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    match HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HTTP_CLIENT.get().cloned().ok_or_else(|| PagerError::Api {
            api: "http-client".into(),
            message: "Shared HTTP client initialization race".into(),
        }),
    }
}

/// Loads the records held by `source`.
///
/// The payload is either a JSON array or an object wrapping one under
/// `records_key` (or, when absent, the first of [`ENVELOPE_KEYS`] present).
pub async fn load_records(
    source: &RecordSource,
    records_key: Option<&str>,
) -> Result<Vec<Value>, PagerError> {
    let label = source.label();
    let bytes = match source {
        RecordSource::File(path) => tokio::fs::read(path).await?,
        RecordSource::Url(url) => fetch_body(url).await?,
    };
    let payload: Value = serde_json::from_slice(&bytes).map_err(|source| PagerError::ApiJson {
        api: label.clone(),
        source,
    })?;
    let records = extract_records(payload, records_key, &label)?;
    debug!(source = %label, records = records.len(), "loaded result set");
    Ok(records)
}

async fn fetch_body(url: &str) -> Result<Vec<u8>, PagerError> {
    let resp = shared_client()?
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await?;
    let status = resp.status();
    let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
    let bytes = read_limited_body(resp, url).await?;
    if !status.is_success() {
        let excerpt = body_excerpt(&bytes);
        return Err(PagerError::Api {
            api: url.to_string(),
            message: format!("HTTP {status}: {excerpt}"),
        });
    }
    ensure_json_content_type(url, content_type.as_ref(), &bytes)?;
    Ok(bytes)
}

pub(crate) fn extract_records(
    payload: Value,
    records_key: Option<&str>,
    source: &str,
) -> Result<Vec<Value>, PagerError> {
    let records_key = records_key.map(str::trim).filter(|key| !key.is_empty());
    match (payload, records_key) {
        (Value::Array(records), None) => Ok(records),
        (Value::Object(mut map), Some(key)) => match map.remove(key) {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err(PagerError::Api {
                api: source.to_string(),
                message: format!("Field '{key}' is not an array of records"),
            }),
            None => Err(PagerError::Api {
                api: source.to_string(),
                message: format!("Response has no '{key}' field"),
            }),
        },
        (Value::Object(mut map), None) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(records)) => Some(records),
                _ => None,
            })
            .ok_or_else(|| PagerError::Api {
                api: source.to_string(),
                message: format!(
                    "Expected a JSON array or an object with one of: {}",
                    ENVELOPE_KEYS.join(", ")
                ),
            }),
        (_, Some(key)) => Err(PagerError::Api {
            api: source.to_string(),
            message: format!("Expected an object with a '{key}' field"),
        }),
        (_, None) => Err(PagerError::Api {
            api: source.to_string(),
            message: "Expected a JSON array of records".into(),
        }),
    }
}

/// One-line excerpt of an error body, cut at [`ERROR_BODY_MAX_BYTES`].
pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let cut = text.len() > ERROR_BODY_MAX_BYTES;
    let mut end = text.len().min(ERROR_BODY_MAX_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut excerpt = text[..end].trim().replace(['\n', '\r', '\t'], " ");
    if cut {
        excerpt.push_str(" …");
    }
    excerpt
}

/// Rejects HTML pages (login walls, error pages) served where a result set
/// was expected. Other non-JSON media types only warn.
pub(crate) fn ensure_json_content_type(
    source: &str,
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), PagerError> {
    let Some(raw) = content_type.and_then(|value| match value.to_str() {
        Ok(raw) => Some(raw.trim()),
        Err(_) => {
            warn!(source, "content-type of result set is not valid UTF-8; parsing as JSON");
            None
        }
    }) else {
        return Ok(());
    };

    let media_type = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match media_type.as_str() {
        "" | "application/json" | "text/json" => Ok(()),
        "text/html" | "application/xhtml+xml" => Err(PagerError::Api {
            api: source.to_string(),
            message: format!(
                "Expected JSON records but received an HTML page ({raw}): {}",
                body_excerpt(body)
            ),
        }),
        other if other.ends_with("+json") => Ok(()),
        _ => {
            warn!(source, content_type = raw, "result set is not labeled as JSON; parsing anyway");
            Ok(())
        }
    }
}

pub(crate) async fn read_limited_body(
    mut resp: reqwest::Response,
    source: &str,
) -> Result<Vec<u8>, PagerError> {
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if body.len().saturating_add(chunk.len()) > DEFAULT_MAX_BODY_BYTES {
            return Err(PagerError::Api {
                api: source.to_string(),
                message: format!("Result set is larger than {DEFAULT_MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
