//! Error types for fetching and reading creature records.
//!
//! Every failure the transport or the record accessors can produce is a variant
//! of [`ApiError`], so the presentation layers can match on it and render a
//! fallback instead of bubbling a panic up into the UI.
use thiserror::Error;

use crate::models::StatName;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Upstream answered with something other than 200, or could not be reached.
    #[error("{}", remote_message(.url, .status))]
    RemoteRequest {
        url: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("response body from {url} is not valid JSON")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("record is missing field `{0}`")]
    MissingField(&'static str),

    #[error("record field `{field}` should be {expected}")]
    MalformedField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("stats list is malformed: {0}")]
    MalformedStats(String),

    #[error("stat `{0}` not present in record")]
    StatNotFound(StatName),
}

impl ApiError {
    /// HTTP status reported by upstream, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RemoteRequest { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

fn remote_message(url: &str, status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("response error code {} from {}", code, url),
        None => format!("request to {} failed", url),
    }
}
