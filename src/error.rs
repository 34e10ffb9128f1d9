//! Errors surfaced by the data-access layer.
//!
//! Every failure keeps the backend message verbatim and carries an
//! [`ErrorKind`] so callers branch on the kind instead of matching text.

use crate::consts;
use derive_more::{Display, Error};
use serde::Deserialize;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed query, constraint violation, missing relation.
    #[display("query")]
    Query,
    /// Zero rows where exactly one was expected.
    #[display("not_found")]
    NotFound,
    /// Row-level security rejection or invalid credentials.
    #[display("authorization")]
    Authorization,
    /// Missing or malformed backend configuration.
    #[display("configuration")]
    Configuration,
    /// The backend could not be reached or answered something unreadable.
    #[display("connection")]
    Connection,
}

#[derive(Debug, Display, Error, Clone, PartialEq)]
#[display("[{kind}] {message}")]
pub struct DataError {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

pub type DataResult<T> = Result<T, DataError>;

/// Error body returned by the REST endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl DataError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            details: None,
            hint: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    /// Builds an error from a failed REST response. `body` is the raw
    /// response text, which may or may not be a JSON error object.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<BackendErrorBody>(body).unwrap_or_default();

        let message = parsed
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| match body.trim() {
                "" => format!("backend answered with status {status}"),
                raw => raw.to_string(),
            });

        Self {
            kind: classify(status, parsed.code.as_deref()),
            message,
            code: parsed.code,
            details: parsed.details,
            hint: parsed.hint,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Backend error code, SQLSTATE or `PGRST...`.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// True when the queried table does not exist in the backend schema.
    pub fn is_missing_relation(&self) -> bool {
        matches!(
            self.code(),
            Some(consts::PG_UNDEFINED_TABLE_CODE) | Some(consts::PGRST_SCHEMA_CACHE_MISS_CODE)
        ) || (self.message.contains("relation") && self.message.contains("does not exist"))
    }
}

fn classify(status: u16, code: Option<&str>) -> ErrorKind {
    match code {
        Some(consts::PGRST_SINGLE_OBJECT_CODE) => return ErrorKind::NotFound,
        Some(consts::PG_INSUFFICIENT_PRIVILEGE_CODE) => return ErrorKind::Authorization,
        // PGRST3xx: JWT problems
        Some(code) if code.starts_with("PGRST3") => return ErrorKind::Authorization,
        _ => {}
    }

    match status {
        401 | 403 => ErrorKind::Authorization,
        _ => ErrorKind::Query,
    }
}

impl From<reqwest::Error> for DataError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::connection(format!("unreadable backend response: {error}"));
        }

        Self::connection(error.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(error: serde_json::Error) -> Self {
        Self::connection(format!("unreadable backend payload: {error}"))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DataError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::connection(format!("realtime socket error: {error}"))
    }
}
