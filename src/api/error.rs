//! Vendor API error types.
//!
//! Errors are categorized the same way lookups report them to handlers:
//!
//! - **Transient** errors may succeed later (429, 5xx, timeouts, connection failures)
//! - **NotFound** means the referenced object does not exist (404)
//! - **Permanent** errors won't fix themselves (other 4xx, unexpected response shapes)

use std::fmt;

use thiserror::Error;

use crate::effects::LookupError;

/// The kind of API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Transient,
    NotFound,
    Permanent,
}

impl ApiErrorKind {
    /// Categorizes an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => ApiErrorKind::NotFound,
            429 => ApiErrorKind::Transient,
            code if (500..600).contains(&code) => ApiErrorKind::Transient,
            _ => ApiErrorKind::Permanent,
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, ApiErrorKind::Transient)
    }
}

/// A vendor API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct ApiError {
    pub kind: ApiErrorKind,

    /// The HTTP status code, if a response was received.
    pub status_code: Option<u16>,

    pub message: String,

    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "API error (HTTP {}): {}", code, self.message),
            None => write!(f, "API error: {}", self.message),
        }
    }
}

impl ApiError {
    /// Creates an error from a non-success response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        ApiError {
            kind: ApiErrorKind::from_status(status),
            status_code: Some(status),
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes a transport or decoding error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let kind = match status_code {
            Some(code) => ApiErrorKind::from_status(code),
            None if err.is_timeout() || err.is_connect() || err.is_request() => {
                ApiErrorKind::Transient
            }
            None => ApiErrorKind::Permanent,
        };
        ApiError {
            kind,
            status_code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        ApiError {
            kind: ApiErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Converts into the error handlers see, naming the object that was looked up.
    pub fn into_lookup_error(self, object: &'static str, id: &str) -> LookupError {
        match self.kind {
            ApiErrorKind::NotFound => LookupError::NotFound {
                kind: object,
                id: id.to_string(),
            },
            ApiErrorKind::Transient => LookupError::Transient(self.to_string()),
            ApiErrorKind::Permanent => LookupError::Permanent(self.to_string()),
        }
    }
}

/// Pulls `error.message` out of a vendor error body, falling back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
