//! Error types for the mind-map API client.
//!
//! # Design
//! Three families of failure reach the caller:
//! - `Configuration`: the client could not be constructed (missing token,
//!   unparsable base URL). Nothing was sent.
//! - `Validation`: input rejected client-side before any request. Carries
//!   every violated field, not just the first one found.
//! - request errors (`Http`, `Transport`, `Deserialization`,
//!   `Serialization`): the round-trip itself failed. `Context` wraps one of
//!   these with the name of the operation that was running.
//!
//! Nothing is retried; every failure is handed back as-is.

use std::fmt;

use crate::http::HttpMethod;

pub type ApiResult<T> = Result<T, ApiError>;

/// A single field that failed client-side validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by `Api`, `Diagram` and `Node` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The client was constructed with unusable options.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// One or more inputs were rejected before a request was sent.
    #[error("invalid input: {}", join_violations(.0))]
    Validation(Vec<Violation>),

    /// The server answered with a non-2xx status.
    #[error("{method} {endpoint} failed with HTTP {status}: {description}")]
    Http {
        method: HttpMethod,
        endpoint: String,
        status: u16,
        description: String,
    },

    /// No response was received. `message` is the transport's own text.
    #[error("{method} {endpoint} failed: {message}")]
    Transport {
        method: HttpMethod,
        endpoint: String,
        message: String,
    },

    /// A success response body did not match the expected resource shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A request error annotated with the operation that issued it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<ApiError>,
    },
}

impl ApiError {
    pub(crate) fn context(self, context: impl Into<String>) -> Self {
        ApiError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with any `Context` layers removed.
    pub fn root(&self) -> &ApiError {
        match self {
            ApiError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// HTTP status of the failed response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures of the HTTP round-trip itself, as opposed to
    /// configuration or validation problems caught before sending.
    pub fn is_request_error(&self) -> bool {
        !matches!(
            self.root(),
            ApiError::Configuration(_) | ApiError::Validation(_)
        )
    }

    pub fn violations(&self) -> Option<&[Violation]> {
        match self.root() {
            ApiError::Validation(violations) => Some(violations),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = ApiError::Validation(vec![
            Violation::new("offset.x", "must be a finite number"),
            Violation::new("text", "must be at most 3000 characters"),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid input: offset.x: must be a finite number; text: must be at most 3000 characters"
        );
    }

    #[test]
    fn context_keeps_status_and_classification() {
        let err = ApiError::Http {
            method: HttpMethod::Post,
            endpoint: "/api/1/diagrams".to_string(),
            status: 401,
            description: "invalid access token".to_string(),
        }
        .context("failed to create diagram");

        assert_eq!(err.status(), Some(401));
        assert!(err.is_request_error());
        assert_eq!(
            err.to_string(),
            "failed to create diagram: POST /api/1/diagrams failed with HTTP 401: invalid access token"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn configuration_is_not_a_request_error() {
        let err = ApiError::Configuration("missing token".to_string());
        assert!(!err.is_request_error());
        assert_eq!(err.status(), None);
        assert!(err.violations().is_none());
    }
}
