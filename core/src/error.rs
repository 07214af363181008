//! Error types for the Trello API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." Transport failures carry a `TransportErrorKind` plus the
//! transport's own message, so a failed call never looks like a payload.

use std::fmt;

/// Coarse classification of a failure below the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionRefused,
    HostNotFound,
    Timeout,
    InvalidUrl,
    Io,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::HostNotFound => "host not found",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::InvalidUrl => "invalid url",
            TransportErrorKind::Io => "io",
            TransportErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// Errors returned by the dispatcher, the sub-clients and the config layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// An unregistered sub-client name was requested.
    #[error("unknown API resource `{0}`")]
    InvalidArgument(String),

    /// No default port is known for the URL scheme.
    #[error("no default port for URL scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A body starting with `<` was not a well-formed XML document.
    #[error("xml parse failed: {0}")]
    Xml(String),

    /// The decoded response was a different variant than the caller needs.
    #[error("expected {expected} payload, received {found}")]
    UnexpectedPayload {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        ApiError::Transport {
            kind,
            message: message.into(),
        }
    }
}
