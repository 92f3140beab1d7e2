//! Error types for the Pixelfed API client.
//!
//! # Design
//! Three families surface to the caller: validation errors raised before any
//! request is built, transport errors from the network layer, and errors the
//! server reported in its response body. The client never retries or swallows
//! any of them.

/// Errors returned by `PixelfedClient` and `Pixelfed`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Status creation was given an empty media-id list or a non-numeric id.
    #[error("invalid media_ids: must be a non-empty array of integers (got {0:?})")]
    InvalidMediaIds(Vec<String>),

    /// Status creation was given a visibility outside private/unlisted/public.
    #[error("invalid scope {0:?}: must be private, unlisted or public")]
    InvalidScope(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A 2xx response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The server answered with an API error object.
    #[error("server error (HTTP {status}): {error}")]
    Server {
        status: u16,
        error: String,
        description: Option<String>,
    },

    /// The server answered with a non-2xx status and a body that is neither
    /// the expected type nor an API error object.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never completed: DNS, connect, TLS or caller-imposed timeout.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Reading a media file from disk failed.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ApiError {
    /// True for the errors raised before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::InvalidMediaIds(_) | ApiError::InvalidScope(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_server_error() {
        let err = ApiError::Server {
            status: 401,
            error: "Unauthenticated.".to_string(),
            description: None,
        };
        assert_eq!(err.to_string(), "server error (HTTP 401): Unauthenticated.");
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_errors_are_flagged() {
        assert!(ApiError::InvalidScope("bogus".to_string()).is_validation());
        assert!(ApiError::InvalidMediaIds(Vec::new()).is_validation());
    }
}
