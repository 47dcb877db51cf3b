use std::io;

use thiserror::Error;

use crate::http::writer::WriterState;

/// Errors produced while framing an HTTP/1.1 message.
///
/// Every variant except [`HttpError::Io`] describes bad data on the wire or
/// misuse of the writer. None of them are recoverable for the message being
/// processed: the connection answers (if it still can) and closes.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request line does not have exactly three space separated tokens.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// The version token is not `HTTP/1.1`.
    #[error("unsupported HTTP version: {0:?}")]
    UnsupportedVersion(String),

    /// The method is not one of the supported verbs.
    #[error("unknown method: {0:?}")]
    UnknownMethod(String),

    /// The request target does not start with `/`.
    #[error("invalid request target: {0:?}")]
    InvalidTarget(String),

    /// A header line has no colon, is not UTF-8, or has whitespace before the colon.
    #[error("invalid header format: {0:?}")]
    InvalidHeaderFormat(String),

    /// A header name is empty or contains characters outside the token set.
    #[error("invalid header key: {0:?}")]
    InvalidHeaderKey(String),

    /// `Content-Length` is not a non-negative decimal integer.
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("body is longer than Content-Length ({actual} > {expected})")]
    BodyTooLong { expected: usize, actual: usize },

    #[error("body is shorter than Content-Length ({actual} < {expected})")]
    TruncatedBody { expected: usize, actual: usize },

    /// The request line and headers did not end within `limit` bytes.
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    /// The stream ended before a full request line arrived.
    #[error("stream ended before the request line was complete")]
    IncompleteRequest,

    #[error("request already completed, no more data accepted")]
    AlreadyCompleted,

    /// A writer operation was attempted out of HTTP framing order.
    #[error("cannot {attempted} in writer state {state:?}")]
    InvalidWriteOrder {
        state: WriterState,
        attempted: &'static str,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HttpError {
    /// Whether the error was caused by the peer's bytes (answered with 400).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            HttpError::Io(_) | HttpError::InvalidWriteOrder { .. } | HttpError::AlreadyCompleted
        )
    }
}
