use thiserror::Error;

pub use reqwest::StatusCode;

/// Failure of a streaming chat request.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The caller cancelled the request. Not a failure to report.
    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
    },

    /// A streamed line could not be understood, or the endpoint reported an
    /// error in-band.
    #[error("protocol error: {reason}")]
    Protocol { reason: String, line: String },

    #[error("chat history is empty")]
    EmptyHistory,
}

/// Coarse classification of a [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Cancelled,
    Transport,
    Protocol,
    InvalidRequest,
}

impl StreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Cancelled => ErrorKind::Cancelled,
            StreamError::Transport(_) | StreamError::Status { .. } => ErrorKind::Transport,
            StreamError::Protocol { .. } => ErrorKind::Protocol,
            StreamError::EmptyHistory => ErrorKind::InvalidRequest,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }

    pub(crate) fn protocol(reason: impl Into<String>, line: impl Into<String>) -> Self {
        StreamError::Protocol {
            reason: reason.into(),
            line: line.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(StreamError::Cancelled.kind(), ErrorKind::Cancelled);
        assert!(StreamError::Cancelled.is_cancelled());
        assert_eq!(
            StreamError::protocol("bad json", "{").kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            StreamError::Status {
                status: StatusCode::NOT_FOUND,
                body: "model not found".to_string(),
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(StreamError::EmptyHistory.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_display() {
        let err = StreamError::protocol("unexpected end of input", "{\"message\"");
        assert_eq!(err.to_string(), "protocol error: unexpected end of input");
        assert!(!err.is_cancelled());
    }
}
