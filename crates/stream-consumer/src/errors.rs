use std::time::Duration;

/// Errors reported by an event source, either while opening the stream or as
/// an item of the stream itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The upstream API rejected the request or reported a failure.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        status_code: Option<u16>,
    },
    /// The connection or the byte stream failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// A known event kind arrived without a field its kind requires.
    #[error("malformed `{kind}` event: {reason}")]
    MalformedEvent { kind: String, reason: String },
}

impl SourceError {
    /// Creates an upstream error.
    pub fn upstream(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Upstream {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a malformed-event error for the given event kind.
    pub fn malformed(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Terminal failure of a single streaming session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum SessionFailure {
    /// The producer sent an explicit `error` event.
    #[error("upstream failure: {message}")]
    Upstream { message: String },
    /// The event sequence broke before the producer sent a terminal event.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// A known event kind carried an incomplete payload.
    #[error("malformed `{kind}` event: {reason}")]
    MalformedEvent { kind: String, reason: String },
    /// The producer kept sending after a terminal event.
    #[error("protocol violation: {message}")]
    ProtocolViolation { message: String },
}

impl From<SourceError> for SessionFailure {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::Upstream {
                message,
                status_code: Some(status),
            } => SessionFailure::Upstream {
                message: format!("{message} (status {status})"),
            },
            SourceError::Upstream { message, .. } => SessionFailure::Upstream { message },
            SourceError::Transport { message } => SessionFailure::Transport { message },
            SourceError::MalformedEvent { kind, reason } => {
                SessionFailure::MalformedEvent { kind, reason }
            }
        }
    }
}

/// Top-level error type for the public consumer API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsumerError {
    /// Required configuration (the API credential) is missing or invalid.
    /// Raised before any session starts.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Invalid caller input to the session builder.
    #[error("validation error: {0}")]
    Validation(String),
    /// A started session ended in failure.
    #[error(transparent)]
    Session(SessionFailure),
    /// The caller's timeout elapsed and the session was abandoned.
    #[error("session abandoned after {0:?}")]
    TimedOut(Duration),
}

impl From<SessionFailure> for ConsumerError {
    fn from(value: SessionFailure) -> Self {
        ConsumerError::Session(value)
    }
}

impl From<SourceError> for ConsumerError {
    fn from(value: SourceError) -> Self {
        ConsumerError::Session(value.into())
    }
}
