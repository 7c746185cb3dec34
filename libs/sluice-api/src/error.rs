/// Category of a backend error. Lets the pipeline tell a dead connection
/// from a response it could not understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid client configuration; fails at startup.
    Config,
    /// Network failure: connect, timeout, broken stream.
    Transport,
    /// The backend answered with a non-success status.
    Status,
    /// The backend answered, but the body did not parse.
    Protocol,
    /// Logical error (closed handle, invalid state, generic).
    Logic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Transport => f.write_str("transport"),
            ErrorKind::Status => f.write_str("status"),
            ErrorKind::Protocol => f.write_str("protocol"),
            ErrorKind::Logic => f.write_str("logic"),
        }
    }
}

/// Unified error type for all `SearchBackend` calls.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
/// Every kind is fatal for the operation that produced it: the pipeline
/// does not retry.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendError {
    kind: ErrorKind,
    message: String,
}

impl BackendError {
    /// Generic logic error (default kind).
    pub fn new(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Logic, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Transport, message: msg.into() }
    }

    pub fn status(code: u16, body: impl std::fmt::Display) -> Self {
        Self { kind: ErrorKind::Status, message: format!("HTTP {code}: {body}") }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Protocol, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl std::fmt::Debug for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendError {}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self { kind: ErrorKind::Protocol, message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_kind() {
        let err = BackendError::transport("connection refused").with_context("bulk");
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.to_string(), "bulk: connection refused");
        assert_eq!(format!("{err:?}"), "[transport] bulk: connection refused");
    }

    #[test]
    fn status_message_carries_code() {
        let err = BackendError::status(503, "unavailable");
        assert_eq!(err.kind(), ErrorKind::Status);
        assert_eq!(err.message(), "HTTP 503: unavailable");
    }
}
