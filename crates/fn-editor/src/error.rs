use thiserror::Error;

/// Failures of user-triggered remote operations.
///
/// Geometry problems never show up here; they are absorbed by the
/// reconciler. Everything in this enum is surfaced once, at the user action
/// that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The relay itself failed (no response, extension context gone).
    #[error("relay request failed: {0}")]
    Transport(String),

    /// The data store answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The schema still rejected fields after they were stripped once.
    #[error("fields rejected by the data store: {}", .0.join(", "))]
    RejectedFields(Vec<String>),

    #[error("Please enter some text for your note.")]
    EmptyText,

    #[error("Could not determine the diagram id from the page URL.")]
    MissingDiagramId,
}

impl RemoteError {
    /// Whether the user can fix this without leaving the editor.
    pub fn is_validation(&self) -> bool {
        matches!(self, RemoteError::EmptyText | RemoteError::MissingDiagramId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = RemoteError::RejectedFields(vec!["BRX__c".into(), "BRY__c".into()]);
        assert_eq!(e.to_string(), "fields rejected by the data store: BRX__c, BRY__c");
        let e = RemoteError::Status {
            status: 400,
            message: "bad".into(),
        };
        assert_eq!(e.to_string(), "HTTP 400: bad");
        assert!(RemoteError::EmptyText.is_validation());
        assert!(!RemoteError::Transport("x".into()).is_validation());
    }
}
