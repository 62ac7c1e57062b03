use thiserror::Error;

/// Failures the sync engine reports on its own, as opposed to errors
/// passed through from the VersionOne or JIRA HTTP clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("not found: {0}")]
    NotFound(String),
}
