use thiserror::Error;

#[derive(Debug, Error)]
pub enum BragError {
    #[error("not initialized: run 'brag init'")]
    NotInitialized,

    #[error("no generated batch: run 'brag generate' first")]
    NoBatch,

    #[error("generated entry {index} not found (batch has {len} entries)")]
    EntryNotFound { index: usize, len: usize },

    #[error("brag list not found: accept an entry first")]
    LedgerNotFound,

    #[error("brag list entry not found: {0}")]
    LedgerEntryNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid mode '{0}'")]
    InvalidMode(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BragError {
    /// True for errors that address something absent from the current document.
    /// Callers should refresh their view rather than retry.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BragError::NoBatch
                | BragError::EntryNotFound { .. }
                | BragError::LedgerNotFound
                | BragError::LedgerEntryNotFound(_)
                | BragError::TaskNotFound(_)
        )
    }

    /// True when the underlying document read/write failed.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            BragError::Io(_) | BragError::Yaml(_) | BragError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BragError>;
