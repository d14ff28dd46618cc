//! Error types for the agreements crate

use thiserror::Error;

/// Result type for agreement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Agreement workflow errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error (balance guards, storage)
    #[error("Ledger error: {0}")]
    Ledger(#[from] wallet_ledger::Error),

    /// Transition attempted from the wrong state or by the wrong party
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// The party has already signed this agreement version
    #[error("Already signed: {0}")]
    AlreadySigned(String),

    /// Stored terms do not match the recorded content hash
    #[error("Integrity mismatch: agreement {0} does not match its content hash")]
    IntegrityMismatch(String),

    /// An active agreement already exists for the project
    #[error("Duplicate active agreement for project {0}")]
    DuplicateActiveAgreement(String),

    /// Agreement not found
    #[error("Agreement not found: {0}")]
    AgreementNotFound(String),

    /// Escrow not found for project
    #[error("Escrow not found for project: {0}")]
    EscrowNotFound(String),

    /// Bid not found
    #[error("Bid not found: {0}")]
    BidNotFound(String),

    /// Project not found
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// Dispute not found
    #[error("Dispute not found: {0}")]
    DisputeNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
