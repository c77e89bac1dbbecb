use crate::achievements::AchievementCategory;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
    /// Raised when an operation needs a session and none is active. State is
    /// left untouched.
    #[error("no active session")]
    NoActiveSession,

    #[error("a batch submission is already awaiting confirmation")]
    SubmissionPending,

    #[error("no souls queued for submission")]
    EmptyQueue,

    /// The ledger did not accept the write. Queued souls are kept for retry.
    #[error("batch of {count} soul(s) was not accepted: {source}")]
    SubmissionFailed {
        count: u32,
        #[source]
        source: LedgerError,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger rejected the write: {0}")]
    Rejected(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("ledger event stream closed")]
    StreamClosed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("achievement id {id} appears more than once")]
    DuplicateId { id: u32 },

    #[error("flag bit {bit} is shared by achievements {first} and {second}")]
    DuplicateBit { bit: u8, first: u32, second: u32 },

    #[error("achievement {id} uses bit {bit}, outside the {category} range")]
    BitOutsideCategory {
        id: u32,
        bit: u8,
        category: AchievementCategory,
    },

    #[error("unknown achievement category: {0}")]
    UnknownCategory(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
