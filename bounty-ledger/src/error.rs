//! Error types for the bounty ledger

use crate::types::BountyId;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Validation, not-found and conflict variants are detected before any
/// mutation and are safe to echo back to the requesting user. Storage and
/// serialization variants are internal: they are logged and replaced with a
/// generic message at the reply boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Share amount was zero or negative
    #[error("Provide a positive number of shares!")]
    InvalidAmount,

    /// Bounty capacity was zero or negative
    #[error("Could not add the bounty: capacity must be a positive number!")]
    InvalidCapacity,

    /// Bounty duration was zero or negative
    #[error("Could not add the bounty: provide a positive number of minutes!")]
    InvalidDuration,

    /// Malformed or missing intent arguments
    #[error("{0}")]
    InvalidArgument(String),

    /// Unrecognized intent command
    #[error("Unknown command `{0}`")]
    UnknownCommand(String),

    /// The requesting user has never registered
    #[error("You're not registered yet! Use /register first.")]
    UnknownUser,

    /// The mentioned target does not match any registered user
    #[error("Sorry, I don't know who that is!")]
    UnknownTarget,

    /// No bounty matches the given id or active name
    #[error("There is no open bounty matching `{0}`!")]
    BountyNotFound(String),

    /// An active bounty already carries this name
    #[error("An active bounty named `{0}` already exists!")]
    DuplicateBounty(String),

    /// The user already holds a participation slot in this bounty
    #[error("You're already part of bounty {0}!")]
    AlreadyJoined(BountyId),

    /// The user holds no participation slot in this bounty
    #[error("You're not part of bounty {0}!")]
    NotParticipating(BountyId),

    /// All participation slots are taken
    #[error("Bounty {0} has all the muscle it needs.")]
    BountyFull(BountyId),

    /// The bounty is inactive or its window has elapsed
    #[error("Bounty {0} has ended!")]
    BountyEnded(BountyId),

    /// Actor and target are the same user
    #[error("You can't move shares to yourself!")]
    SelfTransfer,

    /// Cashout amount exceeds the target's balance
    #[error("Max cashout amount is {balance}.")]
    InsufficientShares {
        /// Current balance of the target
        balance: i64,
        /// Amount that was requested
        requested: i64,
    },

    /// Non-admin invoked an administrator command
    #[error("This is an administrator command!")]
    NotAuthorized,

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl Error {
    /// Whether the error text is addressed to the requesting user.
    ///
    /// Internal errors (storage, serialization, config, io) must never reach
    /// chat verbatim; callers replace them with a generic apology.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Error::Storage(_)
                | Error::Serialization(_)
                | Error::Config(_)
                | Error::Concurrency(_)
                | Error::Io(_)
        )
    }
}
