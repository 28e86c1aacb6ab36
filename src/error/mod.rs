// Error handling module for Threshold Recovery Node
//
// This module defines error types and utility functions for error handling

use std::io;
use std::result;
use thiserror::Error;

/// Result type for Threshold Recovery Node operations
pub type Result<T> = result::Result<T, RecoveryNodeError>;

/// Error type for Threshold Recovery Node operations
#[derive(Debug, Error, Clone)]
pub enum RecoveryNodeError {
    /// Malformed or missing request fields
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Share does not verify against the published commitment
    #[error("Invalid commitment: {0}")]
    InvalidCommitment(String),

    /// Signature verification failed
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Signature is not the expected fixed-width R || S encoding
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Liveness timestamp outside the freshness window
    #[error("Stale timestamp: {0}")]
    StaleTimestamp(String),

    /// A wallet or participant with this identity already exists
    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller's key maps to no mailbox slot on this wallet
    #[error("Not a friend: {0}")]
    NotAFriend(String),

    /// Release refused because the wallet owner is still live
    #[error("Recovery locked")]
    RecoveryLocked {
        /// Last accepted proof of life (unix seconds)
        last_activity: u64,
        /// Seconds until the dead-man switch trips (non-positive = tripped)
        time_until_recovery: i64,
    },

    /// Point is not a valid uncompressed curve point
    #[error("Invalid point encoding: {0}")]
    InvalidPointEncoding(String),

    /// Scalar is not canonical for the curve order
    #[error("Scalar out of range: {0}")]
    ScalarOutOfRange(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization-related errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    IO(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for RecoveryNodeError {
    fn from(err: io::Error) -> Self {
        RecoveryNodeError::IO(err.to_string())
    }
}

impl From<serde_json::Error> for RecoveryNodeError {
    fn from(err: serde_json::Error) -> Self {
        RecoveryNodeError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for RecoveryNodeError {
    fn from(err: toml::ser::Error) -> Self {
        RecoveryNodeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for RecoveryNodeError {
    fn from(err: toml::de::Error) -> Self {
        RecoveryNodeError::Serialization(err.to_string())
    }
}
