//! Error type for remote synchronization.
//!
//! # Design
//! Every failure talking to the table API surfaces as a `SyncError`. The
//! variants only refine how the human-readable message is produced; the
//! controller treats them all the same way and stores `to_string()` as the
//! global error message.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body did not match the records envelope.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("could not encode request: {0}")]
    Encode(String),
}
