//! Error types for child-process supervision

use std::io;
use thiserror::Error;

/// Supervision errors
///
/// Timeouts and EOF while reading are *outcomes*, not errors; see
/// [`crate::reader::ReadOutcome`].
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Failed to spawn the child process
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[source] io::Error),

    /// A child is already running under this handle
    #[error("A child process is already running")]
    AlreadyRunning,

    /// No running child to talk to
    #[error("The process is not running")]
    NotRunning,

    /// Failed to write a command to the child's stdin
    #[error("Could not send command to the process: {0}")]
    SendFailed(#[source] io::Error),

    /// Failed to read from the child's stdout
    #[error("Could not read process output: {0}")]
    ReadFailed(#[source] io::Error),

    /// Waiting on the child's exit status failed
    #[error("Waiting on the process failed: {0}")]
    WaitFailed(#[source] io::Error),

    /// Failed to kill the child
    #[error("Failed to kill process: {0}")]
    KillFailed(String),
}

/// Result type for supervision operations
pub type Result<T> = std::result::Result<T, SupervisorError>;
