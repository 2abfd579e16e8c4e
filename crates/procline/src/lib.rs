//! # procline
//!
//! Supervision of line-oriented command/response child processes: spawn an
//! executable that speaks a newline-delimited text protocol over stdio (a
//! chess engine, a REPL, any stdin/stdout worker), write commands to it, read
//! its output lines under a timeout, detect when it dies, and guarantee it is
//! killed and reaped when the handle goes away.
//!
//! ## Features
//!
//! - **Piped spawning**: child stdin/stdout wired to the supervisor, own
//!   process group on Unix so terminal interrupts stay with the parent
//! - **Liveness tracking**: non-blocking exit collection, no zombie left
//!   behind
//! - **Timeout-bounded line reads**: partial-line flush at timeout/EOF,
//!   optional early exit when a line with an expected prefix arrives
//! - **Newline-normalized writes**: every command leaves with exactly one
//!   trailing `'\n'`
//! - **Line mirroring**: in-process fan-out of every line read to any number
//!   of subscribers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use procline::{SpawnConfig, Supervisor};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = Supervisor::new(SpawnConfig::new("/usr/local/bin/stockfish"));
//! engine.spawn()?;
//!
//! engine.send("uci").await?;
//! let reply = engine.read_until(Duration::from_secs(2), "uciok").await?;
//! assert!(reply.outcome.is_success(true));
//!
//! engine.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mirror;
pub mod reader;
pub mod supervisor;

pub use config::SpawnConfig;
pub use error::{Result, SupervisorError};
pub use mirror::MirrorHub;
pub use reader::{ReadOutcome, ReadResult, DEFAULT_READ_TIMEOUT};
pub use supervisor::Supervisor;
