//! Spawn configuration

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::reader::DEFAULT_READ_TIMEOUT;

/// Configuration for spawning a supervised child
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Path to the executable
    pub command: String,
    /// Arguments passed after the executable path (argv[0] is the command
    /// itself, supplied by the spawn primitive)
    pub args: Vec<String>,
    /// Working directory (None = inherit)
    pub working_dir: Option<PathBuf>,
    /// Environment variables added on top of the inherited environment
    pub env: HashMap<String, String>,
    /// Substituted when a read is requested with a zero timeout
    pub default_read_timeout: Duration,
}

impl SpawnConfig {
    /// Create a configuration for `command` with no arguments
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: vec![],
            working_dir: None,
            env: HashMap::new(),
            default_read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set command arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Override the bound used when a read is requested with a zero timeout
    pub fn default_read_timeout(mut self, timeout: Duration) -> Self {
        self.default_read_timeout = timeout;
        self
    }
}
