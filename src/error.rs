//! Error types used by the scheduler runtime and generation backends.
//!
//! This module defines three enums:
//!
//! - [`SchedulerError`] - errors surfaced to callers of the scheduler facade.
//! - [`GenerateError`] - errors raised by a [`Generator`](crate::Generator) while loading or running.
//! - [`ConfigError`] - invalid configuration values.
//!
//! All of them provide `as_label` (stable snake_case label for logs) and `as_message`.

use std::time::Duration;
use thiserror::Error;

/// # Errors surfaced by the scheduler facade.
///
/// Only [`SchedulerError::Timeout`] is expected during normal operation: a status
/// stream that saw no message within the idle-wait bound. The job itself is unaffected.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// No status or position update arrived within the idle-wait bound.
    #[error("no status update within {idle:?}")]
    Timeout {
        /// The configured idle-wait bound.
        idle: Duration,
    },

    /// The scheduler is shutting down and no longer accepts jobs.
    #[error("scheduler is shutting down")]
    ShuttingDown,

    /// The scheduler was dropped while the stream was still open.
    #[error("scheduler closed before the job finished")]
    Closed,

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use genvisor::SchedulerError;
    /// use std::time::Duration;
    ///
    /// let err = SchedulerError::Timeout { idle: Duration::from_secs(120) };
    /// assert_eq!(err.as_label(), "scheduler_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::Timeout { .. } => "scheduler_timeout",
            SchedulerError::ShuttingDown => "scheduler_shutting_down",
            SchedulerError::Closed => "scheduler_closed",
            SchedulerError::WorkerSpawn(_) => "scheduler_worker_spawn",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SchedulerError::Timeout { idle } => format!("timeout: idle for {idle:?}"),
            SchedulerError::ShuttingDown => "shutting down".to_string(),
            SchedulerError::Closed => "closed".to_string(),
            SchedulerError::WorkerSpawn(e) => format!("worker spawn: {e}"),
        }
    }
}

/// # Errors produced by a generation backend.
///
/// [`GenerateError::Failed`] is contained: the job ends with an error status and the
/// worker moves on. [`GenerateError::Fatal`] means the worker's state can no longer be
/// trusted (e.g. device memory fault); the worker exits and the supervisor replaces it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// The job failed; the generator remains usable.
    #[error("generation failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Unrecoverable fault; the generator must be reloaded.
    #[error("fatal generator fault: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl GenerateError {
    /// Shorthand for [`GenerateError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        GenerateError::Failed {
            error: error.into(),
        }
    }

    /// Shorthand for [`GenerateError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        GenerateError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GenerateError::Failed { .. } => "generate_failed",
            GenerateError::Fatal { .. } => "generate_fatal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            GenerateError::Failed { error } => format!("error: {error}"),
            GenerateError::Fatal { error } => format!("fatal: {error}"),
        }
    }

    /// Indicates whether the worker must be torn down and restarted.
    ///
    /// # Example
    /// ```
    /// use genvisor::GenerateError;
    ///
    /// assert!(GenerateError::fatal("illegal memory access").is_fatal());
    /// assert!(!GenerateError::failed("bad prompt").is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, GenerateError::Fatal { .. })
    }
}

/// # Invalid configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// The offending value.
        value: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ConfigError::Invalid { var, value } => format!("{var}={value:?} is not valid"),
        }
    }
}
