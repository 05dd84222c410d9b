//! Error types for the run loop and its host.

use std::path::PathBuf;

use pixbridge_engine::EngineError;
use thiserror::Error;

/// Result type for run loop operations.
pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;

/// Errors that stop the run loop from starting or continuing.
#[derive(Debug, Error)]
pub enum RuntimeError {
	/// The engine failed to load.
	#[error(transparent)]
	Engine(#[from] EngineError),
	/// The initial workspace file could not be read.
	#[error("I/O error reading {path}: {error}")]
	Workspace {
		/// Path of the workspace file.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Errors raised by host-side IO actions.
#[derive(Debug, Error)]
pub enum HostError {
	/// The host cannot perform this action at all.
	#[error("{0} is not supported by this host")]
	Unsupported(&'static str),
	/// The action failed.
	#[error("{0}")]
	Io(#[from] std::io::Error),
}

/// Errors that can occur when loading host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
	/// Error parsing TOML.
	#[error("TOML parse error in {path}: {error}")]
	Toml {
		/// Path to the malformed file.
		path: PathBuf,
		/// The underlying parse error.
		error: toml::de::Error,
	},
}
