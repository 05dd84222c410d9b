//! Error types for engine interaction.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors raised by the engine or while decoding its query results.
#[derive(Debug, Error)]
pub enum EngineError {
	/// The engine rejected a command or failed while handling an event.
	#[error("engine error: {0}")]
	Engine(String),
	/// The engine does not know the named query.
	#[error("unknown query: {0}")]
	UnknownQuery(String),
	/// The engine does not know the named command.
	#[error("unknown command: {0}")]
	UnknownCommand(String),
	/// The state version query returned something other than 8 bytes.
	#[error("state version must be 8 bytes, got {len}")]
	InvalidVersion {
		/// Length of the returned payload.
		len: usize,
	},
	/// A query or command payload was not valid JSON of the expected shape.
	#[error("malformed {what}: {error}")]
	Payload {
		/// Which payload failed.
		what: &'static str,
		/// Underlying decode error.
		#[source]
		error: serde_json::Error,
	},
}

impl EngineError {
	/// Creates an engine-side failure from any message.
	pub fn engine(message: impl Into<String>) -> Self {
		Self::Engine(message.into())
	}
}
