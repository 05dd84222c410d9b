//! Error types for the bridge.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::types::{RequestId, ResponseError};

/// Result type for bridge operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the bridge.
#[derive(Debug, Error)]
pub enum Error {
	/// The peer end of the channel is gone.
	#[error("bridge channel closed")]
	ChannelClosed,
	/// The request was cancelled before a response arrived.
	#[error("request cancelled")]
	Cancelled,
	/// No response arrived within the configured timeout.
	#[error("request {id} ({method}) timed out after {elapsed:?}")]
	Timeout {
		/// Id of the abandoned request.
		id: RequestId,
		/// Method of the abandoned request.
		method: String,
		/// How long the request waited.
		elapsed: Duration,
	},
	/// The peer answered with an `errorResponse`.
	#[error("{0}")]
	Response(#[from] ResponseError),
	/// The peer sent an undecodable message or body.
	#[error("deserialization failed: {0}")]
	Deserialize(#[from] serde_json::Error),
	/// The peer sent a structurally invalid envelope.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// Input/output errors from the underlying stream.
	#[error("{0}")]
	Io(#[from] io::Error),
}
