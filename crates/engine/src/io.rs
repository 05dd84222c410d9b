//! IO requests raised by the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Correlates an input request with its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputId(pub u32);

impl fmt::Display for InputId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Something the engine wants the host to do on its behalf.
///
/// The engine queues these; the host drains at most one per step via the
/// `nextIoRequest` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IoRequest {
	/// Persist the workspace as a PNG file.
	SaveWorkspace,
	/// Replace the workspace with a user-chosen PNG file.
	LoadWorkspace,
	/// Import a user-chosen PNG into the workspace.
	ImportImage,
	/// Short haptic feedback.
	Vibrate,
	/// Ask the user for a number.
	InputNumber {
		/// Correlation id echoed back with the answer.
		id: InputId,
	},
	/// Ask the user for a size.
	InputSize {
		/// Correlation id echoed back with the answer.
		id: InputId,
	},
}

impl IoRequest {
	/// Decodes the raw `nextIoRequest` query result; empty means nothing is pending.
	pub fn decode(bytes: &[u8]) -> Result<Option<Self>> {
		if bytes.is_empty() {
			return Ok(None);
		}
		serde_json::from_slice(bytes).map(Some).map_err(|error| EngineError::Payload { what: "io request", error })
	}

	/// Short label for logging.
	pub const fn name(&self) -> &'static str {
		match self {
			Self::SaveWorkspace => "saveWorkspace",
			Self::LoadWorkspace => "loadWorkspace",
			Self::ImportImage => "importImage",
			Self::Vibrate => "vibrate",
			Self::InputNumber { .. } => "inputNumber",
			Self::InputSize { .. } => "inputSize",
		}
	}
}
