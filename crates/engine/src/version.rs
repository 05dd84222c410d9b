//! Engine state version.

use std::fmt;

use crate::error::{EngineError, Result};

/// Monotonic counter the engine bumps on every state mutation.
///
/// Encoded on the query boundary as 8 big-endian bytes. Two reads returning the same
/// value imply no mutation happened in between.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateVersion(pub u64);

impl StateVersion {
	/// Decodes the raw `stateVersion` query result.
	pub fn from_be_bytes(bytes: &[u8]) -> Result<Self> {
		let raw: [u8; 8] = bytes.try_into().map_err(|_| EngineError::InvalidVersion { len: bytes.len() })?;
		Ok(Self(u64::from_be_bytes(raw)))
	}

	/// Encodes the version the way the engine reports it.
	pub const fn to_be_bytes(self) -> [u8; 8] {
		self.0.to_be_bytes()
	}
}

impl fmt::Display for StateVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "v{}", self.0)
	}
}
