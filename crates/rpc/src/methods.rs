//! The concrete method set spoken between hosts and viewers.
//!
//! Requests (host to viewer unless noted):
//! * [`SetWorkspace`]: replace the viewer's workspace
//! * [`GetWorkspace`]: fetch the viewer's workspace
//! * [`NotifyInputNumber`] / [`NotifyInputSize`]: deliver a user's answer
//!
//! Notifications:
//! * [`Ready`]: viewer finished loading (viewer to host)
//! * [`NotifyDirty`]: viewer has unflushed edits (viewer to host)
//! * [`InputNumber`] / [`InputSize`]: viewer needs a value from the user (viewer to host)
//! * [`Update`]: host tells a viewer about the document it shows

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::protocol::{Notification, Request};

/// Raw workspace bytes, base64 on the wire.
///
/// Also accepts a JSON array of byte values when decoding.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WorkspaceBytes(pub Vec<u8>);

impl fmt::Debug for WorkspaceBytes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "WorkspaceBytes({} bytes)", self.0.len())
	}
}

impl Serialize for WorkspaceBytes {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(&self.0))
	}
}

impl<'de> Deserialize<'de> for WorkspaceBytes {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct BytesVisitor;

		impl<'de> Visitor<'de> for BytesVisitor {
			type Value = WorkspaceBytes;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a base64 string or an array of bytes")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
				STANDARD.decode(v).map(WorkspaceBytes).map_err(E::custom)
			}

			fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
				let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
				while let Some(b) = seq.next_element::<u8>()? {
					bytes.push(b);
				}
				Ok(WorkspaceBytes(bytes))
			}
		}

		deserializer.deserialize_any(BytesVisitor)
	}
}

/// Answer to a numeric input request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberInput {
	/// Id from the originating [`InputNumber`].
	pub id: u32,
	/// The user's answer, unparsed.
	pub number: String,
}

/// Answer to a size input request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeInput {
	/// Id from the originating [`InputSize`].
	pub id: u32,
	/// The user's answer, unparsed.
	pub size: String,
}

/// Payload of [`InputNumber`] and [`InputSize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPrompt {
	/// Correlates the eventual answer.
	pub input_id: u32,
}

/// Payload of [`Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerState {
	/// The document has no backing file yet.
	pub untitled: bool,
	/// Saving back to the document's location is possible.
	pub editable: bool,
}

/// Replace the viewer's workspace.
#[derive(Debug)]
pub enum SetWorkspace {}

impl Request for SetWorkspace {
	const METHOD: &'static str = "setWorkspace";
	type Params = WorkspaceBytes;
	type Result = ();
}

/// Fetch the viewer's workspace, flushing its dirty state.
#[derive(Debug)]
pub enum GetWorkspace {}

impl Request for GetWorkspace {
	const METHOD: &'static str = "getWorkspace";
	type Params = ();
	type Result = WorkspaceBytes;
}

/// Deliver the user's numeric answer.
#[derive(Debug)]
pub enum NotifyInputNumber {}

impl Request for NotifyInputNumber {
	const METHOD: &'static str = "notifyInputNumber";
	type Params = NumberInput;
	type Result = ();
}

/// Deliver the user's size answer.
#[derive(Debug)]
pub enum NotifyInputSize {}

impl Request for NotifyInputSize {
	const METHOD: &'static str = "notifyInputSize";
	type Params = SizeInput;
	type Result = ();
}

/// The viewer finished loading.
#[derive(Debug)]
pub enum Ready {}

impl Notification for Ready {
	const METHOD: &'static str = "ready";
	type Params = ();
}

/// The viewer has edits the host has not seen.
#[derive(Debug)]
pub enum NotifyDirty {}

impl Notification for NotifyDirty {
	const METHOD: &'static str = "notifyDirty";
	type Params = ();
}

/// The viewer needs a number from the user.
#[derive(Debug)]
pub enum InputNumber {}

impl Notification for InputNumber {
	const METHOD: &'static str = "inputNumber";
	type Params = InputPrompt;
	const INLINE: bool = true;
}

/// The viewer needs a size from the user.
#[derive(Debug)]
pub enum InputSize {}

impl Notification for InputSize {
	const METHOD: &'static str = "inputSize";
	type Params = InputPrompt;
	const INLINE: bool = true;
}

/// Tells a viewer about the document it shows.
#[derive(Debug)]
pub enum Update {}

impl Notification for Update {
	const METHOD: &'static str = "update";
	type Params = ViewerState;
}
