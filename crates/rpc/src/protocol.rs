//! Typed method descriptors and message classification.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Simple counter-based ID generator.
///
/// Bridges start at 1 so a zero id never appears on the wire.
#[derive(Debug, Clone, Copy)]
pub struct CounterIdGen(pub u64);

impl Default for CounterIdGen {
	fn default() -> Self {
		Self::new()
	}
}

impl CounterIdGen {
	/// Creates a new counter starting at 1.
	#[must_use]
	pub const fn new() -> Self {
		Self(1)
	}

	/// Generates the next unique ID and increments the counter.
	#[allow(clippy::should_implement_trait, reason = "convention")]
	pub fn next(&mut self) -> u64 {
		let id = self.0;
		self.0 += 1;
		id
	}
}

/// Classification of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<Req, Resp, Notif> {
	/// An incoming request.
	Request(Req),
	/// An incoming response.
	Response(Resp),
	/// An incoming notification.
	Notification(Notif),
}

/// A request method: sent with a fresh id, answered exactly once.
pub trait Request {
	/// Wire `type` of the request.
	const METHOD: &'static str;
	/// Request body.
	type Params: Serialize + DeserializeOwned;
	/// Successful response body.
	type Result: Serialize + DeserializeOwned;
}

/// A notification method: fire-and-forget.
pub trait Notification {
	/// Wire `type` of the notification.
	const METHOD: &'static str;
	/// Notification payload.
	type Params: Serialize + DeserializeOwned;
	/// Payload fields sit next to `type` instead of inside `body`.
	const INLINE: bool = false;
}
