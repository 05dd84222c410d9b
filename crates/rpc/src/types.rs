//! Untyped envelope payloads.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::protocol::{Notification, Request};

/// Correlates a request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Failure reported by the peer in an `errorResponse`.
///
/// Peers may put anything in the `error` field. Strings are kept as-is, objects
/// contribute their `message` field, and anything else is kept as its JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
	/// Human-readable failure description.
	pub message: String,
}

impl ResponseError {
	/// Creates an error with the given message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}

	/// Creates an error from anything displayable.
	pub fn from_display(err: &impl fmt::Display) -> Self {
		Self::new(err.to_string())
	}

	fn from_value(value: JsonValue) -> Self {
		match value {
			JsonValue::String(message) => Self { message },
			JsonValue::Object(mut map) => match map.remove("message") {
				Some(JsonValue::String(message)) => Self { message },
				_ => Self::new(JsonValue::Object(map).to_string()),
			},
			JsonValue::Null => Self::new("unknown error"),
			other => Self::new(other.to_string()),
		}
	}
}

impl fmt::Display for ResponseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

impl std::error::Error for ResponseError {}

impl Serialize for ResponseError {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.message)
	}
}

impl<'de> Deserialize<'de> for ResponseError {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		JsonValue::deserialize(deserializer).map(Self::from_value)
	}
}

/// A request with an untyped body.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyRequest {
	/// Correlation id.
	pub id: RequestId,
	/// Wire `type`.
	pub method: String,
	/// Request body; `Null` when absent.
	pub params: JsonValue,
}

impl AnyRequest {
	/// Builds a request for method `R`.
	pub fn new<R: Request>(id: RequestId, params: &R::Params) -> serde_json::Result<Self> {
		Ok(Self {
			id,
			method: R::METHOD.to_owned(),
			params: serde_json::to_value(params)?,
		})
	}

	/// Decodes the body as `R`'s parameters.
	pub fn params<R: Request>(&self) -> serde_json::Result<R::Params> {
		serde_json::from_value(self.params.clone())
	}
}

/// A response with an untyped body.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyResponse {
	/// Id of the request being answered.
	pub id: RequestId,
	/// Response body, or the peer's failure.
	pub result: Result<JsonValue, ResponseError>,
}

/// A notification with an untyped payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyNotification {
	/// Wire `type`.
	pub method: String,
	/// Payload from `body`; `Null` when absent.
	pub params: JsonValue,
	/// Payload fields sent next to `type`.
	pub fields: Map<String, JsonValue>,
}

impl AnyNotification {
	/// Builds a notification for method `N`.
	pub fn new<N: Notification>(params: &N::Params) -> serde_json::Result<Self> {
		let value = serde_json::to_value(params)?;
		let (params, fields) = match value {
			JsonValue::Object(fields) if N::INLINE => (JsonValue::Null, fields),
			value => (value, Map::new()),
		};
		Ok(Self {
			method: N::METHOD.to_owned(),
			params,
			fields,
		})
	}

	/// Returns true if this is an `N` notification.
	pub fn is<N: Notification>(&self) -> bool {
		self.method == N::METHOD
	}

	/// Decodes the payload as `N`'s parameters.
	pub fn params<N: Notification>(&self) -> serde_json::Result<N::Params> {
		if N::INLINE {
			serde_json::from_value(JsonValue::Object(self.fields.clone()))
		} else {
			serde_json::from_value(self.params.clone())
		}
	}
}
