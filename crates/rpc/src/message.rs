//! The wire envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::protocol::Inbound;
use crate::types::{AnyNotification, AnyRequest, AnyResponse, RequestId, ResponseError};


const TYPE_RESPONSE: &str = "response";
const TYPE_ERROR_RESPONSE: &str = "errorResponse";

/// A single envelope exchanged over the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage", into = "RawMessage")]
pub enum Message {
	/// Expects exactly one response.
	Request(AnyRequest),
	/// Answers a request, successfully or not.
	Response(AnyResponse),
	/// Fire-and-forget.
	Notification(AnyNotification),
}

impl Message {
	/// Classifies the message for dispatch.
	pub fn split(self) -> Inbound<AnyRequest, AnyResponse, AnyNotification> {
		match self {
			Self::Request(req) => Inbound::Request(req),
			Self::Response(resp) => Inbound::Response(resp),
			Self::Notification(notif) => Inbound::Notification(notif),
		}
	}

	/// Wire `type` of this envelope.
	pub fn kind(&self) -> &str {
		match self {
			Self::Request(req) => &req.method,
			Self::Response(AnyResponse { result: Ok(_), .. }) => TYPE_RESPONSE,
			Self::Response(AnyResponse { result: Err(_), .. }) => TYPE_ERROR_RESPONSE,
			Self::Notification(notif) => &notif.method,
		}
	}
}

/// Flat JSON shape shared by every envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
	#[serde(rename = "type")]
	kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	request_id: Option<RequestId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	body: Option<JsonValue>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	error: Option<ResponseError>,
	#[serde(flatten)]
	fields: Map<String, JsonValue>,
}

impl TryFrom<RawMessage> for Message {
	type Error = String;

	fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
		let body = raw.body.unwrap_or(JsonValue::Null);
		match (raw.kind.as_str(), raw.request_id) {
			(TYPE_RESPONSE, Some(id)) => Ok(Self::Response(AnyResponse { id, result: Ok(body) })),
			(TYPE_ERROR_RESPONSE, Some(id)) => Ok(Self::Response(AnyResponse {
				id,
				result: Err(raw.error.unwrap_or_else(|| ResponseError::new("unknown error"))),
			})),
			(TYPE_RESPONSE | TYPE_ERROR_RESPONSE, None) => Err(format!("{} without requestId", raw.kind)),
			(_, Some(id)) => Ok(Self::Request(AnyRequest {
				id,
				method: raw.kind,
				params: body,
			})),
			(_, None) => Ok(Self::Notification(AnyNotification {
				method: raw.kind,
				params: body,
				fields: raw.fields,
			})),
		}
	}
}

impl From<Message> for RawMessage {
	fn from(msg: Message) -> Self {
		let mut raw = Self {
			kind: String::new(),
			request_id: None,
			body: None,
			error: None,
			fields: Map::new(),
		};
		match msg {
			Message::Request(req) => {
				raw.kind = req.method;
				raw.request_id = Some(req.id);
				raw.body = non_null(req.params);
			}
			Message::Response(AnyResponse { id, result: Ok(body) }) => {
				raw.kind = TYPE_RESPONSE.to_owned();
				raw.request_id = Some(id);
				raw.body = non_null(body);
			}
			Message::Response(AnyResponse { id, result: Err(error) }) => {
				raw.kind = TYPE_ERROR_RESPONSE.to_owned();
				raw.request_id = Some(id);
				raw.error = Some(error);
			}
			Message::Notification(notif) => {
				raw.kind = notif.method;
				raw.body = non_null(notif.params);
				raw.fields = notif.fields;
			}
		}
		raw
	}
}

fn non_null(value: JsonValue) -> Option<JsonValue> {
	(!value.is_null()).then_some(value)
}
