//! Request correlation over a [`PeerSocket`].
//!
//! A [`Bridge`] is one side of a host/viewer pair. Outgoing requests get a fresh id
//! and a completion slot in the pending map; inbound responses resolve the slot with
//! the same id and remove it.
//!
//! ```text
//!  request::<R>()            PeerSocket              peer
//!       │  id = next()           │                    │
//!       ├──────── post ─────────►├── {type,requestId}►│
//!       ├──── insert pending     │                    │
//!       │                        │                    │
//!       │◄─── accept(response) ──┤◄── response ───────┤
//!       │  remove pending, resolve slot               │
//! ```
//!
//! # Invariants
//!
//! - Ids are unique per bridge and never reused.
//! - A pending entry is removed exactly once: by its response, by
//!   [`Bridge::cancel_all`], by [`Bridge::reap_expired`], or by its own timeout.
//! - A response whose id is not pending is dropped. If it is an `errorResponse`,
//!   the user is notified once.
//! - Inbound processing never blocks on a response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{CounterIdGen, Inbound, Notification, Request};
use crate::socket::PeerSocket;
use crate::types::{AnyNotification, AnyRequest, AnyResponse, RequestId, ResponseError};


/// Surfaces failures nobody is waiting for.
pub trait UserNotifier: Send + Sync {
	/// Shows an error to the user.
	fn show_error(&self, message: &str);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
	fn show_error(&self, message: &str) {
		error!(message, "bridge.user_error");
	}
}

/// Inbound traffic the bridge does not consume itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
	/// A request the local side must answer with [`Bridge::respond`].
	Request(AnyRequest),
	/// A notification.
	Notification(AnyNotification),
}

struct Pending {
	method: String,
	created_at: Instant,
	tx: oneshot::Sender<Result<JsonValue>>,
}

struct PendingRequests {
	ids: CounterIdGen,
	outstanding: HashMap<RequestId, Pending>,
}

/// One side of a host/viewer message channel.
pub struct Bridge {
	label: String,
	socket: PeerSocket,
	pending: Mutex<PendingRequests>,
	notifier: Arc<dyn UserNotifier>,
	timeout: Option<Duration>,
}

impl std::fmt::Debug for Bridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Bridge")
			.field("label", &self.label)
			.field("pending", &self.pending_len())
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}

impl Bridge {
	/// Creates a bridge posting to `socket`.
	pub fn new(label: impl Into<String>, socket: PeerSocket, notifier: Arc<dyn UserNotifier>) -> Self {
		Self {
			label: label.into(),
			socket,
			pending: Mutex::new(PendingRequests {
				ids: CounterIdGen::new(),
				outstanding: HashMap::new(),
			}),
			notifier,
			timeout: None,
		}
	}

	/// Fails requests that see no response within `timeout`.
	#[must_use]
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	/// Label used in logs.
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Number of requests awaiting a response.
	pub fn pending_len(&self) -> usize {
		self.pending.lock().outstanding.len()
	}

	/// Returns true once the peer is gone.
	pub fn is_closed(&self) -> bool {
		self.socket.is_closed()
	}

	/// Sends a typed request and waits for its response.
	pub async fn request<R: Request>(&self, params: R::Params) -> Result<R::Result> {
		let params = serde_json::to_value(params)?;
		let body = self.request_raw(R::METHOD, params).await?;
		Ok(serde_json::from_value(body)?)
	}

	/// Sends an untyped request and waits for its response.
	pub async fn request_raw(&self, method: &str, params: JsonValue) -> Result<JsonValue> {
		let (tx, rx) = oneshot::channel();
		let id = {
			let mut pending = self.pending.lock();
			let id = RequestId(pending.ids.next());
			self.socket.post(Message::Request(AnyRequest {
				id,
				method: method.to_owned(),
				params,
			}))?;
			pending.outstanding.insert(
				id,
				Pending {
					method: method.to_owned(),
					created_at: Instant::now(),
					tx,
				},
			);
			id
		};
		trace!(bridge = %self.label, %id, method, "bridge.request.sent");

		let outcome = match self.timeout {
			Some(limit) => match tokio::time::timeout(limit, rx).await {
				Ok(outcome) => outcome,
				Err(_) => {
					self.pending.lock().outstanding.remove(&id);
					warn!(bridge = %self.label, %id, method, timeout_ms = limit.as_millis() as u64, "bridge.request.timeout");
					return Err(Error::Timeout {
						id,
						method: method.to_owned(),
						elapsed: limit,
					});
				}
			},
			None => rx.await,
		};
		outcome.unwrap_or(Err(Error::Cancelled))
	}

	/// Sends a typed notification.
	pub fn notify<N: Notification>(&self, params: N::Params) -> Result<()> {
		let notif = AnyNotification::new::<N>(&params)?;
		trace!(bridge = %self.label, method = N::METHOD, "bridge.notify");
		self.socket.post(Message::Notification(notif))
	}

	/// Answers an inbound request.
	pub fn respond(&self, id: RequestId, result: std::result::Result<JsonValue, ResponseError>) -> Result<()> {
		if let Err(e) = &result {
			debug!(bridge = %self.label, %id, error = %e, "bridge.respond.error");
		}
		self.socket.post(Message::Response(AnyResponse { id, result }))
	}

	/// Processes one inbound message.
	///
	/// Responses are consumed here. Requests and notifications are handed back to the caller.
	pub fn accept(&self, msg: Message) -> Option<Incoming> {
		match msg.split() {
			Inbound::Response(resp) => {
				self.resolve(resp);
				None
			}
			Inbound::Request(req) => Some(Incoming::Request(req)),
			Inbound::Notification(notif) => Some(Incoming::Notification(notif)),
		}
	}

	fn resolve(&self, resp: AnyResponse) {
		let entry = self.pending.lock().outstanding.remove(&resp.id);
		match (entry, resp.result) {
			(Some(pending), result) => {
				let latency_ms = pending.created_at.elapsed().as_millis() as u64;
				trace!(bridge = %self.label, id = %resp.id, method = %pending.method, latency_ms, "bridge.response");
				let _ = pending.tx.send(result.map_err(Error::Response));
			}
			(None, Ok(_)) => {
				debug!(bridge = %self.label, id = %resp.id, "bridge.response.unmatched");
			}
			(None, Err(err)) => {
				warn!(bridge = %self.label, id = %resp.id, error = %err, "bridge.error_response.unmatched");
				self.notifier.show_error(&err.message);
			}
		}
	}

	/// Fails every outstanding request with [`Error::Cancelled`].
	pub fn cancel_all(&self) -> usize {
		let drained: Vec<_> = self.pending.lock().outstanding.drain().collect();
		let count = drained.len();
		for (_, pending) in drained {
			let _ = pending.tx.send(Err(Error::Cancelled));
		}
		if count > 0 {
			debug!(bridge = %self.label, count, "bridge.pending.cancelled");
		}
		count
	}

	/// Fails requests older than `max_age` with [`Error::Timeout`].
	pub fn reap_expired(&self, max_age: Duration) -> usize {
		let now = Instant::now();
		let expired: Vec<_> = {
			let mut pending = self.pending.lock();
			let ids: Vec<RequestId> = pending
				.outstanding
				.iter()
				.filter(|(_, p)| now.duration_since(p.created_at) >= max_age)
				.map(|(id, _)| *id)
				.collect();
			ids.into_iter().filter_map(|id| pending.outstanding.remove(&id).map(|p| (id, p))).collect()
		};
		let count = expired.len();
		for (id, pending) in expired {
			let elapsed = now.duration_since(pending.created_at);
			warn!(bridge = %self.label, %id, method = %pending.method, "bridge.pending.expired");
			let _ = pending.tx.send(Err(Error::Timeout {
				id,
				method: pending.method,
				elapsed,
			}));
		}
		count
	}
}
