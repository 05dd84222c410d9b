//! Request/response bridge between a host and its viewers.
//!
//! Two sides exchange JSON envelopes over an ordered channel. Each envelope carries a
//! `type`, and optionally a `requestId`, a `body`, or an `error`:
//!
//! * requests carry a `requestId` and expect exactly one `response` or `errorResponse`
//! * responses are matched to the outstanding request with the same id
//! * everything else is a fire-and-forget notification
//!
//! This crate provides:
//! * [`Message`]: the envelope and its newline-delimited codec
//! * [`Request`] / [`Notification`]: typed method descriptors, with the concrete set in [`methods`]
//! * [`PeerSocket`]: the outgoing half of a channel
//! * [`Bridge`]: request correlation, timeouts, and cancellation over a socket

#![warn(missing_docs)]

pub mod bridge;
pub mod codec;
pub mod error;
pub mod message;
pub mod methods;
pub mod protocol;
pub mod socket;
pub mod types;

pub use bridge::{Bridge, Incoming, LogNotifier, UserNotifier};
pub use error::{Error, Result};
pub use message::Message;
pub use protocol::{CounterIdGen, Inbound, Notification, Request};
pub use socket::PeerSocket;
pub use types::{AnyNotification, AnyRequest, AnyResponse, RequestId, ResponseError};
