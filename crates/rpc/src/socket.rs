//! Outgoing half of a bridge channel.

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::message::Message;

/// Posts messages towards a peer.
///
/// Messages are delivered in posting order. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct PeerSocket {
	tx: mpsc::UnboundedSender<Message>,
}

impl PeerSocket {
	/// Creates a socket and the receiver the transport drains.
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}

	/// Wraps an existing sender.
	pub fn from_sender(tx: mpsc::UnboundedSender<Message>) -> Self {
		Self { tx }
	}

	/// Creates a socket whose every post fails with [`Error::ChannelClosed`].
	#[must_use]
	pub fn new_closed() -> Self {
		let (tx, _) = mpsc::unbounded_channel();
		Self { tx }
	}

	/// Posts a message.
	pub fn post(&self, msg: Message) -> Result<()> {
		self.tx.send(msg).map_err(|_| Error::ChannelClosed)
	}

	/// Returns true once the receiving side is gone.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}
