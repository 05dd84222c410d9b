//! Newline-delimited JSON framing for [`Message`]s over byte streams.

use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::message::Message;

impl Message {
	/// Reads the next message, skipping blank lines. `Ok(None)` at end of stream.
	///
	/// A malformed line is consumed and reported as an error; the stream stays usable.
	/// Lines that are not JSON fail with [`Error::Deserialize`], JSON that is not an
	/// envelope with [`Error::Protocol`].
	pub async fn read(input: &mut (impl AsyncBufRead + Unpin)) -> Result<Option<Self>> {
		let mut line = String::new();
		loop {
			line.clear();
			if input.read_line(&mut line).await? == 0 {
				return Ok(None);
			}
			let trimmed = line.trim();
			if trimmed.is_empty() {
				continue;
			}
			trace!(len = trimmed.len(), "bridge.codec.read");
			let value: JsonValue = serde_json::from_str(trimmed)?;
			return serde_json::from_value(value)
				.map(Some)
				.map_err(|e| Error::Protocol(e.to_string()));
		}
	}

	/// Writes the message as one line and flushes.
	pub async fn write(&self, output: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
		let mut buf = serde_json::to_vec(self)?;
		buf.push(b'\n');
		output.write_all(&buf).await?;
		output.flush().await?;
		Ok(())
	}
}

/// Drains outgoing messages into `output` until every sender is dropped.
pub async fn write_all(mut rx: mpsc::UnboundedReceiver<Message>, mut output: impl AsyncWrite + Unpin) -> Result<()> {
	while let Some(msg) = rx.recv().await {
		msg.write(&mut output).await?;
	}
	debug!("bridge.codec.drained");
	output.shutdown().await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tokio::io::BufReader;

	use super::*;
	use crate::methods::NotifyDirty;
	use crate::types::AnyNotification;

	#[tokio::test(flavor = "current_thread")]
	async fn reads_lines_and_skips_blanks() {
		let input = b"\n{\"type\":\"ready\"}\n\n{\"type\":\"response\",\"requestId\":1}\n";
		let mut reader = BufReader::new(&input[..]);

		let first = Message::read(&mut reader).await.unwrap().unwrap();
		assert_eq!(first.kind(), "ready");
		let second = Message::read(&mut reader).await.unwrap().unwrap();
		assert_eq!(second.kind(), "response");
		assert!(Message::read(&mut reader).await.unwrap().is_none());
	}

	#[tokio::test(flavor = "current_thread")]
	async fn malformed_line_does_not_poison_stream() {
		let input = b"{not json\n{\"type\":\"ready\"}\n";
		let mut reader = BufReader::new(&input[..]);

		assert!(matches!(Message::read(&mut reader).await, Err(Error::Deserialize(_))));
		assert_eq!(Message::read(&mut reader).await.unwrap().unwrap().kind(), "ready");
	}

	#[tokio::test(flavor = "current_thread")]
	async fn non_envelope_json_is_a_protocol_error() {
		let input = b"{\"type\":\"response\"}\n[1,2]\n{\"type\":\"ready\"}\n";
		let mut reader = BufReader::new(&input[..]);

		assert!(matches!(Message::read(&mut reader).await, Err(Error::Protocol(msg)) if msg.contains("without requestId")));
		assert!(matches!(Message::read(&mut reader).await, Err(Error::Protocol(_))));
		assert_eq!(Message::read(&mut reader).await.unwrap().unwrap().kind(), "ready");
	}

	#[tokio::test(flavor = "current_thread")]
	async fn write_all_frames_each_message() {
		let (tx, rx) = mpsc::unbounded_channel();
		let notif = AnyNotification::new::<NotifyDirty>(&()).unwrap();
		tx.send(Message::Notification(notif.clone())).unwrap();
		tx.send(Message::Notification(notif)).unwrap();
		drop(tx);

		let mut out = Vec::new();
		write_all(rx, &mut out).await.unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "{\"type\":\"notifyDirty\"}\n{\"type\":\"notifyDirty\"}\n");
	}
}
