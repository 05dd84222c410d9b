//! Host-side capabilities the run loop delegates IO to.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::HostError;

/// A file chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
	/// File name without directories.
	pub name: String,
	/// File contents.
	pub data: Vec<u8>,
}

/// Dialogs, downloads and device feedback provided by the embedding host.
///
/// Async methods run on host tasks, never on the run loop itself.
#[async_trait]
pub trait HostActions: Send + Sync + 'static {
	/// Asks the user for a line of text. `None` when dismissed.
	async fn prompt(&self, message: &str, default: &str) -> Option<String>;

	/// Hands `data` to the user as a file named `file_name`.
	async fn save_file(&self, file_name: &str, data: Vec<u8>) -> Result<(), HostError> {
		let _ = (file_name, data);
		Err(HostError::Unsupported("saving files"))
	}

	/// Lets the user choose a file of the given media type. `None` when dismissed.
	async fn pick_file(&self, accept: &str) -> Result<Option<PickedFile>, HostError> {
		let _ = accept;
		Err(HostError::Unsupported("opening files"))
	}

	/// Pulses haptic feedback. Returns `false` when unsupported.
	fn vibrate(&self, duration: Duration) -> bool {
		let _ = duration;
		false
	}

	/// Shows a blocking message to the user.
	fn alert(&self, message: &str);
}
