//! Hot-exit backups.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::fs::FileSystem;

/// A copy of a document's bytes written somewhere the shell can reopen it from.
///
/// The id is the location as a string; passing it back to
/// [`DocumentHost::open`](crate::DocumentHost::open) restores the document.
pub struct Backup {
	location: Url,
	fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for Backup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Backup").field("location", &self.location.as_str()).finish()
	}
}

impl Backup {
	pub(crate) fn new(location: Url, fs: Arc<dyn FileSystem>) -> Self {
		Self { location, fs }
	}

	/// Opaque id for restoring.
	pub fn id(&self) -> &str {
		self.location.as_str()
	}

	/// Where the bytes were written.
	pub fn location(&self) -> &Url {
		&self.location
	}

	/// Removes the backup. Failures are logged and otherwise ignored.
	pub async fn delete(self) {
		if let Err(error) = self.fs.delete(&self.location).await {
			debug!(location = %self.location, %error, "document.backup.delete_failed");
		}
	}
}
