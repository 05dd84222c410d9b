//! Per-document state.

use std::sync::Arc;

use parking_lot::Mutex;
use pixbridge_rpc::Bridge;
use tokio::sync::{MutexGuard, mpsc};
use url::Url;

use crate::UNTITLED_SCHEME;
use crate::error::{DocumentError, Result};
use crate::viewer::{ViewerId, ViewerSet};

/// Lifecycle events observed by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
	/// A viewer reported edits the shell has not persisted.
	Changed {
		/// The document.
		uri: Url,
		/// The viewer that reported the edit.
		viewer: ViewerId,
	},
	/// The document was written to `uri`.
	Saved {
		/// Where the bytes went.
		uri: Url,
	},
	/// The document was reloaded from disk.
	Reverted {
		/// The document.
		uri: Url,
	},
	/// The last reference was released.
	Disposed {
		/// The document.
		uri: Url,
	},
}

/// Sender half of the document event channel.
pub type DocumentEventSender = mpsc::UnboundedSender<DocumentEvent>;
/// Receiver half of the document event channel.
pub type DocumentEventReceiver = mpsc::UnboundedReceiver<DocumentEvent>;

struct DocumentState {
	data: Vec<u8>,
	dirty: bool,
	refs: usize,
	viewers: ViewerSet,
}

/// One open document.
pub struct Document {
	uri: Url,
	state: Mutex<DocumentState>,
	persist: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Document {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("Document")
			.field("uri", &self.uri.as_str())
			.field("bytes", &state.data.len())
			.field("dirty", &state.dirty)
			.field("viewers", &state.viewers.ids())
			.finish()
	}
}

impl Document {
	pub(crate) fn new(uri: Url, data: Vec<u8>) -> Self {
		Self {
			uri,
			state: Mutex::new(DocumentState {
				data,
				dirty: false,
				refs: 1,
				viewers: ViewerSet::default(),
			}),
			persist: tokio::sync::Mutex::new(()),
		}
	}

	/// Identity of the document.
	pub fn uri(&self) -> &Url {
		&self.uri
	}

	/// Whether the document has no backing file.
	pub fn is_untitled(&self) -> bool {
		self.uri.scheme() == UNTITLED_SCHEME
	}

	/// Whether a viewer reported edits since the last save or revert.
	pub fn is_dirty(&self) -> bool {
		self.state.lock().dirty
	}

	/// Last bytes the host knows to be authoritative.
	pub fn data(&self) -> Vec<u8> {
		self.state.lock().data.clone()
	}

	/// Attached viewers in attach order.
	pub fn viewer_ids(&self) -> Vec<ViewerId> {
		self.state.lock().viewers.ids()
	}

	pub(crate) fn retain(&self) {
		self.state.lock().refs += 1;
	}

	/// Drops one reference. Returns true only for the release that drops the last one.
	pub(crate) fn release(&self) -> bool {
		let mut state = self.state.lock();
		if state.refs == 0 {
			return false;
		}
		state.refs -= 1;
		state.refs == 0
	}

	pub(crate) fn attach(&self, id: ViewerId, bridge: Arc<Bridge>) {
		self.state.lock().viewers.insert(id, bridge);
	}

	pub(crate) fn detach(&self, id: ViewerId) -> Option<Arc<Bridge>> {
		self.state.lock().viewers.remove(id).map(|v| v.bridge)
	}

	pub(crate) fn detach_all(&self) -> Vec<(ViewerId, Arc<Bridge>)> {
		self.state.lock().viewers.drain().into_iter().map(|(id, v)| (id, v.bridge)).collect()
	}

	pub(crate) fn bridge(&self, id: ViewerId) -> Option<Arc<Bridge>> {
		self.state.lock().viewers.bridge(id)
	}

	pub(crate) fn mark_ready(&self, id: ViewerId) -> bool {
		self.state.lock().viewers.mark_ready(id)
	}

	pub(crate) fn authoritative_viewer(&self) -> Option<(ViewerId, Arc<Bridge>)> {
		self.state.lock().viewers.first()
	}

	pub(crate) fn ready_viewers_except(&self, except: Option<ViewerId>) -> Vec<(ViewerId, Arc<Bridge>)> {
		self.state.lock().viewers.ready_except(except)
	}

	pub(crate) fn mark_dirty(&self) {
		self.state.lock().dirty = true;
	}

	/// Records `data` as authoritative, clearing the dirty flag when `clean`.
	pub(crate) fn commit(&self, data: Vec<u8>, clean: bool) {
		let mut state = self.state.lock();
		state.data = data;
		if clean {
			state.dirty = false;
		}
	}

	/// Claims the document for one save, revert or backup.
	pub(crate) fn begin_persist(&self) -> Result<MutexGuard<'_, ()>> {
		self.persist.try_lock().map_err(|_| DocumentError::Busy { uri: self.uri.clone() })
	}
}

/// Builds a bridge label for logs.
pub(crate) fn bridge_label(uri: &Url, id: ViewerId) -> String {
	format!("{id}@{}", uri.path().rsplit('/').next().unwrap_or_default())
}

