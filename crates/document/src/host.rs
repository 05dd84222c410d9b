//! Document host: the shell side of the viewer protocol.
//!
//! # Purpose
//!
//! - Own every open [`Document`] and the viewers attached to it.
//! - Decide which viewer's workspace is authoritative and persist it on save, save-as and backup.
//! - Keep viewers consistent: after a save the others receive the saved bytes; after a revert all of them do.
//! - Exclude the viewer side (engine adapter, dirty throttling, I/O dispatch); see `pixbridge_runtime`.
//!
//! # Mental model
//!
//! - A viewer is a [`Bridge`] over a [`PeerSocket`] plus a ready flag. Attaching allocates a [`ViewerId`] from a host-wide counter.
//! - The authoritative viewer is the oldest attached one (minimum [`ViewerId`]). Persistence asks it for its bytes with `getWorkspace`.
//! - The shell feeds every message a viewer sends into [`DocumentHost::handle_viewer_message`]. That call never awaits a
//!   viewer: anything that needs an answer (the initial push, input prompts) runs in a spawned task.
//! - Persistence operations await viewers and the file system. They are exclusive per document.
//!
//! ```text
//!  shell                 DocumentHost                 viewer (oldest)      viewer (other)
//!    │ save(doc)               │                            │                    │
//!    ├────────────────────────►├── getWorkspace ───────────►│                    │
//!    │                         │◄── bytes ──────────────────┤                    │
//!    │                         ├── fs.write(uri, bytes)     │                    │
//!    │                         ├── setWorkspace(bytes) ─────┼───────────────────►│
//!    │◄── Saved ───────────────┤                            │                    │
//! ```
//!
//! # Key types
//!
//! | Type | Meaning | Constraints | Constructed / mutated in |
//! |---|---|---|---|
//! | [`DocumentHost`] | Registry of open documents | MUST be the only owner of the URI map | `DocumentHost::open`, `DocumentHost::release` |
//! | [`Document`] | One open document | MUST hold the last authoritative bytes and the dirty flag | `Document::commit`, `Document::mark_dirty` |
//! | [`ViewerId`] | Viewer identity | MUST be unique per host and increase in attach order | `DocumentHost::attach_viewer` |
//! | [`Backup`] | Restorable copy of a document | Id MUST reopen the same bytes via [`DocumentHost::open`] | `DocumentHost::backup` |
//! | [`DocumentEvent`] | Shell-facing lifecycle events | `Changed` MUST name the reporting viewer | `DocumentHost::handle_viewer_message`, `DocumentHost::save` |
//!
//! # Invariants
//!
//! 1. The authoritative viewer MUST be the minimum [`ViewerId`] still attached.
//!    - Enforced in: `ViewerSet::first`
//!    - Tested by: `host::tests::persistence::save_asks_oldest_viewer`
//!    - Failure symptom: saves pick up a stale copy from a newer viewer that never received the edits.
//!
//! 2. Save MUST fail with [`DocumentError::NoViewer`] when no viewer is attached, and MUST NOT write anything.
//!    - Enforced in: `DocumentHost::authoritative_bytes`
//!    - Tested by: `host::tests::persistence::save_without_viewer_fails`
//!    - Failure symptom: an empty file overwrites the user's document.
//!
//! 3. After a save the other ready viewers MUST receive the saved bytes; the viewer they came from MUST NOT.
//!    - Enforced in: `DocumentHost::save`, `DocumentHost::broadcast`
//!    - Tested by: `host::tests::persistence::save_syncs_other_viewers`
//!    - Failure symptom: side-by-side views of one file drift apart after a save.
//!
//! 4. At most one save, revert or backup runs per document; a second fails with [`DocumentError::Busy`].
//!    - Enforced in: `Document::begin_persist`
//!    - Tested by: `host::tests::persistence::overlapping_persistence_is_busy`
//!    - Failure symptom: a revert lands between a save's fetch and write and the file ends up with pre-revert bytes.
//!
//! 5. A cancelled operation MUST NOT write.
//!    - Enforced in: `DocumentHost::write`
//!    - Tested by: `host::tests::persistence::cancelled_save_writes_nothing`
//!    - Failure symptom: a save the user backed out of still changes the file.
//!
//! 6. Message handling MUST NOT await a viewer.
//!    - Enforced in: `DocumentHost::handle_viewer_message`
//!    - Tested by: `host::tests::messages::ready_pushes_state_and_bytes`
//!    - Failure symptom: the loop reading a viewer's socket waits for a response only that same loop can deliver.
//!
//! 7. Detaching a viewer MUST fail its outstanding requests.
//!    - Enforced in: `DocumentHost::detach_viewer`, `DocumentHost::release`
//!    - Tested by: `host::tests::lifecycle::detach_cancels_pending`
//!    - Failure symptom: a save waiting on a closed viewer never returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use pixbridge_rpc::methods::{
	GetWorkspace, InputNumber, InputSize, NotifyDirty, NotifyInputNumber, NotifyInputSize, NumberInput, Ready, SetWorkspace, SizeInput, Update,
	ViewerState, WorkspaceBytes,
};
use pixbridge_rpc::{AnyNotification, Bridge, Incoming, Message, Notification, PeerSocket, ResponseError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::UNTITLED_SCHEME;
use crate::backup::Backup;
use crate::document::{Document, DocumentEvent, DocumentEventReceiver, DocumentEventSender, bridge_label};
use crate::error::{DocumentError, Result};
use crate::fs::FileSystem;
use crate::ui::{HostUi, UiNotifier};
use crate::viewer::ViewerId;


/// Prompt shown for a viewer's numeric input request.
pub const NUMBER_PROMPT: &str = "Please input a number";
/// Prompt shown for a viewer's size input request.
pub const SIZE_PROMPT: &str = "Please input a size (e.g. 32x32)";

/// Shell-side coordinator for documents and their viewers.
pub struct DocumentHost {
	fs: Arc<dyn FileSystem>,
	ui: Arc<dyn HostUi>,
	documents: Mutex<HashMap<Url, Arc<Document>>>,
	next_viewer: AtomicU64,
	next_untitled: AtomicU64,
	events: Option<DocumentEventSender>,
	request_timeout: Option<Duration>,
}

impl DocumentHost {
	/// Creates a host without an event stream.
	pub fn new(fs: Arc<dyn FileSystem>, ui: Arc<dyn HostUi>) -> Self {
		Self {
			fs,
			ui,
			documents: Mutex::new(HashMap::new()),
			next_viewer: AtomicU64::new(1),
			next_untitled: AtomicU64::new(1),
			events: None,
			request_timeout: None,
		}
	}

	/// Creates a host and the receiver for its [`DocumentEvent`]s.
	pub fn with_events(fs: Arc<dyn FileSystem>, ui: Arc<dyn HostUi>) -> (Self, DocumentEventReceiver) {
		let (tx, rx) = mpsc::unbounded_channel();
		let mut host = Self::new(fs, ui);
		host.events = Some(tx);
		(host, rx)
	}

	/// Bounds how long any request to a viewer may wait.
	pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.request_timeout = timeout;
		self
	}

	/// Opens `uri`, or returns the already-open document with one more reference.
	///
	/// With `backup_id` the bytes come from that backup. Untitled documents without a
	/// backup start empty. A new document is always clean.
	pub async fn open(&self, uri: Url, backup_id: Option<&str>) -> Result<Arc<Document>> {
		if let Some(doc) = self.documents.lock().get(&uri) {
			doc.retain();
			return Ok(Arc::clone(doc));
		}

		let source = match backup_id {
			Some(id) => Url::parse(id).map_err(|error| DocumentError::InvalidUri { uri: id.to_owned(), error })?,
			None => uri.clone(),
		};
		let data = if source.scheme() == UNTITLED_SCHEME {
			Vec::new()
		} else {
			self.fs.read(&source).await.map_err(|error| DocumentError::Io { uri: source.clone(), error })?
		};

		let mut documents = self.documents.lock();
		if let Some(doc) = documents.get(&uri) {
			doc.retain();
			return Ok(Arc::clone(doc));
		}
		let doc = Arc::new(Document::new(uri.clone(), data));
		documents.insert(uri.clone(), Arc::clone(&doc));
		info!(%uri, restored = backup_id.is_some(), "document.open");
		Ok(doc)
	}

	/// The open document for `uri`, if any.
	pub fn get(&self, uri: &Url) -> Option<Arc<Document>> {
		self.documents.lock().get(uri).cloned()
	}

	/// Drops one reference to `doc`. The last release disposes it, detaching every viewer.
	pub fn release(&self, doc: &Document) {
		if !doc.release() {
			return;
		}
		{
			let mut documents = self.documents.lock();
			if documents.get(doc.uri()).is_some_and(|open| std::ptr::eq(Arc::as_ptr(open), doc)) {
				documents.remove(doc.uri());
			}
		}
		for (id, bridge) in doc.detach_all() {
			let cancelled = bridge.cancel_all();
			debug!(uri = %doc.uri(), viewer = %id, cancelled, "document.viewer.detach");
		}
		info!(uri = %doc.uri(), "document.dispose");
		self.emit(DocumentEvent::Disposed { uri: doc.uri().clone() });
	}

	/// Attaches a viewer that talks over `socket`.
	pub fn attach_viewer(&self, doc: &Document, socket: PeerSocket) -> (ViewerId, Arc<Bridge>) {
		let id = ViewerId(self.next_viewer.fetch_add(1, Ordering::Relaxed));
		let notifier = Arc::new(UiNotifier(Arc::clone(&self.ui)));
		let bridge = Arc::new(Bridge::new(bridge_label(doc.uri(), id), socket, notifier).with_timeout(self.request_timeout));
		doc.attach(id, Arc::clone(&bridge));
		debug!(uri = %doc.uri(), viewer = %id, "document.viewer.attach");
		(id, bridge)
	}

	/// Detaches a viewer, failing its outstanding requests.
	pub fn detach_viewer(&self, doc: &Document, viewer: ViewerId) -> Result<()> {
		let bridge = doc.detach(viewer).ok_or(DocumentError::UnknownViewer(viewer))?;
		let cancelled = bridge.cancel_all();
		debug!(uri = %doc.uri(), %viewer, cancelled, "document.viewer.detach");
		Ok(())
	}

	/// Processes one message from `viewer`.
	///
	/// Never waits on a viewer; follow-up exchanges run on spawned tasks. Must be called
	/// from within a tokio runtime.
	pub fn handle_viewer_message(self: &Arc<Self>, doc: &Arc<Document>, viewer: ViewerId, msg: Message) -> Result<()> {
		let bridge = doc.bridge(viewer).ok_or(DocumentError::UnknownViewer(viewer))?;
		match bridge.accept(msg) {
			None => {}
			Some(Incoming::Request(request)) => {
				let error = ResponseError::new(format!("unsupported request type: {}", request.method));
				bridge.respond(request.id, Err(error))?;
			}
			Some(Incoming::Notification(notif)) => self.handle_notification(doc, viewer, bridge, notif),
		}
		Ok(())
	}

	fn handle_notification(self: &Arc<Self>, doc: &Arc<Document>, viewer: ViewerId, bridge: Arc<Bridge>, notif: AnyNotification) {
		match notif.method.as_str() {
			Ready::METHOD => {
				doc.mark_ready(viewer);
				let host = Arc::clone(self);
				let doc = Arc::clone(doc);
				tokio::spawn(async move { host.push_initial(&doc, viewer, &bridge).await });
			}
			NotifyDirty::METHOD => {
				doc.mark_dirty();
				self.emit(DocumentEvent::Changed { uri: doc.uri().clone(), viewer });
			}
			InputNumber::METHOD | InputSize::METHOD => {
				let numeric = notif.is::<InputNumber>();
				let prompt = match notif.params::<InputNumber>() {
					Ok(prompt) => prompt,
					Err(error) => {
						warn!(%viewer, method = %notif.method, %error, "document.input.malformed");
						return;
					}
				};
				let ui = Arc::clone(&self.ui);
				tokio::spawn(async move {
					let question = if numeric { NUMBER_PROMPT } else { SIZE_PROMPT };
					let Some(answer) = ui.input_box(question).await else {
						debug!(%viewer, id = prompt.input_id, "document.input.dismissed");
						return;
					};
					let id = prompt.input_id;
					let sent = if numeric {
						bridge.request::<NotifyInputNumber>(NumberInput { id, number: answer }).await
					} else {
						bridge.request::<NotifyInputSize>(SizeInput { id, size: answer }).await
					};
					if let Err(error) = sent {
						warn!(%viewer, id, %error, "document.input.undelivered");
					}
				});
			}
			other => debug!(%viewer, method = other, "document.notification.ignored"),
		}
	}

	/// Tells a freshly ready viewer what it shows, then sends it the document's bytes.
	///
	/// Untitled documents get no bytes; the viewer keeps the empty workspace it started with.
	async fn push_initial(&self, doc: &Document, viewer: ViewerId, bridge: &Bridge) {
		let state = ViewerState {
			untitled: doc.is_untitled(),
			editable: self.fs.is_writable(doc.uri()),
		};
		if let Err(error) = bridge.notify::<Update>(state) {
			warn!(%viewer, %error, "document.ready.update_failed");
			return;
		}
		if state.untitled {
			return;
		}
		if let Err(error) = bridge.request::<SetWorkspace>(WorkspaceBytes(doc.data())).await {
			warn!(%viewer, %error, "document.ready.push_failed");
		}
	}

	/// Fetches the current bytes from the authoritative viewer.
	pub async fn authoritative_bytes(&self, doc: &Document) -> Result<(ViewerId, Vec<u8>)> {
		let Some((viewer, bridge)) = doc.authoritative_viewer() else {
			return Err(DocumentError::NoViewer { uri: doc.uri().clone() });
		};
		let WorkspaceBytes(data) = bridge.request::<GetWorkspace>(()).await?;
		Ok((viewer, data))
	}

	/// Writes the authoritative bytes back to the document's own location.
	pub async fn save(&self, doc: &Document, cancel: &CancellationToken) -> Result<()> {
		let _guard = doc.begin_persist()?;
		if doc.is_untitled() {
			return Err(DocumentError::Untitled { uri: doc.uri().clone() });
		}
		let (origin, data) = self.authoritative_bytes(doc).await?;
		self.write(doc.uri(), &data, cancel).await?;
		doc.commit(data.clone(), true);
		info!(uri = %doc.uri(), bytes = data.len(), "document.save");
		self.broadcast(doc, data, Some(origin)).await;
		self.emit(DocumentEvent::Saved { uri: doc.uri().clone() });
		Ok(())
	}

	/// Writes the authoritative bytes to `destination`.
	///
	/// The document keeps its identity and stays dirty unless `destination` is its own location.
	pub async fn save_as(&self, doc: &Document, destination: &Url, cancel: &CancellationToken) -> Result<()> {
		let _guard = doc.begin_persist()?;
		let (origin, data) = self.authoritative_bytes(doc).await?;
		self.write(destination, &data, cancel).await?;
		doc.commit(data.clone(), destination == doc.uri());
		info!(uri = %doc.uri(), %destination, bytes = data.len(), "document.save_as");
		self.broadcast(doc, data, Some(origin)).await;
		self.emit(DocumentEvent::Saved { uri: destination.clone() });
		Ok(())
	}

	/// Writes a restorable copy of the authoritative bytes to `destination`.
	pub async fn backup(&self, doc: &Document, destination: Url, cancel: &CancellationToken) -> Result<Backup> {
		let _guard = doc.begin_persist()?;
		let (_, data) = self.authoritative_bytes(doc).await?;
		self.write(&destination, &data, cancel).await?;
		debug!(uri = %doc.uri(), %destination, bytes = data.len(), "document.backup");
		Ok(Backup::new(destination, Arc::clone(&self.fs)))
	}

	/// Reloads the document from its location and pushes the bytes to every ready viewer.
	pub async fn revert(&self, doc: &Document, cancel: &CancellationToken) -> Result<()> {
		let _guard = doc.begin_persist()?;
		let data = if doc.is_untitled() {
			Vec::new()
		} else {
			self.fs.read(doc.uri()).await.map_err(|error| DocumentError::Io { uri: doc.uri().clone(), error })?
		};
		if cancel.is_cancelled() {
			return Err(DocumentError::Cancelled);
		}
		doc.commit(data.clone(), true);
		info!(uri = %doc.uri(), bytes = data.len(), "document.revert");
		self.broadcast(doc, data, None).await;
		self.emit(DocumentEvent::Reverted { uri: doc.uri().clone() });
		Ok(())
	}

	/// Allocates a fresh untitled URI inside `folder`.
	pub fn new_untitled_uri(&self, folder: Option<&Url>) -> Result<Url> {
		let Some(folder) = folder else {
			let err = DocumentError::NoWorkspaceFolder;
			self.ui.show_error(&err.to_string());
			return Err(err);
		};
		let n = self.next_untitled.fetch_add(1, Ordering::Relaxed);
		let uri = format!("{UNTITLED_SCHEME}:{}/new-{n}.png", folder.path().trim_end_matches('/'));
		Url::parse(&uri).map_err(|error| DocumentError::InvalidUri { uri, error })
	}

	async fn write(&self, uri: &Url, data: &[u8], cancel: &CancellationToken) -> Result<()> {
		if cancel.is_cancelled() {
			return Err(DocumentError::Cancelled);
		}
		self.fs.write(uri, data).await.map_err(|error| DocumentError::Io { uri: uri.clone(), error })
	}

	async fn broadcast(&self, doc: &Document, data: Vec<u8>, except: Option<ViewerId>) {
		let targets = doc.ready_viewers_except(except);
		if targets.is_empty() {
			return;
		}
		let payload = WorkspaceBytes(data);
		let sends = targets.iter().map(|(id, bridge)| {
			let payload = payload.clone();
			async move { (*id, bridge.request::<SetWorkspace>(payload).await) }
		});
		for (viewer, result) in futures::future::join_all(sends).await {
			if let Err(error) = result {
				warn!(uri = %doc.uri(), %viewer, %error, "document.broadcast.failed");
			}
		}
	}

	fn emit(&self, event: DocumentEvent) {
		if let Some(tx) = &self.events {
			let _ = tx.send(event);
		}
	}
}
