//! One document hosted for one viewer over a byte stream.
//!
//! ```text
//!  input ──► reader task ──► inbound ─┐
//!                                     ├─► select! ──► DocumentHost::handle_viewer_message
//!  DocumentEvent ─────────────────────┤               (autosave spawns DocumentHost::save)
//!  shutdown ──────────────────────────┘
//!  PeerSocket ──► writer task ──► output
//! ```
//!
//! # Invariants
//!
//! - Inbound messages keep flowing while a save or backup waits on the viewer; the
//!   viewer's answer arrives on the same stream.
//! - An autosave requested while another save runs is deferred, not dropped.
//! - On exit a dirty document is backed up within the hot-exit deadline, or not at all.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pixbridge_document::{Document, DocumentError, DocumentEvent, DocumentEventReceiver, DocumentHost, ViewerId};
use pixbridge_rpc::{Message, PeerSocket, codec};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;


/// How long the writer may take to flush after the session ends.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Session behaviour.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// Save on every dirty notification.
	pub autosave: bool,
	/// Directory for hot-exit backups.
	pub backup_dir: PathBuf,
	/// Deadline for finishing saves and the backup at exit.
	pub hot_exit_timeout: Duration,
}

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
	/// The input stream ended.
	ViewerClosed,
	/// Shutdown was requested.
	Shutdown,
}

/// Outcome of [`Session::run`].
#[derive(Debug)]
pub struct Exit {
	/// Why the session ended.
	pub reason: ExitReason,
	/// Id of the hot-exit backup, if one was written.
	pub backup: Option<String>,
}

type SaveResult = Result<pixbridge_document::Result<()>, JoinError>;

/// A document served to a single viewer.
pub struct Session {
	host: Arc<DocumentHost>,
	doc: Arc<Document>,
	events: DocumentEventReceiver,
	options: SessionOptions,
	saves: JoinSet<pixbridge_document::Result<()>>,
	resave: bool,
}

impl Session {
	/// Serves `doc`, which must be open in `host`; `events` is `host`'s event stream.
	pub fn new(host: Arc<DocumentHost>, doc: Arc<Document>, events: DocumentEventReceiver, options: SessionOptions) -> Self {
		Self {
			host,
			doc,
			events,
			options,
			saves: JoinSet::new(),
			resave: false,
		}
	}

	/// Runs until `input` ends or `shutdown` fires, then releases the document.
	pub async fn run<R, W>(mut self, input: R, output: W, shutdown: CancellationToken) -> Exit
	where
		R: AsyncRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		let (socket, outbound) = PeerSocket::channel();
		let (viewer, _) = self.host.attach_viewer(&self.doc, socket);
		let writer = tokio::spawn(codec::write_all(outbound, output));
		let mut inbound = spawn_reader(input);

		let reason = loop {
			tokio::select! {
				biased;
				() = shutdown.cancelled() => break ExitReason::Shutdown,
				Some(done) = self.saves.join_next(), if !self.saves.is_empty() => self.finish_save(done),
				msg = inbound.recv() => match msg {
					Some(msg) => self.deliver(viewer, msg),
					None => break ExitReason::ViewerClosed,
				},
				Some(event) = self.events.recv() => self.on_event(event),
			}
		};
		info!(?reason, dirty = self.doc.is_dirty(), "host.session.exit");

		let backup = self.hot_exit(viewer, &mut inbound).await;
		self.saves.abort_all();
		self.host.release(&self.doc);
		drop(inbound);
		if tokio::time::timeout(WRITER_DRAIN, writer).await.is_err() {
			debug!("host.writer.abandoned");
		}
		Exit { reason, backup }
	}

	fn deliver(&self, viewer: ViewerId, msg: Message) {
		if let Err(error) = self.host.handle_viewer_message(&self.doc, viewer, msg) {
			warn!(%viewer, %error, "host.viewer.message_failed");
		}
	}

	fn on_event(&mut self, event: DocumentEvent) {
		match event {
			DocumentEvent::Changed { .. } if self.options.autosave => self.autosave(),
			event => debug!(?event, "host.document.event"),
		}
	}

	fn autosave(&mut self) {
		if !self.saves.is_empty() {
			self.resave = true;
			return;
		}
		let host = Arc::clone(&self.host);
		let doc = Arc::clone(&self.doc);
		self.saves.spawn(async move { host.save(&doc, &CancellationToken::new()).await });
	}

	fn finish_save(&mut self, done: SaveResult) {
		log_save(done);
		if std::mem::take(&mut self.resave) {
			self.autosave();
		}
	}

	/// Finishes running saves, then backs a dirty document up, all within the hot-exit deadline.
	async fn hot_exit(&mut self, viewer: ViewerId, inbound: &mut mpsc::UnboundedReceiver<Message>) -> Option<String> {
		let deadline = tokio::time::sleep(self.options.hot_exit_timeout);
		tokio::pin!(deadline);

		let mut saves = std::mem::take(&mut self.saves);
		let drained = async {
			while let Some(done) = saves.join_next().await {
				log_save(done);
			}
		};
		if self.pump(viewer, inbound, drained, deadline.as_mut()).await.is_none() {
			warn!("host.hot_exit.saves_timed_out");
		}
		if !self.doc.is_dirty() {
			return None;
		}

		let Some(destination) = backup_location(&self.options.backup_dir, self.doc.uri()) else {
			warn!(dir = %self.options.backup_dir.display(), "host.hot_exit.bad_dir");
			return None;
		};
		let cancel = CancellationToken::new();
		let backup = self.host.backup(&self.doc, destination, &cancel);
		match self.pump(viewer, inbound, backup, deadline.as_mut()).await {
			Some(Ok(backup)) => {
				info!(id = backup.id(), "host.hot_exit.backup");
				Some(backup.id().to_owned())
			}
			Some(Err(error)) => {
				warn!(%error, "host.hot_exit.failed");
				None
			}
			None => {
				warn!(timeout_ms = self.options.hot_exit_timeout.as_millis() as u64, "host.hot_exit.timeout");
				None
			}
		}
	}

	/// Drives `fut` while still delivering viewer messages. `None` if `deadline` fires first.
	async fn pump<F: Future>(
		&self,
		viewer: ViewerId,
		inbound: &mut mpsc::UnboundedReceiver<Message>,
		fut: F,
		mut deadline: Pin<&mut Sleep>,
	) -> Option<F::Output> {
		tokio::pin!(fut);
		loop {
			tokio::select! {
				biased;
				out = &mut fut => return Some(out),
				Some(msg) = inbound.recv() => self.deliver(viewer, msg),
				() = &mut deadline => return None,
			}
		}
	}
}

fn log_save(done: SaveResult) {
	match done {
		Ok(Ok(())) => info!("host.autosave"),
		Ok(Err(DocumentError::Busy { .. })) => debug!("host.autosave.busy"),
		Ok(Err(error)) => warn!(%error, "host.autosave.failed"),
		Err(error) if error.is_cancelled() => {}
		Err(error) => warn!(%error, "host.autosave.panicked"),
	}
}

/// Reads messages off `input` on their own task; the channel closes at end of stream.
fn spawn_reader<R: AsyncRead + Unpin + Send + 'static>(input: R) -> mpsc::UnboundedReceiver<Message> {
	let (tx, rx) = mpsc::unbounded_channel();
	tokio::spawn(async move {
		let mut input = BufReader::new(input);
		loop {
			match Message::read(&mut input).await {
				Ok(Some(msg)) => {
					if tx.send(msg).is_err() {
						break;
					}
				}
				Ok(None) => break,
				Err(pixbridge_rpc::Error::Io(error)) => {
					warn!(%error, "host.input.failed");
					break;
				}
				Err(error) => warn!(%error, "host.input.malformed"),
			}
		}
		debug!("host.input.closed");
	});
	rx
}

/// `<dir>/<stem>-<unix millis>.png`.
fn backup_location(dir: &Path, uri: &Url) -> Option<Url> {
	let name = uri.path_segments().and_then(|mut s| s.next_back()).unwrap_or_default();
	let stem = pixbridge_runtime::naming::workspace_stem(name);
	let stem = if stem.is_empty() { "untitled" } else { stem };
	let millis = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
	let dir = std::path::absolute(dir).ok()?;
	Url::from_file_path(dir.join(format!("{stem}-{millis}.png"))).ok()
}
