use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pixbridge_rpc::methods::{GetWorkspace, Ready, SetWorkspace, WorkspaceBytes};
use pixbridge_rpc::{AnyNotification, AnyRequest, AnyResponse, Message, Notification, PeerSocket, Request, RequestId, ResponseError};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use url::Url;

use crate::document::{Document, DocumentEvent, DocumentEventReceiver};
use crate::fs::FileSystem;
use crate::host::DocumentHost;
use crate::ui::HostUi;
use crate::viewer::ViewerId;

pub(super) fn uri(s: &str) -> Url {
	Url::parse(s).unwrap()
}

/// Lets every spawned task run until it blocks.
pub(super) async fn settle() {
	tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Default)]
pub(super) struct MemoryFs {
	files: Mutex<HashMap<Url, Vec<u8>>>,
	pub reads: Mutex<Vec<Url>>,
	pub writes: Mutex<Vec<Url>>,
}

impl MemoryFs {
	pub fn put(&self, at: &str, data: &[u8]) {
		self.files.lock().insert(uri(at), data.to_vec());
	}

	pub fn file(&self, at: &str) -> Option<Vec<u8>> {
		self.files.lock().get(&uri(at)).cloned()
	}
}

#[async_trait]
impl FileSystem for MemoryFs {
	async fn read(&self, uri: &Url) -> io::Result<Vec<u8>> {
		self.reads.lock().push(uri.clone());
		self.files.lock().get(uri).cloned().ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
	}

	async fn write(&self, uri: &Url, data: &[u8]) -> io::Result<()> {
		self.writes.lock().push(uri.clone());
		self.files.lock().insert(uri.clone(), data.to_vec());
		Ok(())
	}

	async fn delete(&self, uri: &Url) -> io::Result<()> {
		self.files.lock().remove(uri).map(drop).ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
	}

	fn is_writable(&self, uri: &Url) -> bool {
		uri.scheme() == "file"
	}
}

#[derive(Default)]
pub(super) struct ScriptedUi {
	answers: Mutex<VecDeque<Option<String>>>,
	pub prompts: Mutex<Vec<String>>,
	pub errors: Mutex<Vec<String>>,
}

impl ScriptedUi {
	pub fn answer(&self, answer: Option<&str>) {
		self.answers.lock().push_back(answer.map(str::to_owned));
	}
}

#[async_trait]
impl HostUi for ScriptedUi {
	async fn input_box(&self, prompt: &str) -> Option<String> {
		self.prompts.lock().push(prompt.to_owned());
		self.answers.lock().pop_front().flatten()
	}

	fn show_error(&self, message: &str) {
		self.errors.lock().push(message.to_owned());
	}
}

pub(super) struct Fixture {
	pub host: Arc<DocumentHost>,
	pub fs: Arc<MemoryFs>,
	pub ui: Arc<ScriptedUi>,
	events: DocumentEventReceiver,
}

pub(super) fn fixture() -> Fixture {
	let fs = Arc::new(MemoryFs::default());
	let ui = Arc::new(ScriptedUi::default());
	let (host, events) = DocumentHost::with_events(fs.clone(), ui.clone());
	Fixture {
		host: Arc::new(host),
		fs,
		ui,
		events,
	}
}

impl Fixture {
	pub async fn open(&self, at: &str) -> Arc<Document> {
		self.host.open(uri(at), None).await.unwrap()
	}

	pub fn viewer(&self, doc: &Arc<Document>) -> TestViewer {
		TestViewer::attach(&self.host, doc)
	}

	/// Attaches a viewer, completes its ready handshake, then gives it `workspace`.
	pub async fn ready_viewer(&self, doc: &Arc<Document>, workspace: &[u8]) -> ServedViewer {
		let viewer = self.viewer(doc);
		viewer.notify::<Ready>(());
		let served = viewer.serve();
		settle().await;
		served.state.lock().workspace = workspace.to_vec();
		served
	}

	pub fn events(&mut self) -> Vec<DocumentEvent> {
		let mut out = Vec::new();
		while let Ok(event) = self.events.try_recv() {
			out.push(event);
		}
		out
	}
}

/// The viewer end of a bridge, driven by hand.
pub(super) struct TestViewer {
	pub id: ViewerId,
	host: Arc<DocumentHost>,
	doc: Arc<Document>,
	rx: mpsc::UnboundedReceiver<Message>,
}

impl TestViewer {
	fn attach(host: &Arc<DocumentHost>, doc: &Arc<Document>) -> Self {
		let (socket, rx) = PeerSocket::channel();
		let (id, _) = host.attach_viewer(doc, socket);
		Self {
			id,
			host: Arc::clone(host),
			doc: Arc::clone(doc),
			rx,
		}
	}

	pub fn send(&self, msg: Message) {
		self.host.handle_viewer_message(&self.doc, self.id, msg).unwrap();
	}

	pub fn notify<N: Notification>(&self, params: N::Params) {
		self.send(Message::Notification(AnyNotification::new::<N>(&params).unwrap()));
	}

	pub fn request<R: Request>(&self, id: u64, params: &R::Params) {
		self.send(Message::Request(AnyRequest::new::<R>(RequestId(id), params).unwrap()));
	}

	pub fn reply(&self, id: RequestId, result: Result<JsonValue, ResponseError>) {
		self.send(Message::Response(AnyResponse { id, result }));
	}

	pub async fn recv(&mut self) -> Message {
		match tokio::time::timeout(Duration::from_secs(5), self.rx.recv()).await {
			Ok(Some(msg)) => msg,
			Ok(None) => panic!("{} closed", self.id),
			Err(_) => panic!("{} received nothing", self.id),
		}
	}

	pub async fn recv_request(&mut self) -> AnyRequest {
		match self.recv().await {
			Message::Request(req) => req,
			other => panic!("expected request, got {other:?}"),
		}
	}

	pub async fn recv_notification(&mut self) -> AnyNotification {
		match self.recv().await {
			Message::Notification(notif) => notif,
			other => panic!("expected notification, got {other:?}"),
		}
	}

	pub async fn recv_response(&mut self) -> AnyResponse {
		match self.recv().await {
			Message::Response(resp) => resp,
			other => panic!("expected response, got {other:?}"),
		}
	}

	pub async fn assert_silent(&mut self) {
		if let Ok(msg) = tokio::time::timeout(Duration::from_millis(100), self.rx.recv()).await {
			panic!("unexpected message {msg:?}");
		}
	}

	/// Hands the viewer to a task that answers workspace requests from its own state.
	pub fn serve(self) -> ServedViewer {
		let state = Arc::new(Mutex::new(ServedState::default()));
		let served = ServedViewer {
			id: self.id,
			state: Arc::clone(&state),
		};
		let Self { id, host, doc, mut rx } = self;
		tokio::spawn(async move {
			while let Some(msg) = rx.recv().await {
				let Message::Request(req) = msg else {
					continue;
				};
				let result = {
					let mut state = state.lock();
					state.requests.push(req.method.clone());
					match req.method.as_str() {
						GetWorkspace::METHOD => serde_json::to_value(WorkspaceBytes(state.workspace.clone())).unwrap(),
						SetWorkspace::METHOD => {
							state.workspace = req.params::<SetWorkspace>().unwrap().0;
							let pushed = state.workspace.clone();
							state.pushes.push(pushed);
							JsonValue::Null
						}
						_ => JsonValue::Null,
					}
				};
				let response = Message::Response(AnyResponse { id: req.id, result: Ok(result) });
				if host.handle_viewer_message(&doc, id, response).is_err() {
					break;
				}
			}
		});
		served
	}
}

#[derive(Default)]
pub(super) struct ServedState {
	pub workspace: Vec<u8>,
	pub requests: Vec<String>,
	/// Bytes of every `setWorkspace` received, in order.
	pub pushes: Vec<Vec<u8>>,
}

pub(super) struct ServedViewer {
	pub id: ViewerId,
	pub state: Arc<Mutex<ServedState>>,
}

impl ServedViewer {
	pub fn workspace(&self) -> Vec<u8> {
		self.state.lock().workspace.clone()
	}

	pub fn requests(&self) -> Vec<String> {
		self.state.lock().requests.clone()
	}

	pub fn pushes(&self) -> Vec<Vec<u8>> {
		self.state.lock().pushes.clone()
	}
}
