use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pixbridge_engine::names;
use pixbridge_engine::testing::{FakeEngine, FakeEvent, FakeState, FakeSurface, SurfaceDriver};
use pixbridge_engine::{PointerEvent, PointerEventKind, PointerType, Size};
use pixbridge_rpc::{AnyNotification, AnyResponse, LogNotifier, Notification, PeerSocket, RequestId};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

#[derive(Default)]
struct ScriptedHost {
	answers: Mutex<VecDeque<Option<String>>>,
	picks: Mutex<VecDeque<PickedFile>>,
	prompts: Mutex<Vec<(String, String)>>,
	saved: Mutex<Vec<(String, Vec<u8>)>>,
	alerts: Mutex<Vec<String>>,
	vibrations: Mutex<Vec<Duration>>,
}

impl ScriptedHost {
	fn answering(answers: &[&str]) -> Self {
		let host = Self::default();
		host.answers.lock().extend(answers.iter().map(|a| Some((*a).to_owned())));
		host
	}

	fn picking(self, name: &str, data: &[u8]) -> Self {
		self.picks.lock().push_back(PickedFile {
			name: name.to_owned(),
			data: data.to_vec(),
		});
		self
	}
}

#[async_trait]
impl HostActions for ScriptedHost {
	async fn prompt(&self, message: &str, default: &str) -> Option<String> {
		self.prompts.lock().push((message.to_owned(), default.to_owned()));
		self.answers.lock().pop_front().flatten()
	}

	async fn save_file(&self, file_name: &str, data: Vec<u8>) -> std::result::Result<(), HostError> {
		self.saved.lock().push((file_name.to_owned(), data));
		Ok(())
	}

	async fn pick_file(&self, _accept: &str) -> std::result::Result<Option<PickedFile>, HostError> {
		Ok(self.picks.lock().pop_front())
	}

	fn vibrate(&self, duration: Duration) -> bool {
		self.vibrations.lock().push(duration);
		true
	}

	fn alert(&self, message: &str) {
		self.alerts.lock().push(message.to_owned());
	}
}

/// The shell end of the bridge, as seen by a test.
struct Shell {
	tx: mpsc::UnboundedSender<Message>,
	rx: mpsc::UnboundedReceiver<Message>,
}

impl Shell {
	async fn recv(&mut self) -> Message {
		match self.rx.recv().await {
			Some(msg) => msg,
			None => panic!("bridge closed"),
		}
	}

	async fn recv_notification(&mut self) -> AnyNotification {
		match self.recv().await {
			Message::Notification(notif) => notif,
			other => panic!("expected notification, got {other:?}"),
		}
	}

	async fn recv_response(&mut self) -> AnyResponse {
		match self.recv().await {
			Message::Response(resp) => resp,
			other => panic!("expected response, got {other:?}"),
		}
	}

	async fn assert_silent_for(&mut self, window: Duration) {
		if let Ok(msg) = tokio::time::timeout(window, self.rx.recv()).await {
			panic!("unexpected message {msg:?}");
		}
	}

	fn request<R: Request>(&self, id: u64, params: &R::Params) {
		let req = AnyRequest::new::<R>(RequestId(id), params).unwrap();
		self.tx.send(Message::Request(req)).unwrap();
	}
}

struct Harness {
	run_loop: RunLoop<FakeEngine, FakeSurface, ScriptedHost>,
	driver: SurfaceDriver,
	engine: Arc<Mutex<FakeState>>,
	host: Arc<ScriptedHost>,
	shell: Shell,
}

fn harness(config: HostConfig, host: ScriptedHost) -> Harness {
	let (surface, driver) = FakeSurface::new(Size::new(100, 100));
	let fake = FakeEngine::new();
	let engine = fake.state();
	let adapter = EngineAdapter::load(fake, surface, LoadOptions::default()).unwrap();

	let (socket, outbound) = PeerSocket::channel();
	let (inbound_tx, inbound) = mpsc::unbounded_channel();
	let bridge = Arc::new(Bridge::new("engine", socket, Arc::new(LogNotifier)));
	let host = Arc::new(host);
	let run_loop = RunLoop::new(adapter, host.clone(), bridge, inbound, config).unwrap();

	Harness {
		run_loop,
		driver,
		engine,
		host,
		shell: Shell { tx: inbound_tx, rx: outbound },
	}
}

fn dirty_config() -> HostConfig {
	HostConfig {
		enable_dirty_notification: true,
		..HostConfig::default()
	}
}

/// Runs the loop alongside `script`; the surface closes once the script returns.
async fn drive<F, Fut>(harness: Harness, script: F) -> StopReason
where
	F: FnOnce(SurfaceDriver, Shell) -> Fut,
	Fut: Future<Output = ()>,
{
	let Harness {
		run_loop, driver, shell, ..
	} = harness;
	let (reason, ()) = tokio::join!(run_loop.run(), script(driver, shell));
	reason
}

async fn until(mut cond: impl FnMut() -> bool) {
	for _ in 0..200 {
		if cond() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	panic!("condition never held");
}

async fn settle() {
	tokio::time::sleep(Duration::from_millis(1)).await;
}

fn is<N: Notification>(notif: &AnyNotification) -> bool {
	notif.is::<N>()
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn ready_is_posted_before_any_event() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	let reason = drive(h, |driver, mut shell| async move {
		driver.engine(FakeEvent::Tick);
		let first = shell.recv_notification().await;
		assert!(is::<Ready>(&first));
	})
	.await;
	assert_eq!(reason, StopReason::SurfaceClosed);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn engine_stop_ends_loop() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	let engine = h.engine.clone();
	let reason = drive(h, |driver, _shell| async move {
		driver.engine(FakeEvent::Fail);
		driver.engine(FakeEvent::Edit);
		driver.engine(FakeEvent::Stop);
		driver.engine(FakeEvent::Edit);
	})
	.await;
	assert_eq!(reason, StopReason::EngineStopped);
	assert_eq!(engine.lock().version, 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn malformed_io_request_is_skipped() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	let host = h.host.clone();
	let vibrations = h.host.clone();
	let reason = drive(h, |driver, mut shell| async move {
		shell.recv_notification().await;
		driver.engine(FakeEvent::RawIo(b"{\"inputNumber\":".to_vec()));
		driver.engine(FakeEvent::RawIo(b"\"reticulate\"".to_vec()));
		driver.engine(FakeEvent::Io(IoRequest::Vibrate));
		until(|| vibrations.vibrations.lock().len() == 1).await;
		shell.assert_silent_for(Duration::from_millis(100)).await;
	})
	.await;
	assert_eq!(reason, StopReason::SurfaceClosed);
	assert!(host.alerts.lock().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn burst_of_edits_yields_one_notification_within_window() {
	let h = harness(dirty_config(), ScriptedHost::default());
	drive(h, |driver, mut shell| async move {
		assert!(is::<Ready>(&shell.recv_notification().await));
		let start = Instant::now();
		for _ in 0..5 {
			driver.engine(FakeEvent::Edit);
			tokio::time::sleep(Duration::from_millis(150)).await;
		}

		let notif = shell.recv_notification().await;
		assert!(is::<NotifyDirty>(&notif));
		assert!(start.elapsed() <= Duration::from_millis(1005));
		shell.assert_silent_for(Duration::from_secs(5)).await;
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn no_notification_without_changes() {
	let h = harness(dirty_config(), ScriptedHost::default());
	drive(h, |driver, mut shell| async move {
		shell.recv_notification().await;
		driver.engine(FakeEvent::Tick);
		driver.engine(FakeEvent::Tick);
		shell.assert_silent_for(Duration::from_secs(3)).await;
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dirty_tracking_is_off_by_default() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	drive(h, |driver, mut shell| async move {
		shell.recv_notification().await;
		driver.engine(FakeEvent::Edit);
		shell.assert_silent_for(Duration::from_secs(3)).await;
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn get_workspace_flushes_pending_window() {
	let h = harness(dirty_config(), ScriptedHost::default());
	drive(h, |driver, mut shell| async move {
		shell.recv_notification().await;
		driver.engine(FakeEvent::Edit);
		settle().await;

		shell.request::<GetWorkspace>(1, &());
		let resp = shell.recv_response().await;
		assert_eq!(resp.id, RequestId(1));
		let body: WorkspaceBytes = serde_json::from_value(resp.result.unwrap()).unwrap();
		assert_eq!(body.0, vec![1]);

		shell.assert_silent_for(Duration::from_secs(3)).await;
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn set_workspace_loads_and_acknowledges() {
	let h = harness(dirty_config(), ScriptedHost::default());
	let engine = h.engine.clone();
	drive(h, |driver, mut shell| async move {
		let _driver = driver;
		shell.recv_notification().await;
		shell.request::<SetWorkspace>(7, &WorkspaceBytes(b"png".to_vec()));
		let resp = shell.recv_response().await;
		assert_eq!(resp, AnyResponse { id: RequestId(7), result: Ok(JsonValue::Null) });

		shell.request::<SetWorkspace>(8, &WorkspaceBytes(b"bad".to_vec()));
		let resp = shell.recv_response().await;
		assert_eq!(resp.id, RequestId(8));
		assert!(resp.result.is_err());

		shell.assert_silent_for(Duration::from_secs(3)).await;
	})
	.await;
	assert_eq!(engine.lock().workspace, b"png".to_vec());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn unknown_request_gets_error_response() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	drive(h, |driver, mut shell| async move {
		let _driver = driver;
		shell.recv_notification().await;
		shell.tx.send(Message::Request(AnyRequest {
			id: RequestId(3),
			method: "explode".into(),
			params: JsonValue::Null,
		}))
		.unwrap();
		let resp = shell.recv_response().await;
		assert_eq!(resp.result, Err(ResponseError::new("unknown request type: explode")));
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn save_proposes_generated_then_remembered_name() {
	let h = harness(HostConfig::default(), ScriptedHost::answering(&["art", "art"]));
	let host = h.host.clone();
	drive(h, |driver, _shell| async move {
		driver.engine(FakeEvent::Edit);
		driver.engine(FakeEvent::Io(IoRequest::SaveWorkspace));
		until(|| host.saved.lock().len() == 1).await;
		driver.engine(FakeEvent::Io(IoRequest::SaveWorkspace));
		until(|| host.saved.lock().len() == 2).await;

		let prompts = host.prompts.lock().clone();
		assert!(prompts[0].1.starts_with("pixel-"));
		assert_eq!(prompts[1].1, "art");
		assert_eq!(host.saved.lock()[0], ("art.png".to_owned(), vec![1]));
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dismissed_save_writes_nothing() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	let host = h.host.clone();
	drive(h, |driver, _shell| async move {
		driver.engine(FakeEvent::Io(IoRequest::SaveWorkspace));
		until(|| host.prompts.lock().len() == 1).await;
		settle().await;
		assert!(host.saved.lock().is_empty());
		assert!(host.alerts.lock().is_empty());
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn save_cancels_armed_dirty_window() {
	let h = harness(dirty_config(), ScriptedHost::answering(&["doc"]));
	let host = h.host.clone();
	drive(h, |driver, mut shell| async move {
		shell.recv_notification().await;
		driver.engine(FakeEvent::Edit);
		driver.engine(FakeEvent::Io(IoRequest::SaveWorkspace));
		until(|| host.saved.lock().len() == 1).await;
		shell.assert_silent_for(Duration::from_secs(3)).await;
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn loaded_file_name_is_remembered() {
	let host = ScriptedHost::answering(&["ignored"]).picking("sprites.png", b"png-data");
	let h = harness(HostConfig::default(), host);
	let host = h.host.clone();
	let engine = h.engine.clone();
	drive(h, |driver, _shell| async move {
		driver.engine(FakeEvent::Io(IoRequest::LoadWorkspace));
		until(|| engine.lock().workspace == b"png-data".to_vec()).await;
		driver.engine(FakeEvent::Io(IoRequest::SaveWorkspace));
		until(|| host.prompts.lock().len() == 1).await;
		assert_eq!(host.prompts.lock()[0].1, "sprites");
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rejected_files_alert_the_user() {
	let host = ScriptedHost::default().picking("a.png", b"bad workspace").picking("b.png", b"bad image");
	let h = harness(HostConfig::default(), host);
	let host = h.host.clone();
	drive(h, |driver, _shell| async move {
		driver.engine(FakeEvent::Io(IoRequest::LoadWorkspace));
		until(|| host.alerts.lock().len() == 1).await;
		driver.engine(FakeEvent::Io(IoRequest::ImportImage));
		until(|| host.alerts.lock().len() == 2).await;
		assert_eq!(
			*host.alerts.lock(),
			vec!["Failed to load workspace file".to_owned(), "Failed to load PNG file".to_owned()]
		);
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn shell_routing_forwards_input_requests() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	let engine = h.engine.clone();
	drive(h, |driver, mut shell| async move {
		shell.recv_notification().await;
		driver.engine(FakeEvent::Io(IoRequest::InputNumber { id: InputId(4) }));
		let notif = shell.recv_notification().await;
		assert!(is::<methods::InputNumber>(&notif));
		assert_eq!(notif.params::<methods::InputNumber>().unwrap(), InputPrompt { input_id: 4 });

		shell.request::<NotifyInputNumber>(
			1,
			&methods::NumberInput {
				id: 4,
				number: "12".into(),
			},
		);
		assert!(shell.recv_response().await.result.is_ok());
	})
	.await;

	let state = engine.lock();
	let (name, payload) = state.commands.last().unwrap();
	assert_eq!(name, names::COMMAND_NOTIFY_INPUT_NUMBER);
	assert_eq!(serde_json::from_slice::<JsonValue>(payload).unwrap(), json!({"id": 4, "number": "12"}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn prompt_routing_answers_through_host() {
	let config = HostConfig {
		input_routing: InputRouting::Prompt,
		..HostConfig::default()
	};
	let h = harness(config, ScriptedHost::answering(&["3x3"]));
	let engine = h.engine.clone();
	drive(h, |driver, mut shell| async move {
		shell.recv_notification().await;
		driver.engine(FakeEvent::Io(IoRequest::InputSize { id: InputId(2) }));
		until(|| engine.lock().commands.iter().any(|(n, _)| n == names::COMMAND_NOTIFY_INPUT_SIZE)).await;
		shell.assert_silent_for(Duration::from_millis(100)).await;

		let state = engine.lock();
		let (_, payload) = state.commands.last().unwrap();
		assert_eq!(serde_json::from_slice::<JsonValue>(payload).unwrap(), json!({"id": 2, "size": "3x3"}));
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn pointer_input_does_not_drain_io_requests() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	let engine = h.engine.clone();
	let host = h.host.clone();
	drive(h, |driver, _shell| async move {
		engine.lock().io.push_back(serde_json::to_vec(&IoRequest::Vibrate).unwrap());
		driver.send(HostEvent::Pointer(PointerEvent::new(PointerEventKind::Down, 1.2, 3.7, 1, PointerType::Mouse, true)));
		until(|| engine.lock().commands.iter().any(|(n, _)| n == names::COMMAND_HANDLE_POINTER_EVENT)).await;
		assert!(host.vibrations.lock().is_empty());

		driver.engine(FakeEvent::Tick);
		until(|| host.vibrations.lock().len() == 1).await;
		assert_eq!(host.vibrations.lock()[0], Duration::from_millis(50));
	})
	.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn resize_reaches_surface() {
	let h = harness(HostConfig::default(), ScriptedHost::default());
	drive(h, |driver, _shell| async move {
		let surface = driver.state();
		driver.send(HostEvent::Resize(Size::new(40, 30)));
		until(|| surface.lock().size == Size::new(40, 30)).await;
	})
	.await;
}
