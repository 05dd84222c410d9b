//! The engine-side event loop.
//!
//! ```text
//!                 ┌──────────────── biased select ────────────────┐
//!   host tasks ──►│ 1. finished IO (save, pick, prompt)            │
//!   shell ───────►│ 2. inbound bridge message                      │
//!   timer ───────►│ 3. dirty deadline                              │
//!   surface ─────►│ 4. host event ── step ── observe ── poll IO ───┼──► host tasks / shell
//!                 └────────────────────────────────────────────────┘
//! ```
//!
//! The engine is only touched from this loop. Host IO runs on spawned tasks and
//! reports back through the join set, so the loop never waits on a dialog.

use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::Local;
use pixbridge_engine::{Engine, EngineAdapter, HostEvent, InputId, IoRequest, LoadOptions, StateVersion, Surface};
use pixbridge_rpc::methods::{
	GetWorkspace, InputPrompt, NotifyDirty, NotifyInputNumber, NotifyInputSize, Ready, SetWorkspace, WorkspaceBytes,
};
use pixbridge_rpc::{AnyRequest, Bridge, Incoming, Message, Request, ResponseError, methods};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{HostConfig, InputRouting};
use crate::dirty::DirtyTracker;
use crate::error::{HostError, Result, RuntimeError};
use crate::host::{HostActions, PickedFile};
use crate::naming;

#[cfg(test)]
mod tests;

/// Why [`RunLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
	/// The engine asked to stop.
	EngineStopped,
	/// The surface stopped producing events.
	SurfaceClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
	Number,
	Size,
}

impl InputKind {
	fn prompt(self) -> &'static str {
		match self {
			Self::Number => "Please input a number",
			Self::Size => "Please input a size (e.g. 32x32)",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickPurpose {
	Load,
	Import,
}

#[derive(Debug)]
enum IoCompletion {
	Saved { name: String, version: Option<StateVersion> },
	Picked { purpose: PickPurpose, file: PickedFile },
	Input { kind: InputKind, id: InputId, value: String },
	Dismissed(&'static str),
	Failed { action: &'static str, error: HostError },
}

enum Wake<Ev> {
	Io(std::result::Result<IoCompletion, JoinError>),
	Message(Option<Message>),
	Deadline,
	Event(Option<HostEvent<Ev>>),
}

/// Drives one engine instance.
pub struct RunLoop<E, S, H> {
	engine: EngineAdapter<E, S>,
	host: Arc<H>,
	bridge: Arc<Bridge>,
	inbound: Option<mpsc::UnboundedReceiver<Message>>,
	dirty: Option<DirtyTracker>,
	tasks: JoinSet<IoCompletion>,
	workspace_name: Option<String>,
	config: HostConfig,
}

impl<E, S, H> RunLoop<E, S, H>
where
	S: Surface,
	E: Engine<S>,
	H: HostActions,
{
	/// Loads the engine per `config` and wraps it in a loop.
	///
	/// `bridge` posts towards the shell; `inbound` carries the shell's messages.
	pub async fn load(
		engine: E,
		surface: S,
		host: Arc<H>,
		bridge: Arc<Bridge>,
		inbound: mpsc::UnboundedReceiver<Message>,
		config: HostConfig,
	) -> Result<Self> {
		let workspace = match &config.workspace_path {
			Some(path) => Some(tokio::fs::read(path).await.map_err(|error| RuntimeError::Workspace {
				path: path.clone(),
				error,
			})?),
			None => None,
		};
		let options = LoadOptions {
			disable_save_workspace_button: config.disable_save_workspace_button,
			workspace,
		};
		let engine = EngineAdapter::load(engine, surface, options)?;
		Self::new(engine, host, bridge, inbound, config)
	}

	/// Wraps an already loaded engine.
	pub fn new(
		mut engine: EngineAdapter<E, S>,
		host: Arc<H>,
		bridge: Arc<Bridge>,
		inbound: mpsc::UnboundedReceiver<Message>,
		config: HostConfig,
	) -> Result<Self> {
		let dirty = if config.enable_dirty_notification {
			Some(DirtyTracker::new(config.dirty_interval(), engine.state_version()?))
		} else {
			None
		};
		Ok(Self {
			engine,
			host,
			bridge,
			inbound: Some(inbound),
			dirty,
			tasks: JoinSet::new(),
			workspace_name: None,
			config,
		})
	}

	/// Runs until the engine stops or the surface goes away.
	pub async fn run(mut self) -> StopReason {
		if let Err(e) = self.bridge.notify::<Ready>(()) {
			warn!(error = %e, "runloop.ready.undelivered");
		}

		let reason = loop {
			let deadline = self.dirty.as_ref().and_then(DirtyTracker::deadline);
			let wake = tokio::select! {
				biased;

				Some(done) = self.tasks.join_next(), if !self.tasks.is_empty() => Wake::Io(done),
				msg = next_message(&mut self.inbound) => Wake::Message(msg),
				() = sleep_until(deadline) => Wake::Deadline,
				event = self.engine.next_event() => Wake::Event(event),
			};

			match wake {
				Wake::Io(Ok(done)) => self.complete_io(done),
				Wake::Io(Err(e)) => error!(error = %e, "runloop.io_task.failed"),
				Wake::Message(Some(msg)) => self.handle_message(msg),
				Wake::Message(None) => {
					debug!("runloop.shell.closed");
					self.inbound = None;
				}
				Wake::Deadline => self.fire_dirty(),
				Wake::Event(None) => break StopReason::SurfaceClosed,
				Wake::Event(Some(event)) => {
					if self.handle_host_event(event).is_break() {
						break StopReason::EngineStopped;
					}
				}
			}
		};

		self.tasks.abort_all();
		self.bridge.cancel_all();
		info!(?reason, "runloop.stopped");
		reason
	}

	fn handle_host_event(&mut self, event: HostEvent<S::Event>) -> ControlFlow<()> {
		match event {
			HostEvent::Engine(event) => {
				match self.engine.handle_event(event) {
					Ok(true) => {}
					Ok(false) => return ControlFlow::Break(()),
					Err(e) => error!(error = %e, "runloop.step.failed"),
				}
				self.observe_dirty();
				self.poll_io();
			}
			HostEvent::Pointer(pointer) => {
				if let Err(e) = self.engine.forward_pointer(&pointer) {
					warn!(error = %e, "runloop.pointer.rejected");
				}
				self.observe_dirty();
			}
			HostEvent::Resize(size) => self.engine.resize(size),
		}
		ControlFlow::Continue(())
	}

	fn observe_dirty(&mut self) {
		let Some(tracker) = self.dirty.as_mut() else {
			return;
		};
		match self.engine.state_version() {
			Ok(version) => tracker.observe(version, Instant::now()),
			Err(e) => warn!(error = %e, "runloop.state_version.unreadable"),
		}
	}

	fn fire_dirty(&mut self) {
		let Some(tracker) = self.dirty.as_mut() else {
			return;
		};
		let version = self.engine.state_version().unwrap_or_else(|e| {
			warn!(error = %e, "runloop.state_version.unreadable");
			StateVersion::default()
		});
		if let Some(version) = tracker.fire(version) {
			debug!(%version, "runloop.dirty.notify");
			if let Err(e) = self.bridge.notify::<NotifyDirty>(()) {
				warn!(error = %e, "runloop.dirty.undelivered");
			}
		}
	}

	fn flush_dirty(&mut self) {
		let Some(tracker) = self.dirty.as_mut() else {
			return;
		};
		match self.engine.state_version() {
			Ok(version) => tracker.acknowledge(version, Instant::now()),
			Err(e) => warn!(error = %e, "runloop.state_version.unreadable"),
		}
	}

	fn poll_io(&mut self) {
		match self.engine.next_io_request() {
			Ok(Some(request)) => self.dispatch_io(request),
			Ok(None) => {}
			Err(e) => warn!(error = %e, "runloop.io_request.invalid"),
		}
	}

	fn dispatch_io(&mut self, request: IoRequest) {
		debug!(request = request.name(), "runloop.io_request");
		match request {
			IoRequest::SaveWorkspace => self.begin_save(),
			IoRequest::LoadWorkspace => self.begin_pick(PickPurpose::Load),
			IoRequest::ImportImage => self.begin_pick(PickPurpose::Import),
			IoRequest::Vibrate => {
				if !self.host.vibrate(self.config.vibration()) {
					debug!("runloop.vibrate.unsupported");
				}
			}
			IoRequest::InputNumber { id } => self.route_input(InputKind::Number, id),
			IoRequest::InputSize { id } => self.route_input(InputKind::Size, id),
		}
	}

	fn begin_save(&mut self) {
		let data = match self.engine.workspace_png() {
			Ok(data) => data,
			Err(e) => {
				error!(error = %e, "runloop.save.snapshot_failed");
				self.host.alert("Failed to save workspace");
				return;
			}
		};
		let version = self.engine.state_version().ok();
		let suggested = self
			.workspace_name
			.clone()
			.unwrap_or_else(|| naming::generated_name(&self.config.workspace_name_prefix, &Local::now()));

		let host = Arc::clone(&self.host);
		self.tasks.spawn(async move {
			let name = host.prompt("Please input your workspace name", &suggested).await;
			let Some(name) = name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()) else {
				return IoCompletion::Dismissed("saveWorkspace");
			};
			match host.save_file(&format!("{name}.png"), data).await {
				Ok(()) => IoCompletion::Saved { name, version },
				Err(error) => IoCompletion::Failed {
					action: "save workspace",
					error,
				},
			}
		});
	}

	fn begin_pick(&mut self, purpose: PickPurpose) {
		let host = Arc::clone(&self.host);
		self.tasks.spawn(async move {
			match host.pick_file("image/png").await {
				Ok(Some(file)) => IoCompletion::Picked { purpose, file },
				Ok(None) => IoCompletion::Dismissed("pickFile"),
				Err(error) => IoCompletion::Failed {
					action: "open file",
					error,
				},
			}
		});
	}

	fn route_input(&mut self, kind: InputKind, id: InputId) {
		match self.config.input_routing {
			InputRouting::Shell => {
				let prompt = InputPrompt { input_id: id.0 };
				let sent = match kind {
					InputKind::Number => self.bridge.notify::<methods::InputNumber>(prompt),
					InputKind::Size => self.bridge.notify::<methods::InputSize>(prompt),
				};
				if let Err(e) = sent {
					warn!(input_id = id.0, error = %e, "runloop.input.undelivered");
				}
			}
			InputRouting::Prompt => {
				let host = Arc::clone(&self.host);
				self.tasks.spawn(async move {
					match host.prompt(kind.prompt(), "").await.filter(|v| !v.trim().is_empty()) {
						Some(value) => IoCompletion::Input { kind, id, value },
						None => IoCompletion::Dismissed("input"),
					}
				});
			}
		}
	}

	fn complete_io(&mut self, done: IoCompletion) {
		match done {
			IoCompletion::Saved { name, version } => {
				info!(name, "runloop.workspace.saved");
				self.workspace_name = Some(name);
				if let (Some(tracker), Some(version)) = (self.dirty.as_mut(), version) {
					tracker.acknowledge(version, Instant::now());
				}
			}
			IoCompletion::Picked { purpose, file } => {
				let (result, failure) = match purpose {
					PickPurpose::Load => (self.engine.load_workspace(&file.data), "Failed to load workspace file"),
					PickPurpose::Import => (self.engine.import_image(&file.data), "Failed to load PNG file"),
				};
				match result {
					Ok(()) if purpose == PickPurpose::Load => {
						self.workspace_name = Some(naming::workspace_stem(&file.name).to_owned());
					}
					Ok(()) => {}
					Err(e) => {
						warn!(file = %file.name, error = %e, "runloop.pick.rejected");
						self.host.alert(failure);
					}
				}
				self.observe_dirty();
			}
			IoCompletion::Input { kind, id, value } => {
				let result = match kind {
					InputKind::Number => self.engine.notify_input_number(id, &value),
					InputKind::Size => self.engine.notify_input_size(id, &value),
				};
				if let Err(e) = result {
					warn!(input_id = id.0, error = %e, "runloop.input.rejected");
				}
				self.observe_dirty();
			}
			IoCompletion::Dismissed(what) => debug!(what, "runloop.io.dismissed"),
			IoCompletion::Failed {
				action,
				error: error @ HostError::Unsupported(_),
			} => {
				warn!(action, error = %error, "runloop.io.unsupported");
				self.host.alert(&format!("Cannot {action}: {error}"));
			}
			IoCompletion::Failed { action, error } => {
				error!(action, error = %error, "runloop.io.failed");
				self.host.alert(&format!("Failed to {action}: {error}"));
			}
		}
	}

	fn handle_message(&mut self, msg: Message) {
		match self.bridge.accept(msg) {
			None => {}
			Some(Incoming::Request(request)) => {
				let id = request.id;
				let result = self.serve(&request);
				if let Err(e) = self.bridge.respond(id, result) {
					warn!(%id, error = %e, "runloop.response.undelivered");
				}
			}
			Some(Incoming::Notification(notif)) => debug!(method = %notif.method, "runloop.notification.ignored"),
		}
	}

	fn serve(&mut self, request: &AnyRequest) -> std::result::Result<JsonValue, ResponseError> {
		match request.method.as_str() {
			SetWorkspace::METHOD => {
				let bytes = request.params::<SetWorkspace>().map_err(|e| ResponseError::from_display(&e))?;
				self.engine.load_workspace(&bytes.0).map_err(|e| ResponseError::from_display(&e))?;
				self.flush_dirty();
				Ok(JsonValue::Null)
			}
			GetWorkspace::METHOD => {
				let png = self.engine.workspace_png().map_err(|e| ResponseError::from_display(&e))?;
				self.flush_dirty();
				serde_json::to_value(WorkspaceBytes(png)).map_err(|e| ResponseError::from_display(&e))
			}
			NotifyInputNumber::METHOD => {
				let answer = request.params::<NotifyInputNumber>().map_err(|e| ResponseError::from_display(&e))?;
				self.engine.notify_input_number(InputId(answer.id), &answer.number).map_err(|e| ResponseError::from_display(&e))?;
				self.observe_dirty();
				Ok(JsonValue::Null)
			}
			NotifyInputSize::METHOD => {
				let answer = request.params::<NotifyInputSize>().map_err(|e| ResponseError::from_display(&e))?;
				self.engine.notify_input_size(InputId(answer.id), &answer.size).map_err(|e| ResponseError::from_display(&e))?;
				self.observe_dirty();
				Ok(JsonValue::Null)
			}
			other => Err(ResponseError::new(format!("unknown request type: {other}"))),
		}
	}
}

async fn next_message(inbound: &mut Option<mpsc::UnboundedReceiver<Message>>) -> Option<Message> {
	match inbound {
		Some(rx) => rx.recv().await,
		None => std::future::pending().await,
	}
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}
