//! In-memory engine and surface for exercising hosts without a real engine.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::adapter::{Engine, Surface};
use crate::error::{EngineError, Result};
use crate::event::{HostEvent, Size};
use crate::io::IoRequest;
use crate::names;

/// Native events understood by [`FakeEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEvent {
	/// A step with no effect.
	Tick,
	/// A step that mutates the workspace.
	Edit,
	/// A step that queues an IO request.
	Io(IoRequest),
	/// A step that queues a raw `nextIoRequest` payload, well-formed or not.
	RawIo(Vec<u8>),
	/// A step after which the engine asks to stop.
	Stop,
	/// A step that fails.
	Fail,
}

/// Observable state of a [`FakeEngine`].
#[derive(Debug, Default)]
pub struct FakeState {
	/// Current state version.
	pub version: u64,
	/// Current workspace bytes.
	pub workspace: Vec<u8>,
	/// Pending `nextIoRequest` payloads, already encoded.
	pub io: VecDeque<Vec<u8>>,
	/// Every command received, in order.
	pub commands: Vec<(String, Vec<u8>)>,
	/// Whether `initialize` ran.
	pub initialized: bool,
}

/// Engine double that mutates in-memory state.
///
/// Workspaces starting with `b"bad"` are rejected by `loadWorkspace` and `importImage`.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
	state: Arc<Mutex<FakeState>>,
}

impl FakeEngine {
	/// Creates an engine with an empty workspace at version 0.
	pub fn new() -> Self {
		Self::default()
	}

	/// Shared handle to the engine state for assertions.
	pub fn state(&self) -> Arc<Mutex<FakeState>> {
		Arc::clone(&self.state)
	}

	/// Names of all commands received so far.
	pub fn command_names(&self) -> Vec<String> {
		self.state.lock().commands.iter().map(|(n, _)| n.clone()).collect()
	}
}

impl Engine<FakeSurface> for FakeEngine {
	fn initialize(&mut self, _surface: &mut FakeSurface) -> Result<()> {
		self.state.lock().initialized = true;
		Ok(())
	}

	fn handle_event(&mut self, _surface: &mut FakeSurface, event: FakeEvent) -> Result<bool> {
		let mut state = self.state.lock();
		match event {
			FakeEvent::Tick => {}
			FakeEvent::Edit => {
				state.version += 1;
				let next = state.version as u8;
				state.workspace.push(next);
			}
			FakeEvent::Io(req) => {
				let payload = serde_json::to_vec(&req).map_err(|error| EngineError::Payload { what: "io request", error })?;
				state.io.push_back(payload);
			}
			FakeEvent::RawIo(payload) => state.io.push_back(payload),
			FakeEvent::Stop => return Ok(false),
			FakeEvent::Fail => return Err(EngineError::engine("step failed")),
		}
		Ok(true)
	}

	fn query(&mut self, _surface: &mut FakeSurface, name: &str) -> Result<Vec<u8>> {
		let mut state = self.state.lock();
		match name {
			names::QUERY_STATE_VERSION => Ok(state.version.to_be_bytes().to_vec()),
			names::QUERY_WORKSPACE_PNG => Ok(state.workspace.clone()),
			names::QUERY_NEXT_IO_REQUEST => Ok(state.io.pop_front().unwrap_or_default()),
			other => Err(EngineError::UnknownQuery(other.to_owned())),
		}
	}

	fn command(&mut self, _surface: &mut FakeSurface, name: &str, data: &[u8]) -> Result<()> {
		let mut state = self.state.lock();
		state.commands.push((name.to_owned(), data.to_vec()));
		match name {
			names::COMMAND_LOAD_WORKSPACE | names::COMMAND_IMPORT_IMAGE => {
				if data.starts_with(b"bad") {
					return Err(EngineError::engine("not a png"));
				}
				if name == names::COMMAND_LOAD_WORKSPACE {
					state.workspace = data.to_vec();
				} else {
					state.workspace.extend_from_slice(data);
				}
				state.version += 1;
				Ok(())
			}
			names::COMMAND_HANDLE_POINTER_EVENT
			| names::COMMAND_NOTIFY_INPUT_NUMBER
			| names::COMMAND_NOTIFY_INPUT_SIZE
			| names::COMMAND_DISABLE_SAVE_WORKSPACE_BUTTON => Ok(()),
			other => Err(EngineError::UnknownCommand(other.to_owned())),
		}
	}
}

/// Observable state of a [`FakeSurface`].
#[derive(Debug, Default)]
pub struct SurfaceState {
	/// Last size applied via `resize`.
	pub size: Size,
	/// Number of redraw requests.
	pub redraws: usize,
}

/// Surface double fed from a channel.
///
/// Dropping every [`SurfaceDriver`] ends the event stream.
#[derive(Debug)]
pub struct FakeSurface {
	available: Size,
	events: mpsc::UnboundedReceiver<HostEvent<FakeEvent>>,
	state: Arc<Mutex<SurfaceState>>,
}

/// Test-side handle that pushes events into a [`FakeSurface`].
#[derive(Debug, Clone)]
pub struct SurfaceDriver {
	tx: mpsc::UnboundedSender<HostEvent<FakeEvent>>,
	state: Arc<Mutex<SurfaceState>>,
}

impl FakeSurface {
	/// Creates a surface with the given available area.
	pub fn new(available: Size) -> (Self, SurfaceDriver) {
		let (tx, events) = mpsc::unbounded_channel();
		let state = Arc::new(Mutex::new(SurfaceState::default()));
		let surface = Self {
			available,
			events,
			state: Arc::clone(&state),
		};
		(surface, SurfaceDriver { tx, state })
	}
}

impl SurfaceDriver {
	/// Queues a host event. Returns `false` once the surface is gone.
	pub fn send(&self, event: HostEvent<FakeEvent>) -> bool {
		self.tx.send(event).is_ok()
	}

	/// Queues a native engine event.
	pub fn engine(&self, event: FakeEvent) -> bool {
		self.send(HostEvent::Engine(event))
	}

	/// Shared handle to the surface state for assertions.
	pub fn state(&self) -> Arc<Mutex<SurfaceState>> {
		Arc::clone(&self.state)
	}
}

impl Surface for FakeSurface {
	type Event = FakeEvent;

	async fn next_event(&mut self) -> Option<HostEvent<FakeEvent>> {
		self.events.recv().await
	}

	fn available_size(&self) -> Size {
		self.available
	}

	fn resize(&mut self, size: Size) {
		self.state.lock().size = size;
	}

	fn request_redraw(&mut self) {
		self.state.lock().redraws += 1;
	}
}
