//! Engine lifecycle and typed access to its query/command surface.

use std::future::Future;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::event::{HostEvent, PointerEvent, Size};
use crate::io::{InputId, IoRequest};
use crate::names;
use crate::version::StateVersion;


/// The embedded pixel-editing engine.
///
/// Every call runs to completion on the loop that owns the engine; nothing here
/// may be invoked concurrently.
pub trait Engine<S: Surface> {
	/// Performs one-time setup against the surface.
	fn initialize(&mut self, surface: &mut S) -> Result<()>;

	/// Advances the engine by one event. Returns `false` when the engine wants to stop.
	fn handle_event(&mut self, surface: &mut S, event: S::Event) -> Result<bool>;

	/// Answers a named query with raw bytes.
	fn query(&mut self, surface: &mut S, name: &str) -> Result<Vec<u8>>;

	/// Executes a named command with a raw payload.
	fn command(&mut self, surface: &mut S, name: &str, data: &[u8]) -> Result<()>;
}

/// The render surface and event source the engine is hosted in.
pub trait Surface {
	/// Native events fed to [`Engine::handle_event`].
	type Event;

	/// Waits for the next host event. `None` means the surface is gone.
	///
	/// Must be cancel-safe: the run loop races it against other wakeups.
	fn next_event(&mut self) -> impl Future<Output = Option<HostEvent<Self::Event>>>;

	/// Size of the area the surface may occupy.
	fn available_size(&self) -> Size;

	/// Resizes the backing canvas.
	fn resize(&mut self, size: Size);

	/// Schedules a repaint.
	fn request_redraw(&mut self);
}

/// Options applied while loading the engine.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
	/// Hide the engine's own save button because the host owns persistence.
	pub disable_save_workspace_button: bool,
	/// Initial workspace PNG to load after initialization.
	pub workspace: Option<Vec<u8>>,
}

/// Owns a loaded engine and its surface.
pub struct EngineAdapter<E, S> {
	engine: E,
	surface: S,
}

#[derive(Serialize)]
struct NumberAnswer<'a> {
	id: InputId,
	number: &'a str,
}

#[derive(Serialize)]
struct SizeAnswer<'a> {
	id: InputId,
	size: &'a str,
}

impl<E, S> EngineAdapter<E, S>
where
	S: Surface,
	E: Engine<S>,
{
	/// Sizes the surface, initializes the engine, then applies `options`.
	pub fn load(engine: E, mut surface: S, options: LoadOptions) -> Result<Self> {
		let size = surface.available_size();
		surface.resize(size);
		surface.request_redraw();

		let mut this = Self { engine, surface };
		this.engine.initialize(&mut this.surface)?;
		debug!(width = size.width, height = size.height, "engine.loaded");

		if options.disable_save_workspace_button {
			this.command(names::COMMAND_DISABLE_SAVE_WORKSPACE_BUTTON, &[])?;
		}
		if let Some(workspace) = options.workspace {
			this.load_workspace(&workspace)?;
		}
		Ok(this)
	}

	/// Waits for the next host event from the surface.
	pub fn next_event(&mut self) -> impl Future<Output = Option<HostEvent<S::Event>>> + '_ {
		self.surface.next_event()
	}

	/// Feeds one native event to the engine.
	pub fn handle_event(&mut self, event: S::Event) -> Result<bool> {
		self.engine.handle_event(&mut self.surface, event)
	}

	/// Runs a raw query.
	pub fn query(&mut self, name: &str) -> Result<Vec<u8>> {
		trace!(query = name, "engine.query");
		self.engine.query(&mut self.surface, name)
	}

	/// Runs a raw command.
	pub fn command(&mut self, name: &str, data: &[u8]) -> Result<()> {
		trace!(command = name, len = data.len(), "engine.command");
		self.engine.command(&mut self.surface, name, data)
	}

	/// Reads the current state version.
	pub fn state_version(&mut self) -> Result<StateVersion> {
		let raw = self.query(names::QUERY_STATE_VERSION)?;
		StateVersion::from_be_bytes(&raw)
	}

	/// Pops the next pending IO request, if any.
	pub fn next_io_request(&mut self) -> Result<Option<IoRequest>> {
		let raw = self.query(names::QUERY_NEXT_IO_REQUEST)?;
		IoRequest::decode(&raw)
	}

	/// Serializes the workspace to PNG bytes.
	pub fn workspace_png(&mut self) -> Result<Vec<u8>> {
		self.query(names::QUERY_WORKSPACE_PNG)
	}

	/// Replaces the workspace with PNG bytes.
	pub fn load_workspace(&mut self, png: &[u8]) -> Result<()> {
		self.command(names::COMMAND_LOAD_WORKSPACE, png)
	}

	/// Imports a PNG image into the workspace.
	pub fn import_image(&mut self, png: &[u8]) -> Result<()> {
		self.command(names::COMMAND_IMPORT_IMAGE, png)
	}

	/// Answers an `inputNumber` request.
	pub fn notify_input_number(&mut self, id: InputId, number: &str) -> Result<()> {
		let payload = encode("number answer", &NumberAnswer { id, number })?;
		self.command(names::COMMAND_NOTIFY_INPUT_NUMBER, &payload)
	}

	/// Answers an `inputSize` request.
	pub fn notify_input_size(&mut self, id: InputId, size: &str) -> Result<()> {
		let payload = encode("size answer", &SizeAnswer { id, size })?;
		self.command(names::COMMAND_NOTIFY_INPUT_SIZE, &payload)
	}

	/// Forwards pointer input as a command. One-way; nothing is polled afterwards.
	pub fn forward_pointer(&mut self, event: &PointerEvent) -> Result<()> {
		let payload = encode("pointer event", event)?;
		self.command(names::COMMAND_HANDLE_POINTER_EVENT, &payload)
	}

	/// Applies a new available size to the surface.
	pub fn resize(&mut self, size: Size) {
		self.surface.resize(size);
		self.surface.request_redraw();
	}

	/// Borrows the engine.
	pub fn engine(&self) -> &E {
		&self.engine
	}

	/// Borrows the surface.
	pub fn surface(&self) -> &S {
		&self.surface
	}

	/// Tears the adapter down into its parts.
	pub fn into_parts(self) -> (E, S) {
		(self.engine, self.surface)
	}
}

fn encode(what: &'static str, value: &impl Serialize) -> Result<Vec<u8>> {
	serde_json::to_vec(value).map_err(|error| EngineError::Payload { what, error })
}
