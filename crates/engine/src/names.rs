//! Well-known query and command names understood by the engine.

/// Query returning the next pending [`IoRequest`](crate::IoRequest) as JSON, or empty.
pub const QUERY_NEXT_IO_REQUEST: &str = "nextIoRequest";
/// Query returning the current workspace serialized as PNG.
pub const QUERY_WORKSPACE_PNG: &str = "workspacePng";
/// Query returning the 8-byte big-endian state version.
pub const QUERY_STATE_VERSION: &str = "stateVersion";

/// Command replacing the workspace with PNG bytes.
pub const COMMAND_LOAD_WORKSPACE: &str = "loadWorkspace";
/// Command importing a PNG image into the current workspace.
pub const COMMAND_IMPORT_IMAGE: &str = "importImage";
/// Command hiding the engine's own save button.
pub const COMMAND_DISABLE_SAVE_WORKSPACE_BUTTON: &str = "disableSaveWorkspaceButton";
/// Command delivering a JSON pointer event.
pub const COMMAND_HANDLE_POINTER_EVENT: &str = "handlePointerEvent";
/// Command answering a numeric input request.
pub const COMMAND_NOTIFY_INPUT_NUMBER: &str = "notifyInputNumber";
/// Command answering a size input request.
pub const COMMAND_NOTIFY_INPUT_SIZE: &str = "notifyInputSize";
