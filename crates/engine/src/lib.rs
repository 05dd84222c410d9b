//! Host-side adapter around an embedded pixel-editing engine.
//!
//! The engine itself is opaque: it consumes host events, answers named queries with
//! raw bytes, and accepts named commands with raw payloads. This crate wraps that
//! surface in typed operations the run loop can drive:
//!
//! * [`Engine`] / [`Surface`]: the two seams a concrete embedding implements
//! * [`EngineAdapter`]: owns both and exposes the well-known queries and commands
//! * [`IoRequest`]: the engine's pending request for host-side IO
//! * [`StateVersion`]: the engine's monotonic change counter
//! * [`PointerEvent`]: normalized pointer input forwarded as a command

#![warn(missing_docs)]

pub mod adapter;
pub mod error;
pub mod event;
pub mod io;
pub mod names;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod version;

pub use adapter::{Engine, EngineAdapter, LoadOptions, Surface};
pub use error::{EngineError, Result};
pub use event::{HostEvent, PointerEvent, PointerEventKind, PointerType, Size};
pub use io::{InputId, IoRequest};
pub use version::StateVersion;
