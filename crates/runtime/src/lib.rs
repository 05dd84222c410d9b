//! Run loop driving an embedded engine.
//!
//! The [`RunLoop`] owns an [`EngineAdapter`](pixbridge_engine::EngineAdapter) and is
//! the only task that touches it. Each wakeup is one of:
//!
//! * a host event from the surface (engine step, pointer input, resize)
//! * an inbound bridge message from the shell
//! * the dirty-notification deadline
//! * a finished host IO task (file picker, save dialog, prompt)
//!
//! After every engine step the loop reads the state version for the
//! [`DirtyTracker`] and drains at most one IO request.

#![warn(missing_docs)]

pub mod config;
pub mod dirty;
pub mod error;
pub mod host;
pub mod naming;
pub mod run_loop;

pub use config::{HostConfig, InputRouting};
pub use dirty::DirtyTracker;
pub use error::{ConfigError, HostError, Result, RuntimeError};
pub use host::{HostActions, PickedFile};
pub use run_loop::{RunLoop, StopReason};
