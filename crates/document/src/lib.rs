//! Document lifecycle coordination between a host shell and its viewers.
//!
//! A document is a PNG workspace identified by a URI. Any number of viewers (each
//! running an engine behind a [`Bridge`](pixbridge_rpc::Bridge)) may display it; the
//! [`DocumentHost`] decides which viewer's state is authoritative, persists it, and
//! keeps the others in sync.

#![warn(missing_docs)]

pub mod backup;
pub mod document;
pub mod error;
pub mod fs;
pub mod host;
pub mod ui;
pub mod viewer;

pub use backup::Backup;
pub use document::{Document, DocumentEvent, DocumentEventReceiver, DocumentEventSender};
pub use error::{DocumentError, Result};
pub use fs::{FileSystem, LocalFileSystem};
pub use host::DocumentHost;
pub use ui::HostUi;
pub use viewer::ViewerId;

/// URI scheme of documents with no backing file yet.
pub const UNTITLED_SCHEME: &str = "untitled";
