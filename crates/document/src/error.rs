//! Error types for document coordination.

use thiserror::Error;
use url::Url;

use crate::viewer::ViewerId;

/// Result type for document operations.
pub type Result<T, E = DocumentError> = std::result::Result<T, E>;

/// Errors raised by the document host.
#[derive(Debug, Error)]
pub enum DocumentError {
	/// No viewer is attached to supply the document's bytes.
	#[error("could not find a viewer to save {uri} for")]
	NoViewer {
		/// The document.
		uri: Url,
	},
	/// Another save, revert or backup is running on the same document.
	#[error("another persistence operation is in progress for {uri}")]
	Busy {
		/// The document.
		uri: Url,
	},
	/// The caller cancelled the operation before it wrote anything.
	#[error("operation cancelled")]
	Cancelled,
	/// The document has no backing file; it can only be saved to a destination.
	#[error("{uri} has no backing file")]
	Untitled {
		/// The document.
		uri: Url,
	},
	/// Creating an untitled document needs a folder to place it in.
	#[error("Creating new files requires opening a workspace")]
	NoWorkspaceFolder,
	/// The message came from a viewer that is not attached.
	#[error("unknown viewer {0}")]
	UnknownViewer(ViewerId),
	/// A URI or backup id could not be parsed.
	#[error("invalid uri {uri}: {error}")]
	InvalidUri {
		/// The offending text.
		uri: String,
		/// The underlying parse error.
		#[source]
		error: url::ParseError,
	},
	/// Reading or writing a file failed.
	#[error("I/O error on {uri}: {error}")]
	Io {
		/// Location that failed.
		uri: Url,
		/// The underlying I/O error.
		#[source]
		error: std::io::Error,
	},
	/// The viewer failed to answer.
	#[error(transparent)]
	Bridge(#[from] pixbridge_rpc::Error),
}
