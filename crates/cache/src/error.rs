//! Errors raised by the cache layer.

use thiserror::Error;
use url::Url;

/// Result type for cache operations.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;

/// Cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
	/// The network fetch behind a miss or bypass failed.
	#[error("fetch {url} failed: {message}")]
	Fetch {
		/// Requested resource.
		url: Url,
		/// Fetcher's description of the failure.
		message: String,
	},
	/// The build token is empty, so generations cannot be told apart.
	#[error("cache token must not be empty")]
	EmptyToken,
}
