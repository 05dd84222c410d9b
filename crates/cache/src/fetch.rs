//! Requests, stored responses, and the network seam.
//!
//! [`FetchRequest::bypasses_cache`] decides whether the cache is consulted at all:
//! only `https` requests without a `no-store` directive are cached.

use std::fmt;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Cache directive carried by a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestCache {
	/// Serve from the cache when possible.
	#[default]
	Default,
	/// Never read or write the cache.
	NoStore,
	/// Skip the cached copy but store the fresh one.
	Reload,
}

/// A resource request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
	/// Resource location.
	pub url: Url,
	/// Cache directive.
	pub cache: RequestCache,
}

impl FetchRequest {
	/// A request with the default directive.
	pub fn new(url: Url) -> Self {
		Self {
			url,
			cache: RequestCache::Default,
		}
	}

	/// Replaces the cache directive.
	pub fn with_cache(mut self, cache: RequestCache) -> Self {
		self.cache = cache;
		self
	}

	/// Whether the cache must be left out entirely.
	pub fn bypasses_cache(&self) -> bool {
		self.url.scheme() != "https" || self.cache == RequestCache::NoStore
	}
}

/// A response as stored in the cache.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedResponse {
	/// HTTP status.
	pub status: u16,
	/// Content type, if known.
	pub content_type: Option<String>,
	/// Response body.
	pub body: Vec<u8>,
}

impl fmt::Debug for CachedResponse {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CachedResponse")
			.field("status", &self.status)
			.field("content_type", &self.content_type)
			.field("body", &format_args!("{} bytes", self.body.len()))
			.finish()
	}
}

/// The network behind the cache.
#[async_trait]
pub trait Fetch: Send + Sync {
	/// Performs the request.
	async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse>;
}
