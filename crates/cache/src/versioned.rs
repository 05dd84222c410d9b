//! Build-token generations over [`CacheStorage`](crate::CacheStorage).

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CacheError, Result};
use crate::fetch::{CachedResponse, Fetch, FetchRequest, RequestCache};
use crate::storage::CacheStorage;

/// Compile-time variable holding the build's cache token.
pub const BUILD_TOKEN_ENV: &str = "PIXBRIDGE_CACHE_TOKEN";

/// A fresh random token, one per build.
pub fn generate_token() -> String {
	Uuid::new_v4().to_string()
}

/// One build's view of the cache.
#[derive(Debug, Clone)]
pub struct VersionedCache {
	prefix: String,
	key: String,
	storage: CacheStorage,
}

impl VersionedCache {
	/// Cache generation `prefix + token` inside `storage`.
	pub fn new(prefix: impl Into<String>, token: &str, storage: CacheStorage) -> Result<Self> {
		if token.is_empty() {
			return Err(CacheError::EmptyToken);
		}
		let prefix = prefix.into();
		let key = format!("{prefix}{token}");
		Ok(Self { prefix, key, storage })
	}

	/// Uses the token baked in at build time through [`BUILD_TOKEN_ENV`], if any.
	pub fn from_build_env(prefix: impl Into<String>, storage: CacheStorage) -> Option<Self> {
		let token = option_env!("PIXBRIDGE_CACHE_TOKEN")?;
		Self::new(prefix, token, storage).ok()
	}

	/// Name of this generation's cache.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// The shared storage.
	pub fn storage(&self) -> &CacheStorage {
		&self.storage
	}

	/// Nothing is precached; the generation fills on demand.
	pub fn install(&self) -> Result<()> {
		info!(key = %self.key, "cache.install");
		Ok(())
	}

	/// Deletes every other generation with the same prefix. Returns their names.
	pub fn activate(&self) -> Vec<String> {
		let stale: Vec<String> = self
			.storage
			.keys()
			.into_iter()
			.filter(|name| name.starts_with(&self.prefix) && *name != self.key)
			.collect();
		for name in &stale {
			self.storage.delete(name);
			info!(key = %name, "cache.delete_old");
		}
		stale
	}

	/// Serves `request` from the cache, falling back to `network` and storing the result.
	pub async fn fetch(&self, request: &FetchRequest, network: &(impl Fetch + ?Sized)) -> Result<CachedResponse> {
		if request.bypasses_cache() {
			debug!(url = %request.url, cache = ?request.cache, "cache.bypass");
			return network.fetch(request).await;
		}
		if request.cache != RequestCache::Reload
			&& let Some(hit) = self.storage.match_any(&request.url)
		{
			debug!(url = %request.url, "cache.hit");
			return Ok(hit);
		}
		debug!(url = %request.url, "cache.fetch");
		let response = network.fetch(request).await?;
		self.storage.put(&self.key, request.url.clone(), response.clone());
		debug!(url = %request.url, key = %self.key, "cache.store");
		Ok(response)
	}
}
