//! In-memory named caches.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::fetch::CachedResponse;

type Cache = HashMap<Url, CachedResponse>;

/// Named caches, shared by every handle cloned from the same storage.
#[derive(Debug, Clone, Default)]
pub struct CacheStorage {
	caches: Arc<Mutex<BTreeMap<String, Cache>>>,
}

impl CacheStorage {
	/// Empty storage.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates the cache `name` if it does not exist.
	pub fn open(&self, name: &str) {
		self.caches.lock().entry(name.to_owned()).or_default();
	}

	/// Names of every cache, sorted.
	pub fn keys(&self) -> Vec<String> {
		self.caches.lock().keys().cloned().collect()
	}

	/// Whether `name` exists.
	pub fn has(&self, name: &str) -> bool {
		self.caches.lock().contains_key(name)
	}

	/// Deletes `name`. Returns whether it existed.
	pub fn delete(&self, name: &str) -> bool {
		self.caches.lock().remove(name).is_some()
	}

	/// Looks `url` up across every cache, in name order.
	pub fn match_any(&self, url: &Url) -> Option<CachedResponse> {
		self.caches.lock().values().find_map(|cache| cache.get(url).cloned())
	}

	/// Stores `response` for `url` in `name`, creating the cache if needed.
	pub fn put(&self, name: &str, url: Url, response: CachedResponse) {
		self.caches.lock().entry(name.to_owned()).or_default().insert(url, response);
	}

	/// Number of entries in `name`.
	pub fn len(&self, name: &str) -> usize {
		self.caches.lock().get(name).map_or(0, HashMap::len)
	}
}
