//! Viewers attached to a document.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use pixbridge_rpc::Bridge;

/// Identifies a viewer. Allocated in attach order, so the smallest id is the oldest viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(pub u64);

impl fmt::Display for ViewerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "viewer-{}", self.0)
	}
}

pub(crate) struct Viewer {
	pub bridge: Arc<Bridge>,
	pub ready: bool,
}

/// The viewers of one document, ordered by id.
#[derive(Default)]
pub(crate) struct ViewerSet {
	viewers: BTreeMap<ViewerId, Viewer>,
}

impl ViewerSet {
	pub fn insert(&mut self, id: ViewerId, bridge: Arc<Bridge>) {
		self.viewers.insert(id, Viewer { bridge, ready: false });
	}

	pub fn remove(&mut self, id: ViewerId) -> Option<Viewer> {
		self.viewers.remove(&id)
	}

	pub fn bridge(&self, id: ViewerId) -> Option<Arc<Bridge>> {
		self.viewers.get(&id).map(|v| Arc::clone(&v.bridge))
	}

	pub fn mark_ready(&mut self, id: ViewerId) -> bool {
		match self.viewers.get_mut(&id) {
			Some(viewer) => {
				viewer.ready = true;
				true
			}
			None => false,
		}
	}

	/// The authoritative viewer: the oldest one still attached.
	pub fn first(&self) -> Option<(ViewerId, Arc<Bridge>)> {
		self.viewers.iter().next().map(|(id, v)| (*id, Arc::clone(&v.bridge)))
	}

	/// Ready viewers other than `except`.
	pub fn ready_except(&self, except: Option<ViewerId>) -> Vec<(ViewerId, Arc<Bridge>)> {
		self.viewers
			.iter()
			.filter(|(id, v)| v.ready && Some(**id) != except)
			.map(|(id, v)| (*id, Arc::clone(&v.bridge)))
			.collect()
	}

	pub fn ids(&self) -> Vec<ViewerId> {
		self.viewers.keys().copied().collect()
	}

	pub fn drain(&mut self) -> Vec<(ViewerId, Viewer)> {
		std::mem::take(&mut self.viewers).into_iter().collect()
	}
}
