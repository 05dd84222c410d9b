//! Throttled change notification.
//!
//! The tracker compares engine state versions against the last version the shell
//! has seen (through a `notifyDirty` or a workspace flush). The first unseen change
//! opens a window; when the window's deadline passes, the version is re-read and a
//! single notification covers every change made so far.
//!
//! ```text
//!            observe(v1)            observe(v2)        deadline
//!  Idle ─────────┬─────── Busy ─────────┬──────────────────┬──── Idle
//!                │    (deadline fixed)  │                  │
//!                └── arm deadline       └── no extension   └── fire(v2) -> notify v2
//! ```
//!
//! # Invariants
//!
//! - At most one window is armed at a time.
//! - A window is never extended by later changes.
//! - `fire` notifies only when the re-read version differs from the acknowledged one.
//! - `acknowledge` closes the window; changes newer than the acknowledged version
//!   re-open it immediately so none is lost.

use std::time::Duration;

use pixbridge_engine::StateVersion;
use tokio::time::Instant;
use tracing::trace;


/// Window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// No unseen change.
	Idle,
	/// Unseen changes; notify at `deadline`.
	Busy {
		/// When the window closes.
		deadline: Instant,
	},
}

/// Tracks unseen engine changes and decides when to emit `notifyDirty`.
#[derive(Debug, Clone)]
pub struct DirtyTracker {
	interval: Duration,
	acknowledged: StateVersion,
	observed: StateVersion,
	phase: Phase,
}

impl DirtyTracker {
	/// Creates a tracker that treats `initial` as already seen.
	pub fn new(interval: Duration, initial: StateVersion) -> Self {
		Self {
			interval,
			acknowledged: initial,
			observed: initial,
			phase: Phase::Idle,
		}
	}

	/// Current window state.
	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Deadline of the armed window, if any.
	pub fn deadline(&self) -> Option<Instant> {
		match self.phase {
			Phase::Idle => None,
			Phase::Busy { deadline } => Some(deadline),
		}
	}

	/// True while the engine holds changes the shell has not seen.
	pub fn is_dirty(&self) -> bool {
		self.observed != self.acknowledged
	}

	/// Records the version read after an engine step.
	pub fn observe(&mut self, version: StateVersion, now: Instant) {
		self.observed = self.observed.max(version);
		if self.is_dirty() && self.phase == Phase::Idle {
			let deadline = now + self.interval;
			trace!(version = %self.observed, interval_ms = self.interval.as_millis() as u64, "dirty.window.armed");
			self.phase = Phase::Busy { deadline };
		}
	}

	/// Closes the window. Returns the version to announce, if it changed.
	///
	/// `version` must be read in the same handler, after the deadline passed.
	pub fn fire(&mut self, version: StateVersion) -> Option<StateVersion> {
		self.observed = self.observed.max(version);
		self.phase = Phase::Idle;
		if !self.is_dirty() {
			trace!(version = %self.observed, "dirty.window.clean");
			return None;
		}
		self.acknowledged = self.observed;
		Some(self.acknowledged)
	}

	/// Marks `version` as seen by the shell, closing any armed window.
	pub fn acknowledge(&mut self, version: StateVersion, now: Instant) {
		self.acknowledged = self.acknowledged.max(version);
		self.observed = self.observed.max(self.acknowledged);
		self.phase = Phase::Idle;
		if self.is_dirty() {
			self.phase = Phase::Busy { deadline: now + self.interval };
		}
	}
}
