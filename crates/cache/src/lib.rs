//! Versioned asset cache.
//!
//! Every build carries a token; responses are stored in the cache named
//! `prefix + token`. Activating a build deletes every other cache with the same
//! prefix, so at most one generation stays resident.
//!
//! ```text
//!  fetch(req)
//!    ├─ not https, or cache = no-store ──► network
//!    ├─ hit in storage ──────────────────► stored copy
//!    └─ miss ──► network ──► put(prefix + token) ──► response
//! ```

#![warn(missing_docs)]

mod error;
mod fetch;
mod storage;
mod versioned;

pub use error::{CacheError, Result};
pub use fetch::{CachedResponse, Fetch, FetchRequest, RequestCache};
pub use storage::CacheStorage;
pub use versioned::{BUILD_TOKEN_ENV, VersionedCache, generate_token};
