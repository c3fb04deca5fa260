//! Suspense-style resources and a keyed, expiring cache of them.
//!
//! A [`Resource`] wraps a single asynchronous operation that is started eagerly on creation.
//! Its [`read`](Resource::read) never blocks: it either hands out the resolved value, the
//! failure reason, or a [`Suspended`] handle that completes once the operation has settled,
//! after which the caller is expected to read again.
//!
//! A [`ResourceCache`] stores resources under case-insensitive [`CacheKey`]s. Every lookup
//! pushes the entry's expiration to `now + ttl`, and a background sweep owned by the cache
//! periodically evicts entries that have not been looked up in time. Evicted resources keep
//! running and stay usable through any handle that is still alive, they are just no longer
//! reachable by key.
//!
//! ```no_run
//! use resource_cache::{CacheConfig, Read, ResourceCache};
//!
//! # async fn fetch(name: String) -> Result<String, String> { Ok(name) }
//! # async fn run() -> Result<(), resource_cache::MisuseError> {
//! let cache = ResourceCache::new(CacheConfig::default())?;
//! let resource = cache.get_or_spawn("Pikachu", |name| fetch(name.to_owned()));
//!
//! loop {
//!     match resource.read() {
//!         Read::Ready(pokemon) => break println!("{pokemon}"),
//!         Read::Failed(error) => break eprintln!("{error}"),
//!         Read::Pending(suspended) => suspended.await,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod key;
mod resource;

pub use cache::ResourceCache;
pub use config::CacheConfig;
pub use error::MisuseError;
pub use key::CacheKey;
pub use resource::{Read, Resource, ResourceStatus, Suspended};
