//! Storage contracts and built-in backends for application credentials.
//!
//! A broker owns exactly one [`CredentialStore`], chosen at construction through [`select`] and
//! never switched afterwards. [`MemoryStore`] keeps one credential per kind inside the process;
//! [`CacheStore`] delegates to an external [`KeyValueCache`] and keeps nothing locally, so several
//! deployments of the same account can share one token.

pub mod cache;
pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use cache::{CacheStore, DEFAULT_CACHE_TTL, KeyValueCache, LocalCache};
pub use memory::MemoryStore;
#[cfg(feature = "redis")] pub use self::redis::RedisCache;

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialKind, TokenSecret},
	config::PlatformConfig,
	error::ConfigError,
};

/// Boxed future returned by store and cache operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Which backend a store writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreMode {
	/// Credentials live in process memory.
	Memory,
	/// Credentials live in an external key-value cache.
	Cache,
}

/// Storage backend contract for application credentials.
///
/// Only the broker's refresh path calls [`CredentialStore::put`]; everything else reads.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Backend mode, fixed for the lifetime of the store.
	fn mode(&self) -> StoreMode;

	/// Returns the value for `kind` if one is present, non-empty, and not expired.
	fn load(&self, kind: CredentialKind) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Writes a freshly issued value whose `validity` already excludes the safety margin.
	fn put(
		&self,
		kind: CredentialKind,
		value: TokenSecret,
		validity: Duration,
	) -> StoreFuture<'_, Credential>;
}

/// Error type produced by [`CredentialStore`] and [`KeyValueCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Backend-level failure (cache unreachable, command rejected).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Picks the store for `config`.
///
/// Cache mode requires a `cache` backend; memory mode ignores it.
pub fn select(
	config: &PlatformConfig,
	cache: Option<Arc<dyn KeyValueCache>>,
) -> Result<Arc<dyn CredentialStore>, ConfigError> {
	if !config.cache.enabled {
		return Ok(Arc::new(MemoryStore::default()));
	}

	let cache = cache.ok_or(ConfigError::CacheBackendRequired)?;
	let prefix =
		config.cache.root_prefix().ok_or(ConfigError::MissingSetting { name: "cache.root_key" })?;

	Ok(Arc::new(CacheStore::new(cache, prefix)))
}

/// Picks the store for `config`, connecting to Redis when cache mode is enabled.
#[cfg(feature = "redis")]
pub fn from_config(config: &PlatformConfig) -> Result<Arc<dyn CredentialStore>, ConfigError> {
	let cache: Option<Arc<dyn KeyValueCache>> = if config.cache.enabled {
		Some(Arc::new(RedisCache::from_settings(&config.cache)?))
	} else {
		None
	};

	select(config, cache)
}
