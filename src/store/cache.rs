//! External key-value cache contract and the cache-backed [`CredentialStore`].
//!
//! Entries are keyed `{root_prefix}{SUFFIX}` (for example `app.ACCESS_TOKEN`) and written with a
//! time-to-live equal to the credential validity, so a missing key and an expired key look the
//! same to readers.

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialKind, TokenSecret},
	store::{CredentialStore, StoreFuture, StoreMode},
};

/// Time-to-live applied by [`KeyValueCache::set`].
pub const DEFAULT_CACHE_TTL: Duration = Duration::seconds(3600);

/// Minimal string cache used for cross-process credential sharing.
pub trait KeyValueCache
where
	Self: Send + Sync,
{
	/// Returns the live value stored under `key`.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores `value` under `key`, expiring after `ttl`.
	fn set_ex<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> StoreFuture<'a, ()>;

	/// Stores `value` under `key` with [`DEFAULT_CACHE_TTL`].
	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
		self.set_ex(key, value, DEFAULT_CACHE_TTL)
	}
}

/// In-process [`KeyValueCache`] honoring per-entry expiry.
#[derive(Clone, Debug, Default)]
pub struct LocalCache(Arc<Mutex<HashMap<String, (String, OffsetDateTime)>>>);
impl LocalCache {
	/// Number of entries currently held, expired ones included.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when no entries are held.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}

	fn get_at(&self, key: &str, now: OffsetDateTime) -> Option<String> {
		let mut entries = self.0.lock();
		let live = entries
			.get(key)
			.map(|(value, expires_at)| if now < *expires_at { Some(value.clone()) } else { None });

		match live {
			Some(Some(value)) => Some(value),
			Some(None) => {
				entries.remove(key);

				None
			},
			None => None,
		}
	}

	fn set_at(&self, key: &str, value: &str, ttl: Duration, now: OffsetDateTime) {
		self.0.lock().insert(key.to_owned(), (value.to_owned(), now.saturating_add(ttl)));
	}
}
impl KeyValueCache for LocalCache {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.get_at(key, OffsetDateTime::now_utc())) })
	}

	fn set_ex<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.set_at(key, value, ttl, OffsetDateTime::now_utc());

			Ok(())
		})
	}
}

/// [`CredentialStore`] that delegates every read and write to a [`KeyValueCache`].
#[derive(Clone)]
pub struct CacheStore {
	cache: Arc<dyn KeyValueCache>,
	prefix: String,
}
impl CacheStore {
	/// Creates a store writing under `prefix`; a trailing `.` is added when missing.
	pub fn new(cache: Arc<dyn KeyValueCache>, prefix: impl Into<String>) -> Self {
		let mut prefix = prefix.into();

		if !prefix.ends_with('.') {
			prefix.push('.');
		}

		Self { cache, prefix }
	}

	/// Cache key for `kind`.
	pub fn key(&self, kind: CredentialKind) -> String {
		format!("{}{}", self.prefix, kind.cache_suffix())
	}
}
impl Debug for CacheStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CacheStore").field("prefix", &self.prefix).finish()
	}
}
impl CredentialStore for CacheStore {
	fn mode(&self) -> StoreMode {
		StoreMode::Cache
	}

	fn load(&self, kind: CredentialKind) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			let key = self.key(kind);
			let value = self.cache.get(&key).await?;

			Ok(value.filter(|value| !value.is_empty()).map(TokenSecret::new))
		})
	}

	fn put(
		&self,
		kind: CredentialKind,
		value: TokenSecret,
		validity: Duration,
	) -> StoreFuture<'_, Credential> {
		Box::pin(async move {
			let key = self.key(kind);

			self.cache.set_ex(&key, value.expose(), validity).await?;

			Ok(Credential { kind, value, issued_at: OffsetDateTime::now_utc(), validity })
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn local_cache_honors_expiry() {
		let cache = LocalCache::default();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		cache.set_at("app.ACCESS_TOKEN", "token", Duration::seconds(10), now);

		assert_eq!(
			cache.get_at("app.ACCESS_TOKEN", now + Duration::seconds(9)).as_deref(),
			Some("token")
		);
		assert_eq!(cache.get_at("app.ACCESS_TOKEN", now + Duration::seconds(10)), None);
		assert!(cache.is_empty());
	}

	#[test]
	fn keys_use_the_normalized_prefix() {
		let store = CacheStore::new(Arc::new(LocalCache::default()), "shop");

		assert_eq!(store.key(CredentialKind::AccessToken), "shop.ACCESS_TOKEN");
		assert_eq!(store.key(CredentialKind::ApiTicket), "shop.JS_TICKET");
	}

	#[tokio::test]
	async fn store_writes_through_without_local_retention() {
		let cache = LocalCache::default();
		let store = CacheStore::new(Arc::new(cache.clone()), "shop.");

		store
			.put(CredentialKind::ApiTicket, TokenSecret::new("ticket"), Duration::seconds(6300))
			.await
			.expect("Cache put should succeed.");

		assert_eq!(cache.len(), 1);

		let loaded = store
			.load(CredentialKind::ApiTicket)
			.await
			.expect("Cache load should succeed.")
			.expect("Written ticket should be served.");

		assert_eq!(loaded.expose(), "ticket");

		cache.0.lock().clear();

		assert!(
			store.load(CredentialKind::ApiTicket).await.expect("Cache load should succeed.").is_none()
		);
	}

	#[tokio::test]
	async fn default_set_applies_one_hour_ttl() {
		let cache = LocalCache::default();

		cache.set("k", "v").await.expect("Local set should succeed.");

		let expires_at = cache.0.lock().get("k").map(|(_, at)| *at).expect("Entry should exist.");
		let remaining = expires_at - OffsetDateTime::now_utc();

		assert!(remaining > Duration::seconds(3590) && remaining <= DEFAULT_CACHE_TTL);
	}
}
