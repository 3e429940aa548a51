//! Redis-backed [`KeyValueCache`].

// crates.io
use ::redis::{AsyncCommands, Client, RedisError, aio::MultiplexedConnection};
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	config::CacheSettings,
	error::ConfigError,
	store::{KeyValueCache, StoreError, StoreFuture},
};

const DEFAULT_PORT: u16 = 6379;

/// Shares credentials through a Redis server; the connection opens on first use.
pub struct RedisCache {
	client: Client,
	connection: OnceCell<MultiplexedConnection>,
}
impl RedisCache {
	/// Creates a cache for `redis://{host}:{port}/`.
	pub fn new(host: &str, port: u16) -> Result<Self, ConfigError> {
		let client = Client::open(format!("redis://{host}:{port}/")).map_err(|e| {
			ConfigError::InvalidSetting { name: "cache.host", reason: e.to_string() }
		})?;

		Ok(Self { client, connection: OnceCell::new() })
	}

	/// Creates a cache from the configured host and port.
	pub fn from_settings(settings: &CacheSettings) -> Result<Self, ConfigError> {
		let host = settings
			.host
			.as_deref()
			.filter(|host| !host.trim().is_empty())
			.ok_or(ConfigError::MissingSetting { name: "cache.host" })?;

		Self::new(host, settings.port.unwrap_or(DEFAULT_PORT))
	}

	async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
		self.connection
			.get_or_try_init(|| async {
				self.client.get_multiplexed_async_connection().await.map_err(backend)
			})
			.await
			.cloned()
	}
}
impl Debug for RedisCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedisCache")
			.field("connected", &self.connection.is_initialized())
			.finish()
	}
}
impl KeyValueCache for RedisCache {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let mut conn = self.connection().await?;

			conn.get::<_, Option<String>>(key).await.map_err(backend)
		})
	}

	fn set_ex<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut conn = self.connection().await?;
			let secs = u64::try_from(ttl.whole_seconds()).unwrap_or_default().max(1);

			conn.set_ex::<_, _, ()>(key, value, secs).await.map_err(backend)
		})
	}
}

fn backend(e: RedisError) -> StoreError {
	StoreError::Backend { message: e.to_string() }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn settings_without_host_are_rejected() {
		let err = RedisCache::from_settings(&CacheSettings::default())
			.err()
			.expect("Missing host must fail.");

		assert!(matches!(err, ConfigError::MissingSetting { name: "cache.host" }));
	}

	#[test]
	fn client_opens_lazily() {
		let cache = RedisCache::from_settings(&CacheSettings::enabled("127.0.0.1", "app"))
			.expect("Redis URL should parse without connecting.");

		assert!(format!("{cache:?}").contains("connected: false"));
	}
}
