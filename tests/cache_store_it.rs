// crates.io
use httpmock::prelude::*;
// self
use wechat_broker::{
	_preludet::*,
	auth::CredentialKind,
	config::CacheSettings,
	flows::Broker,
	store::{
		self, CacheStore, CredentialStore, KeyValueCache, LocalCache, StoreError, StoreFuture,
		StoreMode,
	},
};

/// Cache whose backend is always unreachable.
struct UnreachableCache;
impl KeyValueCache for UnreachableCache {
	fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async { Err(StoreError::Backend { message: "connection refused".into() }) })
	}

	fn set_ex<'a>(&'a self, _key: &'a str, _value: &'a str, _ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "connection refused".into() }) })
	}
}

fn cache_config() -> wechat_broker::config::PlatformConfig {
	test_config().with_cache(CacheSettings::enabled("127.0.0.1", "shop"))
}

fn cache_broker(base_url: &str, cache: Arc<dyn KeyValueCache>) -> ReqwestTestBroker {
	let config = cache_config();
	let store = store::select(&config, Some(cache)).expect("Cache store should be selected.");

	assert_eq!(store.mode(), StoreMode::Cache);

	Broker::with_http_client(&config, store, test_reqwest_http_client())
		.expect("Cache configuration should be valid.")
		.with_endpoints(test_endpoints(base_url))
}

#[tokio::test]
async fn deployments_share_credentials_through_the_cache() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"shared-token","expires_in":7200}"#);
		})
		.await;
	let cache = LocalCache::default();
	let first = cache_broker(&server.base_url(), Arc::new(cache.clone()));
	let second = cache_broker(&server.base_url(), Arc::new(cache.clone()));

	assert_eq!(first.credential(CredentialKind::AccessToken).await.expose(), "shared-token");
	assert_eq!(second.credential(CredentialKind::AccessToken).await.expose(), "shared-token");

	mock.assert_calls_async(1).await;

	assert_eq!(
		cache.get("shop.ACCESS_TOKEN").await.expect("Local cache read should succeed.").as_deref(),
		Some("shared-token")
	);
}

#[tokio::test]
async fn cache_entries_expire_after_validity() {
	let cache = Arc::new(LocalCache::default());
	let store = CacheStore::new(cache.clone(), "shop");
	let written = store
		.put(
			CredentialKind::AccessToken,
			wechat_broker::auth::TokenSecret::new("short-lived"),
			Duration::seconds(1),
		)
		.await
		.expect("Cache write should succeed.");

	assert_eq!(written.validity, Duration::seconds(1));
	assert!(
		store
			.load(CredentialKind::AccessToken)
			.await
			.expect("Cache read should succeed.")
			.is_some()
	);

	tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

	assert!(
		store
			.load(CredentialKind::AccessToken)
			.await
			.expect("Cache read should succeed.")
			.is_none()
	);
}

#[tokio::test]
async fn unreachable_cache_surfaces_as_storage_error() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200).body(r#"{"access_token":"token","expires_in":7200}"#);
		})
		.await;
	let broker = cache_broker(&server.base_url(), Arc::new(UnreachableCache));
	let err = broker
		.try_credential(CredentialKind::AccessToken)
		.await
		.expect_err("Cache failures should surface through the fallible read.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })));
	assert!(broker.credential(CredentialKind::AccessToken).await.is_empty());

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn cache_mode_without_backend_fails_startup() {
	let err = store::select(&cache_config(), None)
		.err()
		.expect("Cache mode without a backend must fail.");

	assert!(Error::from(err).is_fatal());
}
