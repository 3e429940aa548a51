//! Platform flows coordinated by the [`Broker`] context.

pub mod common;
pub mod oauth;
pub mod page;
pub mod refresh;

pub use common::PlatformStatus;
pub use oauth::*;
pub use page::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{AppId, CredentialKind},
	config::{OAuthSettings, PlatformConfig},
	endpoint::PlatformEndpoints,
	error::ConfigError,
	http::PlatformHttpClient,
	store::{CredentialStore, StoreMode},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport.
pub type ReqwestBroker = Broker<ReqwestHttpClient>;

/// Long-lived context shared by every platform operation.
///
/// Construct one per Official Account at startup and pass it (or an `Arc` of it) to request
/// handlers. The broker owns the HTTP transport, the credential store, and the per-kind refresh
/// guards; OAuth sessions stay with the caller.
pub struct Broker<C>
where
	C: ?Sized + PlatformHttpClient,
{
	/// HTTP client used for every outbound platform request.
	pub http_client: Arc<C>,
	/// Credential store selected at construction.
	pub store: Arc<dyn CredentialStore>,
	/// Platform base URLs.
	pub endpoints: PlatformEndpoints,
	/// Application identifier.
	pub app_id: AppId,
	/// Seconds removed from every platform-reported lifetime.
	pub safety_margin: Duration,
	/// OAuth web-authorization settings.
	pub oauth: OAuthSettings,
	/// Shared counters for outbound credential refreshes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	app_secret: String,
	flow_guards: Arc<Mutex<HashMap<CredentialKind, Arc<AsyncMutex<()>>>>>,
}
impl<C> Broker<C>
where
	C: ?Sized + PlatformHttpClient,
{
	/// Creates a broker over a caller-provided transport after validating `config`.
	///
	/// `store` must run in the mode `config.cache.enabled` selects; [`crate::store::select`]
	/// builds a matching one. The transport is used as given, so it must enforce its own timeout.
	pub fn with_http_client(
		config: &PlatformConfig,
		store: Arc<dyn CredentialStore>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		config.validate()?;

		let configured = if config.cache.enabled { StoreMode::Cache } else { StoreMode::Memory };
		let actual = store.mode();

		if actual != configured {
			return Err(ConfigError::InvalidSetting {
				name: "cache.enabled",
				reason: format!("store runs in {actual:?} mode but {configured:?} is configured"),
			}
			.into());
		}

		let app_id = AppId::new(&config.app_id).map_err(|e| ConfigError::InvalidSetting {
			name: "app_id",
			reason: e.to_string(),
		})?;

		Ok(Self {
			http_client: http_client.into(),
			store,
			endpoints: PlatformEndpoints::production()?,
			app_id,
			safety_margin: config.safety_margin(),
			oauth: config.oauth.clone(),
			refresh_metrics: Default::default(),
			app_secret: config.app_secret.clone(),
			flow_guards: Default::default(),
		})
	}

	/// Replaces the platform base URLs.
	pub fn with_endpoints(mut self, endpoints: PlatformEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	pub(crate) fn app_secret(&self) -> &str {
		&self.app_secret
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient> {
	/// Creates a broker with its own reqwest transport using `http_timeout_secs`.
	pub fn new(config: &PlatformConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		let http_client = ReqwestHttpClient::new(config.http_timeout())?;

		Self::with_http_client(config, store, http_client)
	}
}
impl<C> Clone for Broker<C>
where
	C: ?Sized + PlatformHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			store: self.store.clone(),
			endpoints: self.endpoints.clone(),
			app_id: self.app_id.clone(),
			safety_margin: self.safety_margin,
			oauth: self.oauth.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			app_secret: self.app_secret.clone(),
			flow_guards: self.flow_guards.clone(),
		}
	}
}
impl<C> Debug for Broker<C>
where
	C: ?Sized + PlatformHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("app_id", &self.app_id)
			.field("app_secret", &"<redacted>")
			.field("store_mode", &self.store.mode())
			.field("endpoints", &self.endpoints)
			.field("safety_margin", &self.safety_margin)
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{
		config::CacheSettings,
		store::{self, LocalCache, MemoryStore},
	};

	#[test]
	fn construction_validates_configuration() {
		let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
		let err = ReqwestBroker::new(&PlatformConfig::new("wx123", ""), store.clone())
			.expect_err("Missing secret must abort construction.");

		assert!(err.is_fatal());

		let broker = ReqwestBroker::new(&PlatformConfig::new("wx123", "secret"), store)
			.expect("Valid configuration should build a broker.");
		let rendered = format!("{broker:?}");

		assert!(rendered.contains("wx123"));
		assert!(!rendered.contains("secret\""));
		assert_eq!(broker.safety_margin, Duration::seconds(900));
	}

	#[test]
	fn clones_share_refresh_guards() {
		let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
		let broker = ReqwestBroker::new(&PlatformConfig::new("wx123", "secret"), store)
			.expect("Valid configuration should build a broker.");
		let clone = broker.clone();

		assert!(Arc::ptr_eq(&broker.flow_guards, &clone.flow_guards));
		assert!(Arc::ptr_eq(&broker.refresh_metrics, &clone.refresh_metrics));
	}

	#[test]
	fn store_mode_must_match_cache_setting() {
		let config = PlatformConfig::new("wx123", "secret")
			.with_cache(CacheSettings::enabled("127.0.0.1", "shop"));
		let memory: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
		let err = ReqwestBroker::new(&config, memory.clone())
			.expect_err("Cache mode on a memory store must abort construction.");

		assert!(err.is_fatal());
		assert!(matches!(err, Error::Config(ConfigError::InvalidSetting { name: "cache.enabled", .. })));

		let cached = store::select(&config, Some(Arc::new(LocalCache::default())))
			.expect("Cache store should be selected.");

		assert!(ReqwestBroker::new(&config, cached.clone()).is_ok());
		assert!(ReqwestBroker::new(&PlatformConfig::new("wx123", "secret"), cached).is_err());
		assert!(ReqwestBroker::new(&PlatformConfig::new("wx123", "secret"), memory).is_ok());
	}
}
