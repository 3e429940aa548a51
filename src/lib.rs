//! WeChat Official Account broker: cached access tokens and API tickets, OAuth web sessions, and
//! signed/encrypted callback channels behind one explicitly constructed context.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod channel;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::PlatformConfig,
		endpoint::PlatformEndpoints,
		flows::Broker,
		http::ReqwestHttpClient,
		store::{CredentialStore, MemoryStore},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient>;

	/// Application identifier shared by test fixtures.
	pub const TEST_APP_ID: &str = "wxb11529c136998cb6";
	/// Application secret shared by test fixtures.
	pub const TEST_APP_SECRET: &str = "secret-test";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.timeout(std::time::Duration::from_secs(5))
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Returns a minimal valid configuration for tests.
	pub fn test_config() -> PlatformConfig {
		PlatformConfig::new(TEST_APP_ID, TEST_APP_SECRET)
	}

	/// Points both platform hosts at a mock server base URL.
	pub fn test_endpoints(base_url: &str) -> PlatformEndpoints {
		let base = Url::parse(base_url).expect("Mock server base URL should parse.");

		PlatformEndpoints::new(base.clone(), base)
	}

	/// Constructs a [`Broker`] backed by an in-memory store and the reqwest transport used across
	/// integration tests.
	pub fn build_reqwest_test_broker(
		base_url: &str,
		config: PlatformConfig,
	) -> (ReqwestTestBroker, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let broker = Broker::with_http_client(&config, store, test_reqwest_http_client())
			.expect("Test broker configuration should be valid.")
			.with_endpoints(test_endpoints(base_url));

		(broker, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
