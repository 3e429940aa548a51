//! Configuration surface consumed by the broker and the callback channel.
//!
//! Loading the values (files, environment, secret managers) is the host application's job; the
//! structs derive [`Deserialize`] so any serde format can feed them. [`PlatformConfig::validate`]
//! runs when a [`Broker`](crate::flows::Broker) is constructed and rejects incomplete settings
//! before the first request.

// self
use crate::{_prelude::*, auth::DEFAULT_SAFETY_MARGIN, error::ConfigError};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Authorization scope requested on the platform authorize page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthScope {
	/// `snsapi_base`: silent authorization, openid only.
	Base,
	#[default]
	/// `snsapi_userinfo`: consent page, profile access.
	UserInfo,
}
impl OAuthScope {
	/// Returns the platform scope identifier.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Base => "snsapi_base",
			Self::UserInfo => "snsapi_userinfo",
		}
	}
}

/// Top-level broker configuration.
#[derive(Clone, Deserialize)]
pub struct PlatformConfig {
	/// Official Account application identifier.
	pub app_id: String,
	/// Official Account application secret.
	pub app_secret: String,
	/// Seconds subtracted from every platform-reported lifetime.
	#[serde(default = "default_safety_margin_secs")]
	pub safety_margin_secs: i64,
	/// Timeout applied to every outbound platform call.
	#[serde(default = "default_http_timeout_secs")]
	pub http_timeout_secs: u64,
	/// External cache settings.
	#[serde(default)]
	pub cache: CacheSettings,
	/// OAuth web-authorization settings.
	#[serde(default)]
	pub oauth: OAuthSettings,
	/// Callback channel settings.
	#[serde(default)]
	pub channel: ChannelSettings,
}
impl PlatformConfig {
	/// Creates a configuration with default margin, timeout, and in-memory credential storage.
	pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
		Self {
			app_id: app_id.into(),
			app_secret: app_secret.into(),
			safety_margin_secs: default_safety_margin_secs(),
			http_timeout_secs: default_http_timeout_secs(),
			cache: CacheSettings::default(),
			oauth: OAuthSettings::default(),
			channel: ChannelSettings::default(),
		}
	}

	/// Overrides the safety margin.
	pub fn with_safety_margin_secs(mut self, secs: i64) -> Self {
		self.safety_margin_secs = secs;

		self
	}

	/// Overrides the outbound request timeout.
	pub fn with_http_timeout_secs(mut self, secs: u64) -> Self {
		self.http_timeout_secs = secs;

		self
	}

	/// Replaces the cache settings.
	pub fn with_cache(mut self, cache: CacheSettings) -> Self {
		self.cache = cache;

		self
	}

	/// Replaces the OAuth settings.
	pub fn with_oauth(mut self, oauth: OAuthSettings) -> Self {
		self.oauth = oauth;

		self
	}

	/// Replaces the channel settings.
	pub fn with_channel(mut self, channel: ChannelSettings) -> Self {
		self.channel = channel;

		self
	}

	/// Checks that mandatory settings are present and consistent.
	pub fn validate(&self) -> Result<(), ConfigError> {
		require("app_id", &self.app_id)?;
		require("app_secret", &self.app_secret)?;

		if self.safety_margin_secs < 0 {
			return Err(ConfigError::InvalidSetting {
				name: "safety_margin_secs",
				reason: "must not be negative".into(),
			});
		}
		if self.http_timeout_secs == 0 {
			return Err(ConfigError::InvalidSetting {
				name: "http_timeout_secs",
				reason: "must be positive".into(),
			});
		}
		if self.cache.enabled {
			require("cache.host", self.cache.host.as_deref().unwrap_or_default())?;
			require("cache.root_key", self.cache.root_key.as_deref().unwrap_or_default())?;
		}

		Ok(())
	}

	/// Safety margin as a duration.
	pub fn safety_margin(&self) -> Duration {
		Duration::seconds(self.safety_margin_secs)
	}

	/// Outbound request timeout.
	pub fn http_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.http_timeout_secs)
	}

	/// Application identifier expected inside encrypted payloads.
	pub fn message_app_id(&self) -> &str {
		self.channel.message_app_id.as_deref().filter(|id| !id.is_empty()).unwrap_or(&self.app_id)
	}
}
impl Debug for PlatformConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PlatformConfig")
			.field("app_id", &self.app_id)
			.field("app_secret", &"<redacted>")
			.field("safety_margin_secs", &self.safety_margin_secs)
			.field("http_timeout_secs", &self.http_timeout_secs)
			.field("cache", &self.cache)
			.field("oauth", &self.oauth)
			.field("channel", &self.channel)
			.finish()
	}
}

/// External key-value cache settings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CacheSettings {
	/// Stores credentials in the external cache instead of process memory.
	#[serde(default)]
	pub enabled: bool,
	/// Cache host name.
	pub host: Option<String>,
	/// Cache port; the backend default applies when absent.
	pub port: Option<u16>,
	/// Key prefix isolating this application inside a shared cache.
	pub root_key: Option<String>,
}
impl CacheSettings {
	/// Enables the external cache at `host` with the provided key prefix.
	pub fn enabled(host: impl Into<String>, root_key: impl Into<String>) -> Self {
		Self { enabled: true, host: Some(host.into()), port: None, root_key: Some(root_key.into()) }
	}

	/// Key prefix normalized to end with `.`.
	pub fn root_prefix(&self) -> Option<String> {
		let root = self.root_key.as_deref().filter(|root| !root.is_empty())?;

		Some(if root.ends_with('.') { root.to_owned() } else { format!("{root}.") })
	}
}

/// OAuth web-authorization settings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OAuthSettings {
	/// Anti-CSRF value echoed by the platform; unchecked when absent or empty.
	pub state: Option<String>,
	/// Scheme and host prepended to callback paths (for example `https://m.example.com`).
	pub redirect_host: Option<String>,
	/// Scope requested on the authorize page.
	#[serde(default)]
	pub scope: OAuthScope,
}
impl OAuthSettings {
	/// Creates settings for the provided callback host.
	pub fn new(redirect_host: impl Into<String>) -> Self {
		Self { redirect_host: Some(redirect_host.into()), ..Self::default() }
	}

	/// Sets the anti-CSRF state value.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Sets the requested scope.
	pub fn with_scope(mut self, scope: OAuthScope) -> Self {
		self.scope = scope;

		self
	}

	/// Configured state, treating an empty value as absent.
	pub fn state(&self) -> Option<&str> {
		self.state.as_deref().filter(|state| !state.is_empty())
	}
}

/// Callback channel settings.
#[derive(Clone, Default, Deserialize)]
pub struct ChannelSettings {
	/// Verification token shared with the platform console.
	pub token: Option<String>,
	/// 43-character base64 message encryption key.
	pub encoding_aes_key: Option<String>,
	/// Application identifier embedded in encrypted payloads; defaults to `app_id`.
	pub message_app_id: Option<String>,
}
impl ChannelSettings {
	/// Creates settings with the provided verification token.
	pub fn new(token: impl Into<String>) -> Self {
		Self { token: Some(token.into()), ..Self::default() }
	}

	/// Sets the message encryption key.
	pub fn with_encoding_aes_key(mut self, key: impl Into<String>) -> Self {
		self.encoding_aes_key = Some(key.into());

		self
	}
}
impl Debug for ChannelSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ChannelSettings")
			.field("token_set", &self.token.is_some())
			.field("encoding_aes_key_set", &self.encoding_aes_key.is_some())
			.field("message_app_id", &self.message_app_id)
			.finish()
	}
}

fn require(name: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() { Err(ConfigError::MissingSetting { name }) } else { Ok(()) }
}

fn default_safety_margin_secs() -> i64 {
	DEFAULT_SAFETY_MARGIN.whole_seconds()
}

fn default_http_timeout_secs() -> u64 {
	DEFAULT_HTTP_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_apply_when_deserializing() {
		let config: PlatformConfig =
			serde_json::from_str(r#"{"app_id":"wx123","app_secret":"secret"}"#)
				.expect("Minimal configuration should deserialize.");

		assert_eq!(config.safety_margin_secs, 900);
		assert_eq!(config.http_timeout(), std::time::Duration::from_secs(10));
		assert!(!config.cache.enabled);
		assert_eq!(config.oauth.scope, OAuthScope::UserInfo);
		assert_eq!(config.message_app_id(), "wx123");
		assert!(config.validate().is_ok());
	}

	#[test]
	fn missing_credentials_are_fatal() {
		let err = PlatformConfig::new("", "secret").validate().expect_err("Blank app id must fail.");

		assert!(matches!(err, ConfigError::MissingSetting { name: "app_id" }));

		let err = PlatformConfig::new("wx123", " ")
			.validate()
			.expect_err("Blank app secret must fail.");

		assert!(matches!(err, ConfigError::MissingSetting { name: "app_secret" }));
	}

	#[test]
	fn cache_mode_requires_host_and_root_key() {
		let mut cache = CacheSettings::enabled("127.0.0.1", "app");

		cache.root_key = None;

		let err = PlatformConfig::new("wx123", "secret")
			.with_cache(cache)
			.validate()
			.expect_err("Cache mode without a root key must fail.");

		assert!(matches!(err, ConfigError::MissingSetting { name: "cache.root_key" }));
		assert_eq!(
			CacheSettings::enabled("127.0.0.1", "app").root_prefix().as_deref(),
			Some("app.")
		);
		assert_eq!(
			CacheSettings::enabled("127.0.0.1", "app.").root_prefix().as_deref(),
			Some("app.")
		);
	}

	#[test]
	fn negative_margin_is_rejected() {
		let err = PlatformConfig::new("wx123", "secret")
			.with_safety_margin_secs(-1)
			.validate()
			.expect_err("Negative margin must fail.");

		assert!(matches!(err, ConfigError::InvalidSetting { name: "safety_margin_secs", .. }));
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let config = PlatformConfig::new("wx123", "very-secret")
			.with_channel(ChannelSettings::new("token-secret").with_encoding_aes_key("aes-secret"));
		let rendered = format!("{config:?}");

		assert!(!rendered.contains("very-secret"));
		assert!(!rendered.contains("token-secret"));
		assert!(!rendered.contains("aes-secret"));
	}

	#[test]
	fn empty_state_counts_as_unset() {
		let oauth = OAuthSettings::new("https://m.example.com").with_state("");

		assert_eq!(oauth.state(), None);
		assert_eq!(OAuthSettings::default().with_state("csrf").state(), Some("csrf"));
	}
}
