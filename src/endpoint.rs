//! Platform endpoint catalog and URL builders.
//!
//! Every outbound call is a `GET` with its parameters in the query string. Paths are joined onto
//! two base URLs (the API host and the open-platform host serving the consent page) so tests can
//! point both at a mock server.

// self
use crate::{_prelude::*, config::OAuthScope, error::ConfigError};

pub(crate) const ACCESS_TOKEN_PATH: &str = "cgi-bin/token";
pub(crate) const API_TICKET_PATH: &str = "cgi-bin/ticket/getticket";
pub(crate) const CODE_EXCHANGE_PATH: &str = "sns/oauth2/access_token";
pub(crate) const SESSION_REFRESH_PATH: &str = "sns/oauth2/refresh_token";
pub(crate) const SESSION_PROFILE_PATH: &str = "sns/userinfo";
pub(crate) const USER_PROFILE_PATH: &str = "cgi-bin/user/info";
pub(crate) const AUTHORIZE_PATH: &str = "connect/oauth2/authorize";

const PRODUCTION_API: &str = "https://api.weixin.qq.com/";
const PRODUCTION_OPEN: &str = "https://open.weixin.qq.com/";
const PROFILE_LANG: &str = "zh_CN";
const AUTHORIZE_FRAGMENT: &str = "wechat_redirect";

/// Base URLs for the platform's API and authorization hosts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformEndpoints {
	/// Host serving `cgi-bin/*` and `sns/*`.
	pub api: Url,
	/// Host serving the user-facing authorize page.
	pub open: Url,
}
impl PlatformEndpoints {
	/// Production hosts.
	pub fn production() -> Result<Self, ConfigError> {
		let api = Url::parse(PRODUCTION_API).map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let open =
			Url::parse(PRODUCTION_OPEN).map_err(|source| ConfigError::InvalidEndpoint { source })?;

		Ok(Self::new(api, open))
	}

	/// Custom hosts; a trailing `/` is added to each path so joins keep the full base.
	pub fn new(api: Url, open: Url) -> Self {
		Self { api: with_trailing_slash(api), open: with_trailing_slash(open) }
	}

	/// `cgi-bin/token?grant_type=client_credential&appid&secret`.
	pub fn access_token(&self, app_id: &str, app_secret: &str) -> Result<Url, ConfigError> {
		self.api_url(
			ACCESS_TOKEN_PATH,
			&[("grant_type", "client_credential"), ("appid", app_id), ("secret", app_secret)],
		)
	}

	/// `cgi-bin/ticket/getticket?access_token&type=jsapi`.
	pub fn api_ticket(&self, access_token: &str) -> Result<Url, ConfigError> {
		self.api_url(API_TICKET_PATH, &[("access_token", access_token), ("type", "jsapi")])
	}

	/// `sns/oauth2/access_token?appid&secret&code&grant_type=authorization_code`.
	pub fn code_exchange(
		&self,
		app_id: &str,
		app_secret: &str,
		code: &str,
	) -> Result<Url, ConfigError> {
		self.api_url(
			CODE_EXCHANGE_PATH,
			&[
				("appid", app_id),
				("secret", app_secret),
				("code", code),
				("grant_type", "authorization_code"),
			],
		)
	}

	/// `sns/oauth2/refresh_token?appid&grant_type=refresh_token&refresh_token`.
	pub fn session_refresh(&self, app_id: &str, refresh_token: &str) -> Result<Url, ConfigError> {
		self.api_url(
			SESSION_REFRESH_PATH,
			&[("appid", app_id), ("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
		)
	}

	/// `sns/userinfo?access_token&openid&lang=zh_CN` using a per-user session token.
	pub fn session_profile(&self, access_token: &str, open_id: &str) -> Result<Url, ConfigError> {
		self.api_url(
			SESSION_PROFILE_PATH,
			&[("access_token", access_token), ("openid", open_id), ("lang", PROFILE_LANG)],
		)
	}

	/// `cgi-bin/user/info?access_token&openid&lang=zh_CN` using the application access token.
	pub fn user_profile(&self, access_token: &str, open_id: &str) -> Result<Url, ConfigError> {
		self.api_url(
			USER_PROFILE_PATH,
			&[("access_token", access_token), ("openid", open_id), ("lang", PROFILE_LANG)],
		)
	}

	/// Consent page URL ending in `#wechat_redirect`.
	pub fn authorize(
		&self,
		app_id: &str,
		redirect_uri: &str,
		scope: OAuthScope,
		state: Option<&str>,
	) -> Result<Url, ConfigError> {
		let mut url =
			self.open.join(AUTHORIZE_PATH).map_err(|source| ConfigError::InvalidEndpoint { source })?;

		{
			let mut pairs = url.query_pairs_mut();

			pairs
				.append_pair("appid", app_id)
				.append_pair("redirect_uri", redirect_uri)
				.append_pair("response_type", "code")
				.append_pair("scope", scope.as_str());

			if let Some(state) = state {
				pairs.append_pair("state", state);
			}
		}

		url.set_fragment(Some(AUTHORIZE_FRAGMENT));

		Ok(url)
	}

	fn api_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ConfigError> {
		let mut url = self.api.join(path).map_err(|source| ConfigError::InvalidEndpoint { source })?;

		url.query_pairs_mut().extend_pairs(query);

		Ok(url)
	}
}

fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}
