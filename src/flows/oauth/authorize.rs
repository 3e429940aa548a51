//! Callback-side authorization decisions: redirect construction, state checks, and the combined
//! [`Broker::authorize`] step a web middleware runs before protected handlers.

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{OAuthSession, SessionStatus},
	error::ConfigError,
	flows::Broker,
	http::PlatformHttpClient,
};

/// The parts of an inbound web request the authorization step needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackRequest {
	/// Request path, for example `/shop/order`.
	pub path: String,
	/// Raw query string without the leading `?`.
	pub query: Option<String>,
}
impl CallbackRequest {
	/// Creates a request for `path` with no query.
	pub fn new(path: impl Into<String>) -> Self {
		Self { path: path.into(), query: None }
	}

	/// Attaches a raw query string.
	pub fn with_query(mut self, query: impl Into<String>) -> Self {
		self.query = Some(query.into());

		self
	}

	/// Returns the first decoded value of `name`.
	pub fn param(&self, name: &str) -> Option<String> {
		let query = self.query.as_deref()?;

		form_urlencoded::parse(query.as_bytes())
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.into_owned())
	}
}

/// Result of [`Broker::authorize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationOutcome {
	/// The request carries a usable session; let it through.
	Authorized(OAuthSession),
	/// Send the browser to this consent URL.
	Redirect(Url),
}

/// Rebuilds `path?query` with every query segment mentioning `code` removed.
///
/// Matching is a case-insensitive substring test on the raw `name=value` segment, so unrelated
/// parameters such as `barcode=5` or `zipcode=1` are dropped as well. The `?` is always kept.
pub fn callback_target(path: &str, query: Option<&str>) -> String {
	let kept = query
		.unwrap_or_default()
		.split('&')
		.filter(|segment| !segment.is_empty() && !segment.to_lowercase().contains("code"))
		.collect::<Vec<_>>()
		.join("&");

	format!("{path}?{kept}")
}

impl<C> Broker<C>
where
	C: ?Sized + PlatformHttpClient,
{
	/// Builds the consent-page URL that sends the user back to `request` without its code.
	pub fn authorization_url(&self, request: &CallbackRequest) -> Result<Url> {
		let host = self
			.oauth
			.redirect_host
			.as_deref()
			.map(|host| host.trim_end_matches('/'))
			.filter(|host| !host.is_empty())
			.ok_or(ConfigError::MissingSetting { name: "oauth.redirect_host" })?;
		let redirect_uri =
			format!("{host}{}", callback_target(&request.path, request.query.as_deref()));

		Ok(self.endpoints.authorize(&self.app_id, &redirect_uri, self.oauth.scope, self.oauth.state())?)
	}

	/// Checks the `state` echoed by the platform against the configured value, byte for byte.
	///
	/// Always passes when no state is configured.
	pub fn validate_state(&self, returned: Option<&str>) -> Result<()> {
		match self.oauth.state() {
			Some(expected) if returned != Some(expected) => Err(Error::StateMismatch),
			_ => Ok(()),
		}
	}

	/// Decides how to treat a request to an OAuth-protected page.
	///
	/// A still-valid session passes; an expired one is refreshed and dropped if that fails. Without
	/// a session the request either gets a redirect (no `code`) or has its code exchanged after
	/// the state check.
	pub async fn authorize(
		&self,
		existing: Option<OAuthSession>,
		request: &CallbackRequest,
	) -> Result<AuthorizationOutcome> {
		if let Some(mut session) = existing {
			let status = self.refresh_if_needed(&mut session).await;

			if status == SessionStatus::Active {
				return Ok(AuthorizationOutcome::Authorized(session));
			}
		}

		let Some(code) = request.param("code").filter(|code| !code.is_empty()) else {
			return Ok(AuthorizationOutcome::Redirect(self.authorization_url(request)?));
		};

		self.validate_state(request.param("state").as_deref())?;

		Ok(AuthorizationOutcome::Authorized(self.exchange_code(&code).await?))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn code_segments_are_stripped_coarsely() {
		assert_eq!(
			callback_target("/shop", Some("item=1&code=abc&state=s&barcode=5&discount=5&Zipcode=9")),
			"/shop?item=1&state=s&discount=5"
		);
		assert_eq!(callback_target("/shop", None), "/shop?");
		assert_eq!(callback_target("/shop", Some("code=abc")), "/shop?");
	}

	#[test]
	fn params_are_decoded() {
		let request = CallbackRequest::new("/shop").with_query("code=a%2Bb&state=x+y");

		assert_eq!(request.param("code").as_deref(), Some("a+b"));
		assert_eq!(request.param("state").as_deref(), Some("x y"));
		assert_eq!(request.param("missing"), None);
		assert_eq!(CallbackRequest::new("/shop").param("code"), None);
	}
}
