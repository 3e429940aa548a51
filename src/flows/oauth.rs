//! OAuth web sessions: code exchange, refresh-token rotation, and profile lookups.

pub mod authorize;

pub use authorize::*;

// self
use crate::{
	_prelude::*,
	auth::{OAuthSession, OpenId, SessionStatus, validity_after_margin},
	endpoint::{CODE_EXCHANGE_PATH, SESSION_PROFILE_PATH, SESSION_REFRESH_PATH, USER_PROFILE_PATH},
	error::UpstreamError,
	flows::{Broker, PlatformStatus, common},
	http::{HttpReply, PlatformHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Platform user profile returned by `sns/userinfo` and `cgi-bin/user/info`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Platform user identifier.
	#[serde(default)]
	pub openid: String,
	/// `1` when the user follows the account (`cgi-bin/user/info` only).
	pub subscribe: Option<i64>,
	/// Display name.
	pub nickname: Option<String>,
	/// `1` male, `2` female, `0` unknown.
	pub sex: Option<i64>,
	/// Province from the user's profile.
	pub province: Option<String>,
	/// City from the user's profile.
	pub city: Option<String>,
	/// Country from the user's profile.
	pub country: Option<String>,
	/// Avatar URL.
	pub headimgurl: Option<String>,
	/// Privilege labels (`sns/userinfo` only).
	#[serde(default)]
	pub privilege: Vec<String>,
	/// Cross-application identifier, when bound to an open platform account.
	pub unionid: Option<String>,
	/// Unix timestamp of the latest follow.
	pub subscribe_time: Option<i64>,
	/// Profile language.
	pub language: Option<String>,
}
impl UserProfile {
	/// Returns `false` when the platform reported the user as not following the account.
	pub fn is_subscribed(&self) -> bool {
		self.subscribe != Some(0)
	}
}

#[derive(Debug, Deserialize)]
struct SessionReply {
	access_token: Option<String>,
	expires_in: Option<i64>,
	refresh_token: Option<String>,
	openid: Option<String>,
	scope: Option<String>,
	unionid: Option<String>,
	#[serde(flatten)]
	status: PlatformStatus,
}

#[derive(Debug, Deserialize)]
struct ProfileReply {
	#[serde(flatten)]
	profile: UserProfile,
	#[serde(flatten)]
	status: PlatformStatus,
}

impl<C> Broker<C>
where
	C: ?Sized + PlatformHttpClient,
{
	/// Exchanges an authorization code for a new [`OAuthSession`].
	///
	/// An empty code is rejected before any network call; a reply without `openid` or
	/// `access_token` yields [`Error::Upstream`] and no session.
	pub async fn exchange_code(&self, code: &str) -> Result<OAuthSession> {
		const KIND: FlowKind = FlowKind::CodeExchange;

		if code.trim().is_empty() {
			return Err(Error::invalid_request("authorization code is empty"));
		}

		let span = FlowSpan::new(KIND, "exchange_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let url = self.endpoints.code_exchange(&self.app_id, self.app_secret(), code)?;
				let reply = self.http_client.get(url).await?;
				let parsed: SessionReply = common::parse_reply(CODE_EXCHANGE_PATH, &reply)?;
				let openid = common::require_field(
					CODE_EXCHANGE_PATH,
					"openid",
					parsed.openid,
					&parsed.status,
					&reply,
				)?;
				let subject = parse_openid(CODE_EXCHANGE_PATH, &openid, &parsed.status)?;
				let access_token = common::require_field(
					CODE_EXCHANGE_PATH,
					"access_token",
					parsed.access_token,
					&parsed.status,
					&reply,
				)?;
				let expires_in = common::require_field(
					CODE_EXCHANGE_PATH,
					"expires_in",
					parsed.expires_in,
					&parsed.status,
					&reply,
				)?;
				let mut session = OAuthSession::new(
					subject,
					access_token,
					parsed.refresh_token.unwrap_or_default(),
					validity_after_margin(expires_in, self.safety_margin),
				);

				session.scope = parsed.scope;
				session.union_id = parsed.unionid;

				Ok(session)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Rotates the session's tokens through `sns/oauth2/refresh_token`.
	///
	/// Returns [`Error::SessionTerminal`] without a network call when no refresh token remains.
	/// The session is only modified after a complete, valid reply.
	pub async fn refresh_session(&self, session: &mut OAuthSession) -> Result<()> {
		const KIND: FlowKind = FlowKind::SessionRefresh;

		if !session.can_refresh() {
			return Err(Error::SessionTerminal);
		}

		let span = FlowSpan::new(KIND, "refresh_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let url =
					self.endpoints.session_refresh(&self.app_id, session.refresh_token.expose())?;
				let reply = self.http_client.get(url).await?;
				let parsed: SessionReply = common::parse_reply(SESSION_REFRESH_PATH, &reply)?;
				let access_token = common::require_field(
					SESSION_REFRESH_PATH,
					"access_token",
					parsed.access_token,
					&parsed.status,
					&reply,
				)?;
				let expires_in = common::require_field(
					SESSION_REFRESH_PATH,
					"expires_in",
					parsed.expires_in,
					&parsed.status,
					&reply,
				)?;

				session.rotate(
					access_token,
					parsed.refresh_token.unwrap_or_default(),
					validity_after_margin(expires_in, self.safety_margin),
					parsed.scope,
				);

				Ok(())
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Refreshes the session only when it is expired and refreshable; never fails.
	///
	/// Returns the status after the attempt. A failed refresh leaves the session unchanged and
	/// reports [`SessionStatus::Expired`].
	pub async fn refresh_if_needed(&self, session: &mut OAuthSession) -> SessionStatus {
		if session.status() != SessionStatus::Expired {
			return session.status();
		}
		if let Err(e) = self.refresh_session(session).await {
			obs::log_absorbed_failure(FlowKind::SessionRefresh, &e);
		}

		session.status()
	}

	/// Fetches the profile of the session's user through `sns/userinfo`.
	pub async fn fetch_session_profile(&self, session: &OAuthSession) -> Result<UserProfile> {
		const KIND: FlowKind = FlowKind::UserProfile;

		if session.is_expired() {
			return Err(Error::SessionExpired);
		}

		let span = FlowSpan::new(KIND, "fetch_session_profile");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let url = self
					.endpoints
					.session_profile(session.access_token.expose(), &session.subject)?;
				let reply = self.http_client.get(url).await?;

				Ok(parse_profile(SESSION_PROFILE_PATH, &reply)?)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Fetches a follower's profile through `cgi-bin/user/info` with the application access token.
	///
	/// Returns `None` for users who do not follow the account.
	pub async fn fetch_user_profile(&self, openid: &OpenId) -> Result<Option<UserProfile>> {
		const KIND: FlowKind = FlowKind::UserProfile;

		let span = FlowSpan::new(KIND, "fetch_user_profile");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let access_token = self.access_token().await?;
				let url = self.endpoints.user_profile(access_token.expose(), openid)?;
				let reply = self.http_client.get(url).await?;
				let profile = parse_profile(USER_PROFILE_PATH, &reply)?;

				Ok(profile.is_subscribed().then_some(profile))
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}

fn parse_profile(endpoint: &'static str, reply: &HttpReply) -> Result<UserProfile, UpstreamError> {
	let parsed: ProfileReply = common::parse_reply(endpoint, reply)?;
	let ProfileReply { mut profile, status } = parsed;

	// Unsubscribed followers come back with only `subscribe` and `openid`.
	if profile.subscribe == Some(0) && !status.is_error() {
		return Ok(profile);
	}

	profile.openid =
		common::require_field(endpoint, "openid", Some(profile.openid), &status, reply)?;

	Ok(profile)
}

fn parse_openid(
	endpoint: &'static str,
	openid: &str,
	status: &PlatformStatus,
) -> Result<OpenId, UpstreamError> {
	OpenId::new(openid).map_err(|_| UpstreamError::MissingField {
		endpoint,
		field: "openid",
		errcode: status.errcode,
		errmsg: status.errmsg.clone(),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unsubscribed_profiles_parse_without_details() {
		let reply = HttpReply::new(200, r#"{"subscribe":0,"openid":"o6_bmjrPTlm6_2sgVt7hMZOPfL2M"}"#);
		let profile = parse_profile(USER_PROFILE_PATH, &reply).expect("Reply should parse.");

		assert!(!profile.is_subscribed());
		assert!(profile.nickname.is_none());
	}

	#[test]
	fn profile_errors_surface_as_missing_openid() {
		let reply = HttpReply::new(200, r#"{"errcode":40003,"errmsg":"invalid openid"}"#);
		let err = parse_profile(SESSION_PROFILE_PATH, &reply).expect_err("Error reply must fail.");

		assert!(matches!(
			err,
			UpstreamError::MissingField { field: "openid", errcode: Some(40003), .. }
		));
	}

	#[test]
	fn full_profiles_keep_all_fields() {
		let reply = HttpReply::new(
			200,
			r#"{"openid":"OPENID","nickname":"NICKNAME","sex":1,"province":"PROVINCE","city":"CITY","country":"COUNTRY","headimgurl":"http://thirdwx.qlogo.cn/mmopen/46/0","privilege":["PRIVILEGE1","PRIVILEGE2"],"unionid":"o6_bmasdasdsad6_2sgVt7hMZOPfL"}"#,
		);
		let profile = parse_profile(SESSION_PROFILE_PATH, &reply).expect("Reply should parse.");

		assert!(profile.is_subscribed());
		assert_eq!(profile.openid, "OPENID");
		assert_eq!(profile.sex, Some(1));
		assert_eq!(profile.privilege, vec!["PRIVILEGE1".to_owned(), "PRIVILEGE2".to_owned()]);
		assert_eq!(profile.unionid.as_deref(), Some("o6_bmasdasdsad6_2sgVt7hMZOPfL"));
	}
}
