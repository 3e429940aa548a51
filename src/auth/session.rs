//! Per-user OAuth web sessions obtained through the authorization-code flow.

// self
use crate::{
	_prelude::*,
	auth::{OpenId, TokenSecret},
};

/// Lifecycle position of an [`OAuthSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
	/// Access token is still valid.
	Active,
	/// Access token expired but a refresh token is available.
	Expired,
	/// Access token expired and no refresh token remains; re-run authorization.
	Terminal,
}

/// Authorization record for one platform user.
///
/// The broker creates sessions on code exchange and rotates them in place on refresh. Storage and
/// eviction belong to the caller (typically a web session).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthSession {
	/// Platform user identifier.
	pub subject: OpenId,
	/// Per-user access token for `sns/*` endpoints.
	pub access_token: TokenSecret,
	/// Refresh token; empty once the platform stops issuing one.
	pub refresh_token: TokenSecret,
	/// Instant the current access token was stored.
	pub issued_at: OffsetDateTime,
	/// Validity window after the safety margin.
	pub validity: Duration,
	/// Granted scope string as reported by the platform.
	pub scope: Option<String>,
	/// Cross-application user identifier, when the account is bound to an open platform.
	pub union_id: Option<String>,
}
impl OAuthSession {
	/// Creates a session issued now.
	pub fn new(
		subject: OpenId,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
		validity: Duration,
	) -> Self {
		Self {
			subject,
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			issued_at: OffsetDateTime::now_utc(),
			validity,
			scope: None,
			union_id: None,
		}
	}

	/// Overrides the issue instant.
	pub fn with_issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Returns `true` if the access token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant - self.issued_at >= self.validity
	}

	/// Returns `true` if the access token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` while a refresh attempt is possible.
	pub fn can_refresh(&self) -> bool {
		!self.refresh_token.is_empty()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> SessionStatus {
		match (self.is_expired_at(instant), self.can_refresh()) {
			(false, _) => SessionStatus::Active,
			(true, true) => SessionStatus::Expired,
			(true, false) => SessionStatus::Terminal,
		}
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> SessionStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	pub(crate) fn rotate(
		&mut self,
		access_token: String,
		refresh_token: String,
		validity: Duration,
		scope: Option<String>,
	) {
		self.access_token = TokenSecret::new(access_token);
		self.refresh_token = TokenSecret::new(refresh_token);
		self.validity = validity;
		self.issued_at = OffsetDateTime::now_utc();

		if scope.is_some() {
			self.scope = scope;
		}
	}
}
