//! Application-wide platform credentials and their freshness rules.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Seconds shaved off every platform-reported lifetime unless configured otherwise.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(900);
/// Shortest validity ever written for a credential.
pub const MIN_VALIDITY: Duration = Duration::SECOND;

/// Credential kinds the broker caches for the whole application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
	/// Server-to-platform bearer token (`cgi-bin/token`).
	AccessToken,
	/// Ticket used to sign page-side API configuration (`cgi-bin/ticket/getticket`).
	ApiTicket,
}
impl CredentialKind {
	/// Every kind, in refresh-dependency order.
	pub const ALL: [Self; 2] = [Self::AccessToken, Self::ApiTicket];

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AccessToken => "access_token",
			Self::ApiTicket => "api_ticket",
		}
	}

	/// Key suffix used by external caches; shared with other deployments of the same account.
	pub const fn cache_suffix(self) -> &'static str {
		match self {
			Self::AccessToken => "ACCESS_TOKEN",
			Self::ApiTicket => "JS_TICKET",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A cached credential with its issue instant and validity window.
///
/// `validity` is stored after the safety margin has been subtracted, so the credential is
/// considered expired exactly at `issued_at + validity`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
	/// Credential kind.
	pub kind: CredentialKind,
	/// Opaque token or ticket string.
	pub value: TokenSecret,
	/// Instant the value was written.
	pub issued_at: OffsetDateTime,
	/// Validity window measured from `issued_at`.
	pub validity: Duration,
}
impl Credential {
	/// Creates a credential issued now.
	pub fn new(kind: CredentialKind, value: impl Into<String>, validity: Duration) -> Self {
		Self {
			kind,
			value: TokenSecret::new(value),
			issued_at: OffsetDateTime::now_utc(),
			validity,
		}
	}

	/// Overrides the issue instant.
	pub fn with_issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Instant at which the credential stops being served.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at.saturating_add(self.validity)
	}

	/// Returns `true` if the credential has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant - self.issued_at >= self.validity
	}

	/// Returns `true` if the credential is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` when the value is non-empty and not expired at `instant`.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		!self.value.is_empty() && !self.is_expired_at(instant)
	}
}

/// Reduces a platform-reported `expires_in` by `margin`, flooring at [`MIN_VALIDITY`].
pub fn validity_after_margin(expires_in: i64, margin: Duration) -> Duration {
	let validity = Duration::seconds(expires_in).saturating_sub(margin);

	if validity < MIN_VALIDITY { MIN_VALIDITY } else { validity }
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn margin_is_subtracted_and_floored() {
		assert_eq!(validity_after_margin(7200, DEFAULT_SAFETY_MARGIN), Duration::seconds(6300));
		assert_eq!(validity_after_margin(901, DEFAULT_SAFETY_MARGIN), Duration::seconds(1));
		assert_eq!(validity_after_margin(900, DEFAULT_SAFETY_MARGIN), MIN_VALIDITY);
		assert_eq!(validity_after_margin(60, DEFAULT_SAFETY_MARGIN), MIN_VALIDITY);
		assert_eq!(validity_after_margin(-5, Duration::ZERO), MIN_VALIDITY);
		assert_eq!(validity_after_margin(7200, Duration::ZERO), Duration::seconds(7200));
	}

	#[test]
	fn expiry_boundary_is_inclusive() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let credential =
			Credential::new(CredentialKind::AccessToken, "token", Duration::seconds(6300))
				.with_issued_at(issued);

		assert_eq!(credential.expires_at(), macros::datetime!(2025-01-01 01:45 UTC));
		assert!(!credential.is_expired_at(issued));
		assert!(!credential.is_expired_at(macros::datetime!(2025-01-01 01:44:59 UTC)));
		assert!(credential.is_expired_at(macros::datetime!(2025-01-01 01:45 UTC)));
		assert!(credential.is_usable_at(issued));
	}

	#[test]
	fn empty_values_are_never_usable() {
		let credential = Credential::new(CredentialKind::ApiTicket, "", Duration::hours(1));

		assert!(!credential.is_expired());
		assert!(!credential.is_usable_at(OffsetDateTime::now_utc()));
	}

	#[test]
	fn cache_suffixes_are_stable() {
		assert_eq!(CredentialKind::AccessToken.cache_suffix(), "ACCESS_TOKEN");
		assert_eq!(CredentialKind::ApiTicket.cache_suffix(), "JS_TICKET");
		assert_eq!(CredentialKind::ApiTicket.to_string(), "api_ticket");
	}
}
