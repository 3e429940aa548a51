//! Broker-level error types shared across flows, stores, and the callback channel.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Only [`Error::Config`] is fatal; every other variant is recoverable at the request boundary.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure (external cache unreachable, corrupt entry).
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Platform answered without a usable token, ticket, or openid.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Ciphertext could not be decoded or unpadded.
	#[error(transparent)]
	Crypto(#[from] CryptoError),

	/// Signature check failed; the request must not be processed further.
	#[error("Request signature does not match.")]
	SignatureMismatch,
	/// Decrypted payload was addressed to a different application.
	#[error("Decrypted payload belongs to `{found}` instead of `{expected}`.")]
	IdentityMismatch {
		/// Application identifier configured locally.
		expected: String,
		/// Application identifier recovered from the payload.
		found: String,
	},
	/// OAuth session has no refresh token left; restart the authorization flow.
	#[error("OAuth session cannot be refreshed; restart authorization.")]
	SessionTerminal,
	/// OAuth session access token has expired.
	#[error("OAuth session access token has expired.")]
	SessionExpired,
	/// Anti-CSRF `state` returned by the platform does not match the configured value.
	#[error("Authorization state mismatch.")]
	StateMismatch,
	/// Caller supplied an unusable request (empty code, non-HTTP URL, missing parameters).
	#[error("Invalid request: {reason}.")]
	InvalidRequest {
		/// Human-readable reason.
		reason: String,
	},
}
impl Error {
	/// Returns `true` for errors that must abort initialization.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Config(_))
	}

	pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
		Self::InvalidRequest { reason: reason.into() }
	}
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A mandatory setting is absent or blank.
	#[error("Setting `{name}` is required.")]
	MissingSetting {
		/// Dotted setting name.
		name: &'static str,
	},
	/// A setting has an unusable value.
	#[error("Setting `{name}` is invalid: {reason}.")]
	InvalidSetting {
		/// Dotted setting name.
		name: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// Message encryption key does not decode to 32 bytes.
	#[error("Message encoding key is invalid: {reason}.")]
	InvalidEncodingKey {
		/// Human-readable reason.
		reason: String,
	},
	/// Cache mode was requested but no cache backend was supplied.
	#[error("External cache is enabled but no cache backend was provided.")]
	CacheBackendRequired,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint template contains an invalid URL.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// The platform replied, but not with something usable.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Reply lacks a required field (token, ticket, openid, expiry).
	#[error("{endpoint} reply is missing `{field}` (errcode {errcode:?}: {errmsg:?}).")]
	MissingField {
		/// Endpoint label.
		endpoint: &'static str,
		/// Absent field.
		field: &'static str,
		/// Platform error code, when supplied.
		errcode: Option<i64>,
		/// Platform error message, when supplied.
		errmsg: Option<String>,
	},
	/// Reply body is not the expected JSON.
	#[error("{endpoint} reply is malformed JSON.")]
	Parse {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Reply carried a non-success HTTP status.
	#[error("{endpoint} replied with HTTP {status}.")]
	Status {
		/// Endpoint label.
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the platform.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the configured timeout.
	#[error("Request to the platform timed out.")]
	Timeout,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Ciphertext decoding failures that are not signature or identity problems.
#[derive(Debug, ThisError)]
pub enum CryptoError {
	/// Ciphertext is not valid base64.
	#[error("Ciphertext is not valid base64.")]
	Base64(#[from] base64::DecodeError),
	/// Ciphertext or plaintext layout is inconsistent.
	#[error("Ciphertext is malformed: {reason}.")]
	Malformed {
		/// Which structural check failed.
		reason: &'static str,
	},
	/// Decrypted message is not UTF-8.
	#[error("Decrypted message is not valid UTF-8.")]
	Utf8(#[from] std::string::FromUtf8Error),
}
