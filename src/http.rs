//! Transport seam for platform calls.
//!
//! The broker depends on [`PlatformHttpClient`] only. Every platform endpoint is a `GET` that
//! answers with a JSON body, so the contract is a single method returning the status code and the
//! raw bytes; parsing and error classification stay in the flows. Implementations must apply the
//! configured timeout themselves and report it as [`TransportError::Timeout`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Boxed future returned by [`PlatformHttpClient::get`].
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpReply, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports able to issue platform `GET` calls.
pub trait PlatformHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Issues a `GET` request and resolves with the status and body.
	fn get(&self, url: Url) -> HttpFuture<'_>;
}

/// Status and body captured from a platform reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpReply {
	/// Creates a reply from a status code and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for `2xx` statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded lossily for logging.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// There is no `Default`: a bare [`ReqwestClient`] never times out.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that applies `timeout` to every request and never follows redirects.
	pub fn new(timeout: std::time::Duration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	///
	/// The client must already carry a request timeout; the broker does not add one.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl PlatformHttpClient for ReqwestHttpClient {
	fn get(&self, url: Url) -> HttpFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.get(url).send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(HttpReply { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn reply_status_classification() {
		assert!(HttpReply::new(200, "{}").is_success());
		assert!(HttpReply::new(204, "").is_success());
		assert!(!HttpReply::new(302, "").is_success());
		assert!(!HttpReply::new(500, "oops").is_success());
		assert_eq!(HttpReply::new(500, "oops").body_text(), "oops");
	}
}
