//! Page-side API configuration signed with the cached API ticket.

// self
use crate::{
	_prelude::*,
	auth::CredentialKind,
	channel::signature,
	flows::Broker,
	http::PlatformHttpClient,
};

/// Values a page script passes to the platform's JS configuration call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignature {
	/// Application identifier.
	pub app_id: String,
	/// Random nonce used in the signature.
	pub nonce_str: String,
	/// Unix timestamp in seconds used in the signature.
	pub timestamp: i64,
	/// SHA-1 signature over ticket, nonce, timestamp, and URL.
	pub signature: String,
}
impl PageSignature {
	fn sign(app_id: &str, ticket: &str, url: &str, nonce_str: String, timestamp: i64) -> Self {
		let signature = signature::sign_page(ticket, &nonce_str, &timestamp.to_string(), url);

		Self { app_id: app_id.to_owned(), nonce_str, timestamp, signature }
	}
}

impl<C> Broker<C>
where
	C: ?Sized + PlatformHttpClient,
{
	/// Signs the page at `url` with a fresh nonce and the current time.
	///
	/// `url` must be absolute `http(s)`; any `#fragment` is dropped before signing. The API ticket
	/// is pulled through the store, refreshing it (and the access token) when needed.
	pub async fn page_signature(&self, url: &str) -> Result<PageSignature> {
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(Error::invalid_request("page URL must start with http:// or https://"));
		}

		let url = url.split('#').next().unwrap_or(url);
		let ticket = self.try_credential(CredentialKind::ApiTicket).await?;

		Ok(PageSignature::sign(
			&self.app_id,
			ticket.expose(),
			url,
			signature::random_nonce(),
			OffsetDateTime::now_utc().unix_timestamp(),
		))
	}
}
