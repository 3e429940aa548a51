//! Application credential lifecycle: cached reads, singleflight refresh, and degraded fallback.
//!
//! [`Broker::try_credential`] consults the store, and on a miss takes the per-kind guard, checks
//! the store again, and only then calls the platform. Concurrent cold callers therefore share one
//! outbound request. Refreshing the API ticket needs an access token, which is pulled through the
//! same path; guards are always taken ticket first, token second.

mod metrics;

pub use metrics::{RefreshCounts, RefreshMetrics};

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialKind, TokenSecret, validity_after_margin},
	endpoint::{ACCESS_TOKEN_PATH, API_TICKET_PATH},
	flows::{Broker, PlatformStatus, common},
	http::PlatformHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

#[derive(Debug, Deserialize)]
struct AccessTokenReply {
	access_token: Option<String>,
	expires_in: Option<i64>,
	#[serde(flatten)]
	status: PlatformStatus,
}

#[derive(Debug, Deserialize)]
struct ApiTicketReply {
	ticket: Option<String>,
	expires_in: Option<i64>,
	#[serde(flatten)]
	status: PlatformStatus,
}

impl<C> Broker<C>
where
	C: ?Sized + PlatformHttpClient,
{
	/// Returns a valid credential, or an empty [`TokenSecret`] when it cannot be obtained.
	///
	/// Failures are logged and never cached; the next call retries. Use
	/// [`Broker::try_credential`] to observe the error instead.
	pub async fn credential(&self, kind: CredentialKind) -> TokenSecret {
		match self.try_credential(kind).await {
			Ok(value) => value,
			Err(e) => {
				obs::log_degraded_read(kind, &e);

				TokenSecret::default()
			},
		}
	}

	/// Returns a valid credential, refreshing it on absence or expiry.
	pub async fn try_credential(&self, kind: CredentialKind) -> Result<TokenSecret> {
		match kind {
			CredentialKind::AccessToken => self.access_token().await,
			CredentialKind::ApiTicket =>
				self.load_or_refresh(kind, || self.refresh_api_ticket_locked()).await,
		}
	}

	/// Forces an access-token round trip and stores the result.
	pub async fn refresh_access_token(&self) -> Result<Credential> {
		let guard = common::flow_guard(self, CredentialKind::AccessToken);
		let _singleflight = guard.lock().await;

		self.refresh_access_token_locked().await
	}

	/// Forces an API-ticket round trip (reusing a cached access token) and stores the result.
	pub async fn refresh_api_ticket(&self) -> Result<Credential> {
		let guard = common::flow_guard(self, CredentialKind::ApiTicket);
		let _singleflight = guard.lock().await;

		self.refresh_api_ticket_locked().await
	}

	pub(crate) async fn access_token(&self) -> Result<TokenSecret> {
		self.load_or_refresh(CredentialKind::AccessToken, || self.refresh_access_token_locked())
			.await
	}

	async fn load_or_refresh<F, Fut>(&self, kind: CredentialKind, refresh: F) -> Result<TokenSecret>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Credential>>,
	{
		if let Some(value) = self.store.load(kind).await? {
			return Ok(value);
		}

		let guard = common::flow_guard(self, kind);
		let _singleflight = guard.lock().await;

		if let Some(value) = self.store.load(kind).await? {
			return Ok(value);
		}

		Ok(refresh().await?.value)
	}

	async fn refresh_access_token_locked(&self) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::AccessToken;

		let span = FlowSpan::new(KIND, "refresh_access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt(CredentialKind::AccessToken);

		let result = span
			.instrument(async {
				let url = self.endpoints.access_token(&self.app_id, self.app_secret())?;
				let reply = self.http_client.get(url).await?;
				let parsed: AccessTokenReply = common::parse_reply(ACCESS_TOKEN_PATH, &reply)?;
				let value = common::require_field(
					ACCESS_TOKEN_PATH,
					"access_token",
					parsed.access_token,
					&parsed.status,
					&reply,
				)?;
				let expires_in = common::require_field(
					ACCESS_TOKEN_PATH,
					"expires_in",
					parsed.expires_in,
					&parsed.status,
					&reply,
				)?;

				self.store_credential(CredentialKind::AccessToken, value, expires_in).await
			})
			.await;

		self.finish_refresh(CredentialKind::AccessToken, result)
	}

	async fn refresh_api_ticket_locked(&self) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::ApiTicket;

		let span = FlowSpan::new(KIND, "refresh_api_ticket");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt(CredentialKind::ApiTicket);

		let result = span
			.instrument(async {
				let access_token = self.access_token().await?;
				let url = self.endpoints.api_ticket(access_token.expose())?;
				let reply = self.http_client.get(url).await?;
				let parsed: ApiTicketReply = common::parse_reply(API_TICKET_PATH, &reply)?;
				let value = common::require_field(
					API_TICKET_PATH,
					"ticket",
					parsed.ticket,
					&parsed.status,
					&reply,
				)?;
				let expires_in = common::require_field(
					API_TICKET_PATH,
					"expires_in",
					parsed.expires_in,
					&parsed.status,
					&reply,
				)?;

				self.store_credential(CredentialKind::ApiTicket, value, expires_in).await
			})
			.await;

		self.finish_refresh(CredentialKind::ApiTicket, result)
	}

	async fn store_credential(
		&self,
		kind: CredentialKind,
		value: String,
		expires_in: i64,
	) -> Result<Credential> {
		let validity = validity_after_margin(expires_in, self.safety_margin);

		Ok(self.store.put(kind, TokenSecret::new(value), validity).await?)
	}

	fn finish_refresh(&self, kind: CredentialKind, result: Result<Credential>) -> Result<Credential> {
		self.refresh_metrics.record_outcome(kind, result.is_ok());
		obs::record_result(kind.into(), &result);

		result
	}
}
