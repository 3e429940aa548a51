//! Shared helpers for flow implementations (reply parsing, required fields, guards).

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::CredentialKind,
	error::UpstreamError,
	flows::Broker,
	http::{HttpReply, PlatformHttpClient},
	obs,
};

/// `errcode`/`errmsg` pair the platform attaches to failed (and some successful) replies.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PlatformStatus {
	/// Platform error code; `0` or absent on success.
	pub errcode: Option<i64>,
	/// Platform error message.
	pub errmsg: Option<String>,
}
impl PlatformStatus {
	/// Returns `true` when the platform reported a non-zero error code.
	pub fn is_error(&self) -> bool {
		self.errcode.is_some_and(|code| code != 0)
	}
}

/// Decodes a JSON reply, rejecting non-`2xx` statuses and logging the raw body on failure.
pub(crate) fn parse_reply<T>(endpoint: &'static str, reply: &HttpReply) -> Result<T, UpstreamError>
where
	T: DeserializeOwned,
{
	if !reply.is_success() {
		obs::log_rejected_reply(endpoint, reply.status, &reply.body_text());

		return Err(UpstreamError::Status { endpoint, status: reply.status });
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&reply.body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		obs::log_rejected_reply(endpoint, reply.status, &reply.body_text());

		UpstreamError::Parse { endpoint, source }
	})
}

/// Unwraps a required reply field, treating empty strings as absent.
pub(crate) fn require_field<T>(
	endpoint: &'static str,
	field: &'static str,
	value: Option<T>,
	status: &PlatformStatus,
	reply: &HttpReply,
) -> Result<T, UpstreamError>
where
	T: RequiredField,
{
	match value {
		Some(value) if value.is_present() => Ok(value),
		_ => {
			obs::log_rejected_reply(endpoint, reply.status, &reply.body_text());

			Err(UpstreamError::MissingField {
				endpoint,
				field,
				errcode: status.errcode,
				errmsg: status.errmsg.clone(),
			})
		},
	}
}

/// Reply values that can be checked for presence beyond `Option`.
pub(crate) trait RequiredField {
	fn is_present(&self) -> bool;
}
impl RequiredField for String {
	fn is_present(&self) -> bool {
		!self.is_empty()
	}
}
impl RequiredField for i64 {
	fn is_present(&self) -> bool {
		true
	}
}

/// Returns (and creates on demand) the singleflight guard for a credential kind.
pub(crate) fn flow_guard<C>(broker: &Broker<C>, kind: CredentialKind) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + PlatformHttpClient,
{
	let mut guards = broker.flow_guards.lock();

	guards.entry(kind).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}
