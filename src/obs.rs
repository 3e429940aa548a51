//! Optional observability helpers for broker flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `wechat_broker.flow` with the `flow` and
//!   `stage` (call site) fields, plus warnings for rejected platform replies, degraded credential
//!   reads, and rejected callback signatures.
//! - Enable `metrics` to increment the `wechat_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`. Degraded reads and rejected
//!   signatures go to `wechat_broker_degraded_read_total` and
//!   `wechat_broker_rejected_signature_total`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, auth::CredentialKind};

/// Platform flows observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Application access token refresh.
	AccessToken,
	/// Page API ticket refresh.
	ApiTicket,
	/// OAuth authorization-code exchange.
	CodeExchange,
	/// OAuth session refresh-token rotation.
	SessionRefresh,
	/// User profile lookups.
	UserProfile,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AccessToken => "access_token",
			FlowKind::ApiTicket => "api_ticket",
			FlowKind::CodeExchange => "code_exchange",
			FlowKind::SessionRefresh => "session_refresh",
			FlowKind::UserProfile => "user_profile",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl From<CredentialKind> for FlowKind {
	fn from(kind: CredentialKind) -> Self {
		match kind {
			CredentialKind::AccessToken => FlowKind::AccessToken,
			CredentialKind::ApiTicket => FlowKind::ApiTicket,
		}
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the terminal outcome of a flow result.
pub(crate) fn record_result<T>(kind: FlowKind, result: &Result<T>) {
	match result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => record_flow_outcome(kind, FlowOutcome::Failure),
	}
}
