// self
use crate::{_prelude::*, auth::CredentialKind, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by broker flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("wechat_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a platform reply that could not be turned into a usable value, body included.
pub(crate) fn log_rejected_reply(endpoint: &'static str, status: u16, body: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(endpoint, status, body, "platform reply rejected");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (endpoint, status, body);
	}
}

/// Logs and counts a credential read that fell back to an empty value.
pub(crate) fn log_degraded_read(kind: CredentialKind, error: &Error) {
	super::record_degraded_read(kind);

	#[cfg(feature = "tracing")]
	{
		tracing::error!(kind = kind.as_str(), error = %error, "credential unavailable; serving empty value");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Logs a flow failure that was absorbed instead of returned.
pub(crate) fn log_absorbed_failure(kind: FlowKind, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(flow = kind.as_str(), error = %error, "flow failed; continuing without it");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Logs and counts a callback whose signature did not verify.
pub(crate) fn log_rejected_signature(stage: &'static str) {
	super::record_rejected_signature(stage);

	#[cfg(feature = "tracing")]
	{
		tracing::warn!(stage, "callback signature rejected");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = stage;
	}
}
