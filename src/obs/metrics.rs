// self
use crate::{
	auth::CredentialKind,
	obs::{FlowKind, FlowOutcome},
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"wechat_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a credential read answered with an empty value.
pub fn record_degraded_read(kind: CredentialKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("wechat_broker_degraded_read_total", "kind" => kind.as_str()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = kind;
	}
}

/// Counts a callback refused because its signature did not verify.
pub fn record_rejected_signature(stage: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("wechat_broker_rejected_signature_total", "stage" => stage).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = stage;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_accept_every_label() {
		record_flow_outcome(FlowKind::CodeExchange, FlowOutcome::Failure);
		record_degraded_read(CredentialKind::ApiTicket);
		record_rejected_signature("decrypt_message");
	}
}
