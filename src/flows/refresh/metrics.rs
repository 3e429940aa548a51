// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::auth::CredentialKind;

#[derive(Debug, Default)]
struct KindCounters {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}

/// Point-in-time refresh counts for one credential kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshCounts {
	/// Platform round trips started.
	pub attempts: u64,
	/// Round trips that stored a new credential.
	pub successes: u64,
	/// Round trips that failed.
	pub failures: u64,
}

/// Outbound refresh counters kept per [`CredentialKind`].
///
/// Reads served from the store are not counted.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	access_token: KindCounters,
	api_ticket: KindCounters,
}
impl RefreshMetrics {
	/// Counts for `kind`.
	pub fn counts(&self, kind: CredentialKind) -> RefreshCounts {
		let counters = self.counters(kind);

		RefreshCounts {
			attempts: counters.attempts.load(Ordering::Relaxed),
			successes: counters.successes.load(Ordering::Relaxed),
			failures: counters.failures.load(Ordering::Relaxed),
		}
	}

	/// Round trips across every kind.
	pub fn attempts(&self) -> u64 {
		self.total(|counts| counts.attempts)
	}

	/// Successful round trips across every kind.
	pub fn successes(&self) -> u64 {
		self.total(|counts| counts.successes)
	}

	/// Failed round trips across every kind.
	pub fn failures(&self) -> u64 {
		self.total(|counts| counts.failures)
	}

	pub(crate) fn record_attempt(&self, kind: CredentialKind) {
		self.counters(kind).attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_outcome(&self, kind: CredentialKind, succeeded: bool) {
		let counters = self.counters(kind);

		if succeeded {
			counters.successes.fetch_add(1, Ordering::Relaxed);
		} else {
			counters.failures.fetch_add(1, Ordering::Relaxed);
		}
	}

	fn counters(&self, kind: CredentialKind) -> &KindCounters {
		match kind {
			CredentialKind::AccessToken => &self.access_token,
			CredentialKind::ApiTicket => &self.api_ticket,
		}
	}

	fn total(&self, pick: impl Fn(RefreshCounts) -> u64) -> u64 {
		CredentialKind::ALL.into_iter().map(|kind| pick(self.counts(kind))).sum()
	}
}
