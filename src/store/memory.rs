//! Thread-safe in-memory [`CredentialStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialKind, TokenSecret},
	store::{CredentialStore, StoreFuture, StoreMode},
};

type StoreMap = Arc<RwLock<HashMap<CredentialKind, Credential>>>;

/// Keeps one credential per kind inside the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the stored credential, expired or not, for inspection.
	pub fn snapshot(&self, kind: CredentialKind) -> Option<Credential> {
		self.0.read().get(&kind).cloned()
	}

	/// Inserts a credential as-is, bypassing the refresh path.
	pub fn insert(&self, credential: Credential) {
		self.0.write().insert(credential.kind, credential);
	}

	fn load_now(map: &StoreMap, kind: CredentialKind, now: OffsetDateTime) -> Option<TokenSecret> {
		map.read()
			.get(&kind)
			.filter(|credential| credential.is_usable_at(now))
			.map(|credential| credential.value.clone())
	}

	fn put_now(
		map: &StoreMap,
		kind: CredentialKind,
		value: TokenSecret,
		validity: Duration,
	) -> Credential {
		let credential = Credential { kind, value, issued_at: OffsetDateTime::now_utc(), validity };

		map.write().insert(kind, credential.clone());

		credential
	}
}
impl CredentialStore for MemoryStore {
	fn mode(&self) -> StoreMode {
		StoreMode::Memory
	}

	fn load(&self, kind: CredentialKind) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::load_now(&map, kind, OffsetDateTime::now_utc())) })
	}

	fn put(
		&self,
		kind: CredentialKind,
		value: TokenSecret,
		validity: Duration,
	) -> StoreFuture<'_, Credential> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::put_now(&map, kind, value, validity)) })
	}
}
