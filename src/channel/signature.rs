//! SHA-1 signatures used by callback verification, message envelopes, and page configuration.

// crates.io
use rand::{Rng, distr::Alphanumeric};
use sha1::{Digest, Sha1};

/// Length of generated nonces.
pub const NONCE_LEN: usize = 16;

/// Name/value pairs signed as `name=value` joined by `&`, sorted by name in byte order.
///
/// Values are not URL-escaped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignaturePayload(Vec<(String, String)>);
impl SignaturePayload {
	/// Creates an empty payload.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a pair.
	pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.0.push((name.into(), value.into()));

		self
	}

	/// Canonical string that gets hashed.
	pub fn canonical(&self) -> String {
		let mut pairs = self.0.iter().collect::<Vec<_>>();

		pairs.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
		pairs.iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>().join("&")
	}

	/// Lower-case hex SHA-1 of [`SignaturePayload::canonical`].
	pub fn sign(&self) -> String {
		sha1_hex(self.canonical().as_bytes())
	}
}

/// Sorts raw strings, concatenates them, and returns the lower-case hex SHA-1.
pub fn sha1_sorted(parts: &[&str]) -> String {
	let mut parts = parts.to_vec();

	parts.sort_unstable();

	sha1_hex(parts.concat().as_bytes())
}

/// Lower-case hex SHA-1.
pub fn sha1_hex(bytes: &[u8]) -> String {
	format!("{:x}", Sha1::digest(bytes))
}

/// Signature over the page configuration fields for `jsapi_ticket`.
pub fn sign_page(ticket: &str, nonce: &str, timestamp: &str, url: &str) -> String {
	SignaturePayload::new()
		.with("jsapi_ticket", ticket)
		.with("noncestr", nonce)
		.with("timestamp", timestamp)
		.with("url", url)
		.sign()
}

/// Random alphanumeric string of `len` characters.
pub fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

/// Random [`NONCE_LEN`]-character nonce.
pub fn random_nonce() -> String {
	random_string(NONCE_LEN)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn challenge_signature_matches_known_vectors() {
		assert_eq!(
			sha1_sorted(&["pamtest", "1409304348", "xxxxxx"]),
			"76480565cbe296026c53aaacd1ad523a1ddba24f"
		);
		assert_eq!(
			sha1_sorted(&["12039475", "1512453034", "2579726205"]),
			"3f5de45cb6ee46a01da0afbc83f01b1b261b1b55"
		);
	}

	#[test]
	fn page_signature_matches_platform_example() {
		let signature = sign_page(
			"sM4AOVdWfPE4DxkXGEs8VMCPGGVi4C3VM0P37wVUCFvkVAy_90u5h9nbSlYy3-Sl-HhTdfl2fzFy1AOcHKP7qg",
			"Wm3WZYTPz0wzccnW",
			"1414587457",
			"http://mp.weixin.qq.com?params=value",
		);

		assert_eq!(signature, "0f9de62fce790f9a083d5c99e95740ceb90c27ed");
	}

	#[test]
	fn payload_sorts_by_name_without_escaping() {
		let payload = SignaturePayload::new().with("url", "http://a/b?c=d&e").with("A", "1").with("b", "2");

		assert_eq!(payload.canonical(), "A=1&b=2&url=http://a/b?c=d&e");
	}

	#[test]
	fn nonces_are_alphanumeric() {
		let nonce = random_nonce();

		assert_eq!(nonce.len(), NONCE_LEN);
		assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(random_nonce(), random_nonce());
	}
}
