//! Secure callback channel: request signatures and encrypted payload envelopes.
//!
//! Every inbound callback is authenticated by a SHA-1 signature over the shared token and request
//! parameters before anything else happens. Encrypted payloads are signed over the ciphertext as
//! well, and [`SecureChannel::decrypt_message`] refuses to decrypt until that signature checks out.

pub mod cipher;
pub mod signature;

pub use cipher::MessageCipher;
pub use signature::*;

// self
use crate::{_prelude::*, config::PlatformConfig, error::ConfigError, obs};

/// Query parameters the platform sends when verifying a callback URL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChallengeQuery {
	/// Signature over token, timestamp, and nonce.
	pub signature: Option<String>,
	/// Unix timestamp as sent.
	pub timestamp: Option<String>,
	/// Random nonce.
	pub nonce: Option<String>,
	/// Value to echo back once verified.
	pub echostr: Option<String>,
}

/// Encrypted payload with the signature the receiver will check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EncryptedMessage {
	/// Base64 ciphertext.
	pub encrypted: String,
	/// Signature over token, timestamp, nonce, and ciphertext.
	pub signature: String,
	/// Timestamp used in the signature.
	pub timestamp: String,
	/// Nonce used in the signature.
	pub nonce: String,
}

/// Verifies and (optionally) decrypts callbacks for one application.
#[derive(Clone)]
pub struct SecureChannel {
	token: String,
	app_id: String,
	cipher: Option<MessageCipher>,
}
impl SecureChannel {
	/// Creates a signature-only channel.
	pub fn new(token: impl Into<String>, app_id: impl Into<String>) -> Self {
		Self { token: token.into(), app_id: app_id.into(), cipher: None }
	}

	/// Enables payload encryption with the 43-character encoding key.
	pub fn with_encoding_key(mut self, encoding_key: &str) -> Result<Self, ConfigError> {
		self.cipher = Some(MessageCipher::from_encoding_key(encoding_key)?);

		Ok(self)
	}

	/// Builds the channel from the `channel` settings.
	pub fn from_config(config: &PlatformConfig) -> Result<Self, ConfigError> {
		let token = config
			.channel
			.token
			.as_deref()
			.filter(|token| !token.trim().is_empty())
			.ok_or(ConfigError::MissingSetting { name: "channel.token" })?;
		let channel = Self::new(token, config.message_app_id());

		match config.channel.encoding_aes_key.as_deref().filter(|key| !key.is_empty()) {
			Some(key) => channel.with_encoding_key(key),
			None => Ok(channel),
		}
	}

	/// Returns `true` when an encoding key is configured.
	pub fn can_encrypt(&self) -> bool {
		self.cipher.is_some()
	}

	/// Checks a callback signature over token, timestamp, and nonce.
	pub fn verify_challenge(&self, signature: &str, timestamp: &str, nonce: &str) -> Result<()> {
		let expected = sha1_sorted(&[self.token.as_str(), timestamp, nonce]);

		if expected == signature {
			Ok(())
		} else {
			obs::log_rejected_signature("challenge");

			Err(Error::SignatureMismatch)
		}
	}

	/// Verifies a URL challenge and returns the string to echo back.
	pub fn answer_challenge(&self, query: &ChallengeQuery) -> Result<String> {
		let (Some(signature), Some(timestamp), Some(nonce), Some(echostr)) = (
			query.signature.as_deref(),
			query.timestamp.as_deref(),
			query.nonce.as_deref(),
			query.echostr.as_deref(),
		) else {
			return Err(Error::invalid_request("challenge parameters are incomplete"));
		};

		self.verify_challenge(signature, timestamp, nonce)?;

		Ok(echostr.to_owned())
	}

	/// Signature over token, timestamp, nonce, and ciphertext.
	pub fn message_signature(&self, timestamp: &str, nonce: &str, encrypted: &str) -> String {
		sha1_sorted(&[self.token.as_str(), timestamp, nonce, encrypted])
	}

	/// Encrypts an outbound payload and signs the ciphertext.
	pub fn encrypt_message(
		&self,
		plaintext: &str,
		timestamp: &str,
		nonce: &str,
	) -> Result<EncryptedMessage> {
		let encrypted = self.cipher()?.encrypt(plaintext, &self.app_id)?;

		Ok(self.envelope(encrypted, timestamp, nonce))
	}

	/// Verifies the signature over `encrypted`, then decrypts it.
	///
	/// Fails with [`Error::SignatureMismatch`] before touching the ciphertext, and with
	/// [`Error::IdentityMismatch`] when the payload names another application.
	pub fn decrypt_message(
		&self,
		signature: &str,
		timestamp: &str,
		nonce: &str,
		encrypted: &str,
	) -> Result<String> {
		let cipher = self.cipher()?;

		if self.message_signature(timestamp, nonce, encrypted) != signature {
			obs::log_rejected_signature("decrypt_message");

			return Err(Error::SignatureMismatch);
		}

		let (message, app_id) = cipher.decrypt(encrypted)?;

		if app_id != self.app_id {
			return Err(Error::IdentityMismatch { expected: self.app_id.clone(), found: app_id });
		}

		Ok(message)
	}

	fn envelope(&self, encrypted: String, timestamp: &str, nonce: &str) -> EncryptedMessage {
		EncryptedMessage {
			signature: self.message_signature(timestamp, nonce, &encrypted),
			encrypted,
			timestamp: timestamp.to_owned(),
			nonce: nonce.to_owned(),
		}
	}

	fn cipher(&self) -> Result<&MessageCipher> {
		Ok(self
			.cipher
			.as_ref()
			.ok_or(ConfigError::MissingSetting { name: "channel.encoding_aes_key" })?)
	}
}
impl Debug for SecureChannel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SecureChannel")
			.field("app_id", &self.app_id)
			.field("token", &"<redacted>")
			.field("can_encrypt", &self.can_encrypt())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::ChannelSettings;

	const ENCODING_KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";
	const APP_ID: &str = "wxb11529c136998cb6";

	fn channel() -> SecureChannel {
		SecureChannel::new("pamtest", APP_ID)
			.with_encoding_key(ENCODING_KEY)
			.expect("Fixture encoding key should decode.")
	}

	#[test]
	fn known_ciphertext_signature_matches() {
		let encrypted =
			"jn1L23DB+6ELqJ+6bruv21Y6MD7KeIfP82D6gU39rmkgczbWwt5+3bnyg5K55bgVtVzd832WzZGMhkP72vVOfg==";

		assert_eq!(
			channel().message_signature("1409304348", "xxxxxx", encrypted),
			"82c962d39941aa48552f90ef55aa323dc620cc10"
		);
		assert_eq!(
			channel()
				.decrypt_message(
					"82c962d39941aa48552f90ef55aa323dc620cc10",
					"1409304348",
					"xxxxxx",
					encrypted,
				)
				.expect("Known envelope should decrypt."),
			"我是中文abcd123"
		);
	}

	#[test]
	fn challenge_answers_only_when_signed() {
		let channel = SecureChannel::new("12039475", "wx0c8e33f9b2ea2508");
		let mut query = ChallengeQuery {
			signature: Some("3f5de45cb6ee46a01da0afbc83f01b1b261b1b55".into()),
			timestamp: Some("1512453034".into()),
			nonce: Some("2579726205".into()),
			echostr: Some("7878091623650277291".into()),
		};

		assert_eq!(
			channel.answer_challenge(&query).expect("Signed challenge should pass."),
			"7878091623650277291"
		);

		query.nonce = Some("2579726206".into());

		assert!(matches!(channel.answer_challenge(&query), Err(Error::SignatureMismatch)));

		query.nonce = None;

		assert!(matches!(channel.answer_challenge(&query), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn signature_only_channels_cannot_encrypt() {
		let channel = SecureChannel::new("pamtest", APP_ID);
		let err = channel
			.encrypt_message("hello", "1409304348", "xxxxxx")
			.expect_err("Encryption without a key must fail.");

		assert!(err.is_fatal());
		assert!(!channel.can_encrypt());
	}

	#[test]
	fn config_requires_a_token() {
		let config = PlatformConfig::new(APP_ID, "secret");

		assert!(matches!(
			SecureChannel::from_config(&config),
			Err(ConfigError::MissingSetting { name: "channel.token" })
		));

		let channel = SecureChannel::from_config(&config.with_channel(
			ChannelSettings::new("pamtest").with_encoding_aes_key(ENCODING_KEY),
		))
		.expect("Complete channel settings should build.");

		assert!(channel.can_encrypt());
		assert!(!format!("{channel:?}").contains("pamtest"));
	}
}
