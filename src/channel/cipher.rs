//! AES-256-CBC envelope for encrypted callback payloads.
//!
//! Plaintext layout before padding is `{16 random bytes}{u32 BE message length}{message}{app id}`.
//! Padding is PKCS#7-style to a 32-byte block and is applied here, so the block cipher itself runs
//! without padding. The IV is the first 16 bytes of the key.

// crates.io
use aes::Aes256;
use base64::{
	Engine,
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD},
};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
// self
use crate::{
	_prelude::*,
	channel::signature,
	error::{ConfigError, CryptoError},
};

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const RANDOM_LEN: usize = 16;
const LENGTH_LEN: usize = 4;
const PAD_BLOCK: usize = 32;
const AES_BLOCK: usize = 16;
// Encoding keys are 43 characters without `=` and carry non-zero trailing bits.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new()
		.with_decode_allow_trailing_bits(true)
		.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Symmetric cipher derived from the 43-character encoding key.
#[derive(Clone)]
pub struct MessageCipher {
	key: [u8; KEY_LEN],
}
impl MessageCipher {
	/// Decodes the encoding key; it must yield exactly 32 bytes.
	pub fn from_encoding_key(encoding_key: &str) -> Result<Self, ConfigError> {
		let bytes = KEY_ENGINE
			.decode(encoding_key.trim())
			.map_err(|e| ConfigError::InvalidEncodingKey { reason: e.to_string() })?;
		let key = <[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
			ConfigError::InvalidEncodingKey {
				reason: format!("decodes to {} bytes instead of {KEY_LEN}", bytes.len()),
			}
		})?;

		Ok(Self { key })
	}

	/// Encrypts `message` for `app_id` with a fresh random prefix; returns base64.
	pub fn encrypt(&self, message: &str, app_id: &str) -> Result<String, CryptoError> {
		self.encrypt_with_prefix(&signature::random_string(RANDOM_LEN), message, app_id)
	}

	/// Decrypts base64 `encrypted` into the message and the embedded app id.
	pub fn decrypt(&self, encrypted: &str) -> Result<(String, String), CryptoError> {
		let mut buf = STANDARD.decode(encrypted.trim())?;

		if buf.is_empty() || buf.len() % AES_BLOCK != 0 {
			return Err(CryptoError::Malformed { reason: "ciphertext is not whole AES blocks" });
		}

		let plain = Decryptor::new(&self.key.into(), &self.iv().into())
			.decrypt_padded_mut::<NoPadding>(&mut buf)
			.map_err(|_| CryptoError::Malformed { reason: "ciphertext could not be decrypted" })?;
		let content = unpad(plain)?;

		if content.len() < RANDOM_LEN + LENGTH_LEN {
			return Err(CryptoError::Malformed { reason: "plaintext is shorter than its header" });
		}

		let mut len_bytes = [0_u8; LENGTH_LEN];

		len_bytes.copy_from_slice(&content[RANDOM_LEN..RANDOM_LEN + LENGTH_LEN]);

		let start = RANDOM_LEN + LENGTH_LEN;
		let end = usize::try_from(u32::from_be_bytes(len_bytes))
			.ok()
			.and_then(|len| start.checked_add(len))
			.filter(|end| *end <= content.len())
			.ok_or(CryptoError::Malformed { reason: "declared length exceeds the payload" })?;
		let message = String::from_utf8(content[start..end].to_vec())?;
		let app_id = String::from_utf8(content[end..].to_vec())?;

		Ok((message, app_id))
	}

	pub(crate) fn encrypt_with_prefix(
		&self,
		prefix: &str,
		message: &str,
		app_id: &str,
	) -> Result<String, CryptoError> {
		let declared = u32::try_from(message.len())
			.map_err(|_| CryptoError::Malformed { reason: "message exceeds 4 GiB" })?;
		let mut buf = Vec::with_capacity(
			prefix.len() + LENGTH_LEN + message.len() + app_id.len() + PAD_BLOCK,
		);

		buf.extend_from_slice(prefix.as_bytes());
		buf.extend_from_slice(&declared.to_be_bytes());
		buf.extend_from_slice(message.as_bytes());
		buf.extend_from_slice(app_id.as_bytes());

		let pad = PAD_BLOCK - buf.len() % PAD_BLOCK;

		// `pad` is in 1..=32.
		buf.resize(buf.len() + pad, pad as u8);

		let len = buf.len();
		let encrypted = Encryptor::new(&self.key.into(), &self.iv().into())
			.encrypt_padded_mut::<NoPadding>(&mut buf, len)
			.map_err(|_| CryptoError::Malformed { reason: "plaintext is not whole AES blocks" })?;

		Ok(STANDARD.encode(encrypted))
	}

	fn iv(&self) -> [u8; IV_LEN] {
		let mut iv = [0_u8; IV_LEN];

		iv.copy_from_slice(&self.key[..IV_LEN]);

		iv
	}
}
impl Debug for MessageCipher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("MessageCipher(<redacted>)")
	}
}

fn unpad(plain: &[u8]) -> Result<&[u8], CryptoError> {
	let invalid = CryptoError::Malformed { reason: "padding is invalid" };
	let Some(&last) = plain.last() else {
		return Err(invalid);
	};
	let pad = usize::from(last);

	if pad == 0 || pad > PAD_BLOCK || pad > plain.len() {
		return Err(invalid);
	}

	let (content, padding) = plain.split_at(plain.len() - pad);

	if padding.iter().any(|&byte| byte != last) {
		return Err(invalid);
	}

	Ok(content)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const ENCODING_KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";
	const APP_ID: &str = "wxb11529c136998cb6";
	const PREFIX: &str = "aaaabbbbccccdddd";
	const REPLY: &str = "我是中文abcd123";
	const REPLY_ENCRYPTED: &str =
		"jn1L23DB+6ELqJ+6bruv21Y6MD7KeIfP82D6gU39rmkgczbWwt5+3bnyg5K55bgVtVzd832WzZGMhkP72vVOfg==";
	const VIDEO_REPLY: &str = r#"<xml><ToUserName><![CDATA[oia2Tj我是中文jewbmiOUlr6X-1crbLOvLw]]></ToUserName><FromUserName><![CDATA[gh_7f083739789a]]></FromUserName><CreateTime>1407743423</CreateTime><MsgType><![CDATA[video]]></MsgType><Video><MediaId><![CDATA[eYJ1MbwPRJtOvIEabaxHs7TX2D-HV71s79GUxqdUkjm6Gs2Ed1KF3ulAOA9H1xG0]]></MediaId><Title><![CDATA[testCallBackReplyVideo]]></Title><Description><![CDATA[testCallBackReplyVideo]]></Description></Video></xml>"#;
	const VIDEO_REPLY_ENCRYPTED: &str = "jn1L23DB+6ELqJ+6bruv23M2GmYfkv0xBh2h+XTBOKVKcgDFHle6gqcZ1cZrk3e1qjPQ1F4RsLWzQRG9udbKWesxlkupqcEcW7ZQweImX9+wLMa0GaUzpkycA8+IamDBxn5loLgZpnS7fVAbExOkK5DYHBmv5tptA9tklE/fTIILHR8HLXa5nQvFb3tYPKAlHF3rtTeayNf0QuM+UW/wM9enGIDIJHF7CLHiDNAYxr+r+OrJCmPQyTy8cVWlu9iSvOHPT/77bZqJucQHQ04sq7KZI27OcqpQNSto2OdHCoTccjggX5Z9Mma0nMJBU+jLKJ38YB1fBIz+vBzsYjrTmFQ44YfeEuZ+xRTQwr92vhA9OxchWVINGC50qE/6lmkwWTwGX9wtQpsJKhP+oS7rvTY8+VdzETdfakjkwQ5/Xka042OlUb1/slTwo4RscuQ+RdxSGvDahxAJ6+EAjLt9d8igHngxIbf6YyqqROxuxqIeIch3CssH/LqRs+iAcILvApYZckqmA7FNERspKA5f8GoJ9sv8xmGvZ9Yrf57cExWtnX8aCMMaBropU/1k+hKP5LVdzbWCG0hGwx/dQudYR/eXp3P0XxjlFiy+9DMlaFExWUZQDajPkdPrEeOwofJb";

	fn cipher() -> MessageCipher {
		MessageCipher::from_encoding_key(ENCODING_KEY).expect("Fixture encoding key should decode.")
	}

	#[test]
	fn encryption_matches_known_vectors() {
		let cipher = cipher();

		assert_eq!(
			cipher.encrypt_with_prefix(PREFIX, REPLY, APP_ID).expect("Encryption should succeed."),
			REPLY_ENCRYPTED
		);
		assert_eq!(
			cipher
				.encrypt_with_prefix(PREFIX, VIDEO_REPLY, APP_ID)
				.expect("Encryption should succeed."),
			VIDEO_REPLY_ENCRYPTED
		);
	}

	#[test]
	fn decryption_recovers_message_and_app_id() {
		let cipher = cipher();
		let (message, app_id) =
			cipher.decrypt(VIDEO_REPLY_ENCRYPTED).expect("Known ciphertext should decrypt.");

		assert_eq!(message, VIDEO_REPLY);
		assert_eq!(app_id, APP_ID);
	}

	#[test]
	fn round_trip_covers_block_boundaries() {
		let cipher = cipher();

		for len in [0, 1, 16, 17, 1000] {
			let message = "m".repeat(len);
			let encrypted = cipher.encrypt(&message, APP_ID).expect("Encryption should succeed.");
			let (decrypted, app_id) = cipher.decrypt(&encrypted).expect("Round trip should decrypt.");

			assert_eq!(decrypted, message, "Round trip failed for {len} bytes.");
			assert_eq!(app_id, APP_ID);
		}
	}

	#[test]
	fn invalid_keys_are_rejected() {
		assert!(matches!(
			MessageCipher::from_encoding_key("abcde"),
			Err(ConfigError::InvalidEncodingKey { .. })
		));
		assert!(matches!(
			MessageCipher::from_encoding_key("not base64 at all!"),
			Err(ConfigError::InvalidEncodingKey { .. })
		));
	}

	#[test]
	fn malformed_ciphertexts_are_rejected() {
		let cipher = cipher();

		assert!(matches!(cipher.decrypt("%%%"), Err(CryptoError::Base64(_))));
		assert!(matches!(cipher.decrypt("AAAA"), Err(CryptoError::Malformed { .. })));
		assert!(matches!(cipher.decrypt(""), Err(CryptoError::Malformed { .. })));
	}

	#[test]
	fn padding_checks_reject_inconsistent_bytes() {
		assert!(unpad(&[1, 2, 3, 2, 2]).is_ok());
		assert!(unpad(&[1, 2, 3, 1, 2]).is_err());
		assert!(unpad(&[0]).is_err());
		assert!(unpad(&[33; 40]).is_err());
		assert!(unpad(&[]).is_err());
	}

	#[test]
	fn debug_output_hides_key() {
		assert_eq!(format!("{:?}", cipher()), "MessageCipher(<redacted>)");
	}
}
