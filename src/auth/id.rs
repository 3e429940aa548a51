//! Platform identifiers checked against the character sets the platform issues.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const MAX_ID_LEN: usize = 64;

/// Why an identifier was refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Nothing was supplied.
	#[error("{kind} cannot be empty.")]
	Empty {
		/// `appid` or `openid`.
		kind: &'static str,
	},
	/// A character outside the platform alphabet was found.
	#[error("{kind} contains `{found}`, which the platform never issues.")]
	UnexpectedChar {
		/// `appid` or `openid`.
		kind: &'static str,
		/// First offending character.
		found: char,
	},
	/// Longer than any identifier the platform issues.
	#[error("{kind} is longer than {max} characters.")]
	TooLong {
		/// `appid` or `openid`.
		kind: &'static str,
		/// Character limit.
		max: usize,
	},
}

macro_rules! platform_id {
	($(#[$meta:meta])* $name:ident, $kind:literal, $allowed:expr) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps `value`.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				check($kind, &value, $allowed)?;

				Ok(Self(value))
			}

			/// Borrows the raw identifier.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl From<$name> for String {
			fn from(id: $name) -> Self {
				id.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

platform_id! {
	/// Official Account application identifier (`appid`), for example `wxb11529c136998cb6`.
	AppId, "appid", |c: char| c.is_ascii_alphanumeric()
}
platform_id! {
	/// Per-application user identifier (`openid`); URL-safe base64 characters.
	OpenId, "openid", |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn check(kind: &'static str, value: &str, allowed: fn(char) -> bool) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if let Some(found) = value.chars().find(|c| !allowed(*c)) {
		return Err(IdentifierError::UnexpectedChar { kind, found });
	}
	if value.len() > MAX_ID_LEN {
		return Err(IdentifierError::TooLong { kind, max: MAX_ID_LEN });
	}

	Ok(())
}
