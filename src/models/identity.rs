//! Anonymous identity model.

use serde::{Deserialize, Serialize};

/// Pseudonym prefix.
pub const PSEUDONYM_PREFIX: &str = "Anon_";
/// Number of random characters after the prefix.
pub const PSEUDONYM_SUFFIX_LEN: usize = 6;
/// Token length in bytes before hex encoding.
pub const TOKEN_BYTES: usize = 32;

/// Device-scoped pseudonymous identity.
///
/// The token is a private capability and must never be shown or logged;
/// `Debug` is implemented by hand to redact it.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnonymousIdentity {
    pub id: String,
    pub token: String,
}

impl AnonymousIdentity {
    /// Whether a stored record still has the shape this provider generates.
    pub fn is_well_formed(&self) -> bool {
        is_valid_pseudonym(&self.id)
            && self.token.len() == TOKEN_BYTES * 2
            && self.token.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// The part of the identity that may leave the process.
    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id.clone(),
        }
    }
}

impl std::fmt::Debug for AnonymousIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonymousIdentity")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Identity as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicIdentity {
    pub id: String,
}

/// `Anon_` followed by exactly six characters from `[A-Z0-9]`.
pub fn is_valid_pseudonym(id: &str) -> bool {
    match id.strip_prefix(PSEUDONYM_PREFIX) {
        Some(suffix) => {
            suffix.len() == PSEUDONYM_SUFFIX_LEN
                && suffix
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        }
        None => false,
    }
}
