//! Anonymous identity provider.
//!
//! Creates one pseudonymous identity per storage namespace and hands it to
//! whatever needs to stamp authorship. When the backing store fails the
//! provider keeps working with an identity held in memory until the process
//! exits.

mod store;

pub use store::*;

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::models::{AnonymousIdentity, PSEUDONYM_PREFIX, PSEUDONYM_SUFFIX_LEN, TOKEN_BYTES};

/// Storage key holding the JSON-encoded identity.
pub const SESSION_KEY: &str = "civic_anon_session";

const PSEUDONYM_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a display pseudonym, `Anon_` plus six characters of `[A-Z0-9]`.
pub fn generate_pseudonym<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut id = String::with_capacity(PSEUDONYM_PREFIX.len() + PSEUDONYM_SUFFIX_LEN);
    id.push_str(PSEUDONYM_PREFIX);
    for _ in 0..PSEUDONYM_SUFFIX_LEN {
        let idx = rng.gen_range(0..PSEUDONYM_CHARSET.len());
        id.push(PSEUDONYM_CHARSET[idx] as char);
    }
    id
}

/// Generate a 32-byte secret token from the OS CSPRNG, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn generate_identity() -> AnonymousIdentity {
    AnonymousIdentity {
        id: generate_pseudonym(&mut rand::thread_rng()),
        token: generate_token(),
    }
}

/// Lazily creates, persists and clears the viewer's identity.
pub struct IdentityProvider {
    store: Box<dyn KeyValueStore>,
    degraded: bool,
    fallback: Option<AnonymousIdentity>,
}

impl IdentityProvider {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            degraded: false,
            fallback: None,
        }
    }

    /// Provider that never persists.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// True once a storage failure has switched the provider to memory.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Return the persisted identity, creating and persisting one if absent
    /// or malformed.
    pub fn get_or_create_identity(&mut self) -> AnonymousIdentity {
        if self.degraded {
            return self.fallback.get_or_insert_with(generate_identity).clone();
        }

        match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<AnonymousIdentity>(&raw) {
                Ok(identity) if identity.is_well_formed() => return identity,
                _ => tracing::warn!("Stored anonymous identity is malformed, regenerating"),
            },
            Ok(None) => {}
            Err(e) => {
                self.degrade(&e);
                return self.fallback.get_or_insert_with(generate_identity).clone();
            }
        }

        let identity = generate_identity();
        if let Err(e) = self.persist(&identity) {
            self.degrade(&e);
            self.fallback = Some(identity.clone());
        } else {
            tracing::info!(pseudonym = %identity.id, "Created anonymous identity");
        }

        identity
    }

    /// Forget the current identity. The next call to
    /// [`get_or_create_identity`](Self::get_or_create_identity) yields an
    /// unrelated one.
    ///
    /// If the record cannot be removed it is overwritten with a fresh
    /// identity, so the old one cannot come back after a restart.
    pub fn clear_identity(&mut self) {
        self.fallback = None;
        if self.degraded {
            return;
        }
        let Err(remove_err) = self.store.remove(SESSION_KEY) else {
            return;
        };

        let replacement = generate_identity();
        match self.persist(&replacement) {
            Ok(()) => tracing::warn!(
                "Could not remove anonymous identity ({}); replaced it with {}",
                remove_err,
                replacement.id
            ),
            Err(e) => {
                tracing::error!(
                    "Anonymous identity could neither be removed nor replaced ({}); the old identity will return after a restart",
                    e
                );
                self.degraded = true;
            }
        }
    }

    fn persist(&mut self, identity: &AnonymousIdentity) -> Result<(), crate::errors::AppError> {
        let encoded = serde_json::to_string(identity)?;
        self.store.set(SESSION_KEY, &encoded)
    }

    fn degrade(&mut self, err: &crate::errors::AppError) {
        tracing::warn!(
            "Identity storage unavailable ({}); using an in-memory identity for this process",
            err
        );
        self.degraded = true;
    }
}
