//! Domain-Separated Hashing
//!
//! Every digest the protocol publishes goes through this module:
//! - Secret commitments
//! - Proof hashes and degraded placeholders
//! - Transaction identifiers
//!
//! The digest function is pinned to SHA-256. Anything that must agree with
//! the proof circuit (see `proof::commitment`) reads [`PINNED_DIGEST`].

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// 32-byte digest.
pub type Digest32 = [u8; 32];

/// Digest functions a proving circuit may assert internally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestKind {
    /// SHA-256 over the byte encoding.
    Sha256,
    /// Pedersen hash over field elements.
    Pedersen,
    /// Poseidon2 sponge over field elements.
    Poseidon2,
}

impl DigestKind {
    /// Whether this is the digest the crate commits with.
    ///
    /// `const` so backends can be checked during monomorphization.
    pub const fn is_pinned(self) -> bool {
        matches!(self, DigestKind::Sha256)
    }
}

/// The digest function used for commitments on both sides of the proof.
pub const PINNED_DIGEST: DigestKind = DigestKind::Sha256;

/// Incremental SHA-256 seeded with a domain tag.
///
/// Integers are absorbed little-endian; the update order is part of the
/// encoding.
pub struct DomainHasher {
    inner: Sha256,
}

impl DomainHasher {
    /// Start a digest under `domain`.
    pub fn new(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update(domain);
        Self { inner }
    }

    /// Absorb bytes as-is.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Absorb one byte.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.update_bytes(&[value]);
    }

    /// Absorb a `u32`.
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.update_bytes(&value.to_le_bytes());
    }

    /// Absorb a `u64`.
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.update_bytes(&value.to_le_bytes());
    }

    /// Digest of everything absorbed.
    pub fn finalize(self) -> Digest32 {
        self.inner.finalize().into()
    }
}

/// Untagged SHA-256. Used only where the circuit side hashes raw bytes.
pub fn hash_bytes(data: &[u8]) -> Digest32 {
    Sha256::digest(data).into()
}

/// One-shot digest of `data` under `domain`.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Digest32 {
    let mut hasher = DomainHasher::new(domain);
    hasher.update_bytes(data);
    hasher.finalize()
}
