//! Proof Artifacts
//!
//! `ProofHash` is what the ledger stores next to each feedback. It is a
//! pointer to proof material, never a proof by itself.
//!
//! Stored bytes are tagged so a degraded placeholder can never be read back
//! as a real proof hash:
//!
//! ```text
//! 0x01 || sha256(proof_bytes)                          real proof
//! 0x00 || sha256("ZKMIND_PLACEHOLDER_V1" || disclosed) placeholder, no honesty guarantee
//! ```

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::code::Guess;
use crate::core::hash::{Digest32, DomainHasher, hash_bytes};
use crate::game::feedback::Feedback;
use crate::proof::commitment::Commitment;

/// Domain separator for placeholder hashes.
const PLACEHOLDER_DOMAIN: &[u8] = b"ZKMIND_PLACEHOLDER_V1";

/// Length of an encoded proof hash.
pub const PROOF_HASH_LEN: usize = 33;

/// Where a proof hash came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProofHashKind {
    /// Digest of the disclosed values only. Carries no honesty guarantee.
    Placeholder = 0,
    /// Digest of real proof bytes.
    Proof = 1,
}

/// Tagged digest stored with each feedback.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofHash {
    /// Origin tag.
    pub kind: ProofHashKind,
    /// SHA-256 digest.
    pub digest: Digest32,
}

/// Malformed proof hash bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofHashError {
    /// Wrong byte length.
    #[error("proof hash must be {PROOF_HASH_LEN} bytes, got {0}")]
    Length(usize),
    /// Unknown tag byte.
    #[error("unknown proof hash tag {0:#04x}")]
    Tag(u8),
}

impl ProofHash {
    /// Hash real proof bytes.
    pub fn of_proof(proof: &[u8]) -> Self {
        Self { kind: ProofHashKind::Proof, digest: hash_bytes(proof) }
    }

    /// Non-cryptographic stand-in built from the disclosed values.
    pub fn placeholder(commitment: &Commitment, guess: &Guess, feedback: &Feedback) -> Self {
        let mut hasher = DomainHasher::new(PLACEHOLDER_DOMAIN);
        hasher.update_bytes(commitment.as_bytes());
        for &symbol in guess.symbols() {
            hasher.update_u32(symbol as u32);
        }
        hasher.update_u8(feedback.exact_matches);
        hasher.update_u8(feedback.color_matches);
        Self { kind: ProofHashKind::Placeholder, digest: hasher.finalize() }
    }

    /// Whether this points at a real proof.
    #[inline]
    pub fn is_proof(&self) -> bool {
        self.kind == ProofHashKind::Proof
    }

    /// Encode for the ledger.
    pub fn to_bytes(&self) -> [u8; PROOF_HASH_LEN] {
        let mut out = [0u8; PROOF_HASH_LEN];
        out[0] = self.kind as u8;
        out[1..].copy_from_slice(&self.digest);
        out
    }

    /// Decode ledger bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofHashError> {
        if bytes.len() != PROOF_HASH_LEN {
            return Err(ProofHashError::Length(bytes.len()));
        }
        let kind = match bytes[0] {
            0 => ProofHashKind::Placeholder,
            1 => ProofHashKind::Proof,
            other => return Err(ProofHashError::Tag(other)),
        };
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[1..]);
        Ok(Self { kind, digest })
    }
}

impl fmt::Debug for ProofHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofHash({:?}, {})", self.kind, hex::encode(self.digest))
    }
}

/// Output of a successful proof run.
#[derive(Clone, Debug)]
pub struct ProofArtifact {
    /// Proof bytes, shared with the CodeBreaker off-protocol.
    pub proof: Vec<u8>,
    /// Hash submitted to the ledger.
    pub hash: ProofHash,
    /// Result of the optional local verification (`None` if skipped or errored).
    pub locally_verified: Option<bool>,
}
