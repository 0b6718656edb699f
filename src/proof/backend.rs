//! Proving Backend Boundary
//!
//! The concrete zero-knowledge prover is external. This trait is the whole
//! of what the protocol needs from it: witness generation, proving, local
//! verification, and reading the statement back out of a proof.
//!
//! A backend is a heavy resource. It is loaded once from its config,
//! owned by a `ProofPipeline`, and released explicitly.

use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::DigestKind;
use crate::proof::inputs::{CircuitInputs, InputField, PublicInputs};

/// Oracle hash variant used for the proof transcript.
///
/// `Keccak` produces proofs the on-chain verifier accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleHash {
    /// Keccak transcript, on-chain verifiable.
    #[default]
    Keccak,
    /// Poseidon2 transcript, recursion friendly.
    Poseidon2,
}

impl OracleHash {
    /// Parse a config value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "keccak" => Some(Self::Keccak),
            "poseidon2" => Some(Self::Poseidon2),
            _ => None,
        }
    }
}

/// Opaque solved witness.
#[derive(Clone, Debug)]
pub struct Witness {
    /// Backend-specific encoding.
    pub bytes: Vec<u8>,
    /// Statement the witness satisfies.
    pub public: PublicInputs,
}

/// Errors from the proving backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Backend could not be loaded or reached.
    #[error("prover unavailable: {0}")]
    Unavailable(String),

    /// Inputs do not satisfy the circuit.
    #[error("circuit constraint failed: {0}")]
    ConstraintFailed(String),

    /// Proof bytes are malformed.
    #[error("invalid proof format: {0}")]
    InvalidProofFormat(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Other(String),
}

/// External zero-knowledge prover for the feedback circuit.
#[async_trait]
pub trait ProvingBackend: Send + Sync + Sized {
    /// Digest the circuit asserts for the commitment.
    ///
    /// Must be the crate's pinned digest; `ProofPipeline::new` refuses to
    /// compile otherwise.
    const COMMITMENT_DIGEST: DigestKind;

    /// Load-time configuration.
    type Config: Send + Sync;

    /// Acquire the backend.
    async fn load(config: &Self::Config) -> Result<Self, BackendError>;

    /// Input interface the loaded circuit declares.
    fn declared_schema(&self) -> &[InputField];

    /// Solve the witness for `inputs`.
    async fn execute(&self, inputs: &CircuitInputs) -> Result<Witness, BackendError>;

    /// Generate proof bytes.
    async fn prove(&self, witness: &Witness, mode: OracleHash) -> Result<Vec<u8>, BackendError>;

    /// Verify proof bytes.
    async fn verify(&self, proof: &[u8], mode: OracleHash) -> Result<bool, BackendError>;

    /// Statement a proof attests to.
    fn public_inputs(&self, proof: &[u8]) -> Result<PublicInputs, BackendError>;

    /// Release backend resources.
    async fn release(self) {}
}
