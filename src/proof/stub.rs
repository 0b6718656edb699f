//! Stub Proving Backend
//!
//! Enforces the feedback circuit's constraints in the clear during
//! `execute` and emits a transparent "proof" that only encodes the public
//! statement. It is NOT zero-knowledge and NOT sound against a malicious
//! prover; it exists so the pipeline, the transactor and the agents can be
//! exercised end to end without an external prover.
//!
//! Proof layout:
//!
//! ```text
//! "ZKMSTUB1" (8) || oracle (1) || public elements, u32 LE (14 * 4)
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use tracing::debug;

use crate::core::code::{Code, CODE_LENGTH};
use crate::core::hash::{DigestKind, PINNED_DIGEST};
use crate::game::feedback::{compute, Feedback};
use crate::proof::backend::{BackendError, OracleHash, ProvingBackend, Witness};
use crate::proof::commitment::{open, Commitment};
use crate::proof::inputs::{CircuitInputs, InputField, PublicInputs, CIRCUIT_SCHEMA, INPUT_ELEMENT_COUNT};

const MAGIC: &[u8; 8] = b"ZKMSTUB1";
const PUBLIC_ELEMENTS: usize = INPUT_ELEMENT_COUNT - CODE_LENGTH;

/// Length of a stub proof.
pub const STUB_PROOF_LEN: usize = MAGIC.len() + 1 + PUBLIC_ELEMENTS * 4;

/// Load and release counters, shared with whoever built the config.
#[derive(Clone, Debug, Default)]
pub struct StubCounters {
    /// Successful loads.
    pub loads: Arc<AtomicUsize>,
    /// Releases.
    pub releases: Arc<AtomicUsize>,
}

impl StubCounters {
    /// Loads so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Releases so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Stub configuration with fault injection.
#[derive(Clone, Debug)]
pub struct StubConfig {
    /// Schema the "circuit" declares.
    pub schema: Vec<InputField>,
    /// Fail `load` with `Unavailable`.
    pub fail_load: bool,
    /// Fail `prove` after a successful `execute`.
    pub fail_prove: bool,
    /// Make `verify` return false for every proof.
    pub reject_verify: bool,
    /// Emit proofs without the magic prefix, so decoding them fails.
    pub malformed_proofs: bool,
    /// Shared counters.
    pub counters: StubCounters,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            schema: CIRCUIT_SCHEMA.to_vec(),
            fail_load: false,
            fail_prove: false,
            reject_verify: false,
            malformed_proofs: false,
            counters: StubCounters::default(),
        }
    }
}

/// Clear-text backend for tests and the demo.
#[derive(Debug)]
pub struct StubBackend {
    config: StubConfig,
}

impl StubBackend {
    fn oracle_byte(mode: OracleHash) -> u8 {
        match mode {
            OracleHash::Keccak => 0,
            OracleHash::Poseidon2 => 1,
        }
    }

    fn decode(proof: &[u8]) -> Result<(u8, PublicInputs), BackendError> {
        if proof.len() != STUB_PROOF_LEN {
            return Err(BackendError::InvalidProofFormat(format!(
                "expected {} bytes, got {}",
                STUB_PROOF_LEN,
                proof.len()
            )));
        }
        if &proof[..MAGIC.len()] != MAGIC {
            return Err(BackendError::InvalidProofFormat("bad magic".into()));
        }

        let oracle = proof[MAGIC.len()];
        let elements: Vec<u32> = proof[MAGIC.len() + 1..]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let mut digest = [0u8; 32];
        for (i, word) in elements[..8].iter().enumerate() {
            digest[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        let guess = Code::from_values(&elements[8..12])
            .map_err(|e| BackendError::InvalidProofFormat(e.to_string()))?;
        let feedback = Feedback::new(elements[12], elements[13])
            .ok_or_else(|| BackendError::InvalidProofFormat("feedback out of range".into()))?;

        Ok((oracle, PublicInputs { commitment: Commitment(digest), guess, feedback }))
    }
}

#[async_trait]
impl ProvingBackend for StubBackend {
    const COMMITMENT_DIGEST: DigestKind = PINNED_DIGEST;

    type Config = StubConfig;

    async fn load(config: &StubConfig) -> Result<Self, BackendError> {
        if config.fail_load {
            return Err(BackendError::Unavailable("stub configured to fail load".into()));
        }
        config.counters.loads.fetch_add(1, Ordering::SeqCst);
        debug!("stub backend loaded");
        Ok(Self { config: config.clone() })
    }

    fn declared_schema(&self) -> &[InputField] {
        &self.config.schema
    }

    async fn execute(&self, inputs: &CircuitInputs) -> Result<Witness, BackendError> {
        let public = *inputs.public();
        if !open(&public.commitment, inputs.secret()) {
            return Err(BackendError::ConstraintFailed("commitment does not open to secret".into()));
        }
        if compute(inputs.secret().code(), &public.guess) != public.feedback {
            return Err(BackendError::ConstraintFailed("feedback does not match secret".into()));
        }

        let bytes = inputs
            .to_field_elements()
            .iter()
            .flat_map(|e| e.to_le_bytes())
            .collect();
        Ok(Witness { bytes, public })
    }

    async fn prove(&self, witness: &Witness, mode: OracleHash) -> Result<Vec<u8>, BackendError> {
        if self.config.fail_prove {
            return Err(BackendError::Other("stub configured to fail prove".into()));
        }
        let mut proof = Vec::with_capacity(STUB_PROOF_LEN);
        if self.config.malformed_proofs {
            proof.extend_from_slice(&[0; 8]);
        } else {
            proof.extend_from_slice(MAGIC);
        }
        proof.push(Self::oracle_byte(mode));
        for element in witness.public.to_field_elements() {
            proof.extend_from_slice(&element.to_le_bytes());
        }
        Ok(proof)
    }

    async fn verify(&self, proof: &[u8], mode: OracleHash) -> Result<bool, BackendError> {
        let (oracle, _) = Self::decode(proof)?;
        Ok(!self.config.reject_verify && oracle == Self::oracle_byte(mode))
    }

    fn public_inputs(&self, proof: &[u8]) -> Result<PublicInputs, BackendError> {
        Self::decode(proof).map(|(_, public)| public)
    }

    async fn release(self) {
        self.config.counters.releases.fetch_add(1, Ordering::SeqCst);
        debug!("stub backend released");
    }
}
