//! Feedback Proof Verification
//!
//! The CodeBreaker's side of the proof: proof bytes arrive off-protocol and
//! are checked against what the ledger stored for that guess.
//!
//! A record passes when:
//! - its stored hash is a real proof hash (not a placeholder)
//! - the proof bytes hash to it
//! - the proof's statement is (commitment, guess, feedback) as stored
//! - the backend accepts the proof

use thiserror::Error;
use tracing::debug;

use crate::game::state::GuessRecord;
use crate::proof::artifact::ProofHash;
use crate::proof::backend::{BackendError, OracleHash, ProvingBackend};
use crate::proof::commitment::Commitment;
use crate::proof::inputs::PublicInputs;
use crate::proof::pipeline::{ProofError, ProofPipeline};

/// Why a feedback record failed verification.
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    /// Stored hash is a degraded placeholder; there is nothing to verify.
    #[error("record carries a placeholder hash, feedback is unproven")]
    Placeholder,

    /// Proof bytes do not hash to the stored value.
    #[error("proof bytes do not match the stored proof hash")]
    HashMismatch,

    /// Proof attests to a different statement.
    #[error("proof attests to {got:?}, record is {expected:?}")]
    StatementMismatch {
        /// Statement built from the ledger record.
        expected: PublicInputs,
        /// Statement read from the proof.
        got: PublicInputs,
    },

    /// Backend rejected the proof.
    #[error("proof rejected by verifier")]
    Rejected,

    /// Backend failed.
    #[error("verifier error: {0}")]
    Backend(#[from] BackendError),

    /// Backend could not be acquired.
    #[error(transparent)]
    Pipeline(#[from] ProofError),
}

/// Check `proof` against a stored guess record.
pub async fn verify_record<B: ProvingBackend>(
    backend: &B,
    mode: OracleHash,
    commitment: &Commitment,
    record: &GuessRecord,
    proof: &[u8],
) -> Result<(), VerificationError> {
    if !record.proof_hash.is_proof() {
        return Err(VerificationError::Placeholder);
    }
    if ProofHash::of_proof(proof) != record.proof_hash {
        return Err(VerificationError::HashMismatch);
    }

    let expected = PublicInputs {
        commitment: *commitment,
        guess: record.guess,
        feedback: record.feedback,
    };
    let got = backend.public_inputs(proof)?;
    if got != expected {
        return Err(VerificationError::StatementMismatch { expected, got });
    }

    if !backend.verify(proof, mode).await? {
        return Err(VerificationError::Rejected);
    }
    debug!(guess = %record.guess, feedback = %record.feedback, "feedback proof verified");
    Ok(())
}

impl<B: ProvingBackend> ProofPipeline<B> {
    /// Check `proof` against a stored guess record with this pipeline's backend.
    pub async fn verify_record(
        &self,
        commitment: &Commitment,
        record: &GuessRecord,
        proof: &[u8],
    ) -> Result<(), VerificationError> {
        let backend = self.backend().await?;
        verify_record(backend, self.oracle(), commitment, record, proof).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProofConfig;
    use crate::core::code::{Code, Secret};
    use crate::game::feedback::Feedback;
    use crate::proof::commitment::commit;
    use crate::proof::stub::{StubBackend, StubConfig};

    struct Fixture {
        pipeline: ProofPipeline<StubBackend>,
        commitment: Commitment,
        record: GuessRecord,
        proof: Vec<u8>,
    }

    async fn fixture() -> Fixture {
        let pipeline = ProofPipeline::new(StubConfig::default(), &ProofConfig::default());
        let secret = Secret::new(Code::new([0, 0, 1, 2]).unwrap());
        let commitment = commit(&secret);
        let guess = Code::new([0, 1, 0, 0]).unwrap();
        let feedback = Feedback::new(1, 2).unwrap();
        let artifact = pipeline
            .prepare_and_prove(&secret, commitment, guess, feedback)
            .await
            .unwrap();
        Fixture {
            pipeline,
            commitment,
            record: GuessRecord { guess, feedback, proof_hash: artifact.hash },
            proof: artifact.proof,
        }
    }

    #[tokio::test]
    async fn test_valid_record() {
        let f = fixture().await;
        f.pipeline.verify_record(&f.commitment, &f.record, &f.proof).await.unwrap();
    }

    #[tokio::test]
    async fn test_hash_mismatch() {
        let f = fixture().await;
        let mut proof = f.proof.clone();
        let last = proof.len() - 1;
        proof[last] ^= 1;
        assert!(matches!(
            f.pipeline.verify_record(&f.commitment, &f.record, &proof).await,
            Err(VerificationError::HashMismatch)
        ));
    }

    #[tokio::test]
    async fn test_statement_mismatch() {
        let f = fixture().await;
        // Ledger says one thing, the (validly hashed) proof another.
        let mut record = f.record.clone();
        record.feedback = Feedback::new(0, 3).unwrap();
        assert!(matches!(
            f.pipeline.verify_record(&f.commitment, &record, &f.proof).await,
            Err(VerificationError::StatementMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_placeholder_never_verifies() {
        let f = fixture().await;
        let mut record = f.record.clone();
        record.proof_hash = ProofHash::placeholder(&f.commitment, &record.guess, &record.feedback);
        assert!(matches!(
            f.pipeline.verify_record(&f.commitment, &record, &f.proof).await,
            Err(VerificationError::Placeholder)
        ));
    }
}
