//! Proof Pipeline
//!
//! Turns (secret, commitment, guess, feedback) into proof bytes and the
//! `ProofHash` stored on the ledger.
//!
//! ```text
//! open + compute pre-check ─► schema check ─► execute ─► prove ─► [local verify] ─► hash
//! ```
//!
//! Proving is expensive and never retried here. A failure is returned to
//! the caller, who decides whether to degrade to a placeholder hash under an
//! explicit [`ProofFallback::Placeholder`] policy.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::config::ProofConfig;
use crate::core::code::{Guess, Secret};
use crate::game::feedback::{compute, Feedback};
use crate::proof::artifact::{ProofArtifact, ProofHash};
use crate::proof::backend::{BackendError, OracleHash, ProvingBackend};
use crate::proof::commitment::{open, Commitment};
use crate::proof::inputs::{CircuitInputs, CIRCUIT_SCHEMA};

/// What the CodeMaker does when proof generation fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofFallback {
    /// Surface the error; nothing is submitted.
    #[default]
    Refuse,
    /// Submit a tagged placeholder hash with no honesty guarantee.
    Placeholder,
}

/// Proof generation failed for this feedback attempt.
#[derive(Debug, Clone, Error)]
pub enum ProofError {
    /// Backend could not be acquired.
    #[error("prover unavailable: {0}")]
    Unavailable(BackendError),

    /// Backend declares a different input interface than the crate encodes.
    #[error("circuit schema drift: {0}")]
    SchemaDrift(String),

    /// The secret does not open the commitment.
    #[error("secret does not open the published commitment")]
    CommitmentMismatch,

    /// Claimed feedback is not what the secret yields.
    #[error("claimed feedback {claimed} but secret yields {actual}")]
    InconsistentFeedback {
        /// Feedback the caller wanted to prove.
        claimed: Feedback,
        /// Feedback computed from the secret.
        actual: Feedback,
    },

    /// Witness or proof generation failed.
    #[error("proof generation failed: {0}")]
    GenerationFailed(BackendError),
}

/// Owns the proving backend and produces proof artifacts.
pub struct ProofPipeline<B: ProvingBackend> {
    backend_config: B::Config,
    backend: OnceCell<B>,
    oracle: OracleHash,
    verify_locally: bool,
}

impl<B: ProvingBackend> ProofPipeline<B> {
    const DIGEST_PINNED: () = assert!(
        B::COMMITMENT_DIGEST.is_pinned(),
        "proving backend asserts a different commitment digest"
    );

    /// Create a pipeline. The backend is loaded on first use.
    pub fn new(backend_config: B::Config, config: &ProofConfig) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::DIGEST_PINNED;

        Self {
            backend_config,
            backend: OnceCell::new(),
            oracle: config.oracle,
            verify_locally: config.verify_locally,
        }
    }

    /// Oracle variant proofs are generated with.
    pub fn oracle(&self) -> OracleHash {
        self.oracle
    }

    /// Whether the backend has been acquired.
    pub fn is_loaded(&self) -> bool {
        self.backend.initialized()
    }

    /// Acquire the backend, loading it once.
    pub async fn backend(&self) -> Result<&B, ProofError> {
        self.backend
            .get_or_try_init(|| async {
                info!("loading proving backend");
                B::load(&self.backend_config).await
            })
            .await
            .map_err(ProofError::Unavailable)
    }

    /// Prove that `feedback` is what `secret` yields for `guess`, and that
    /// `secret` opens `commitment`.
    #[instrument(skip_all, fields(guess = %guess, feedback = %feedback))]
    pub async fn prepare_and_prove(
        &self,
        secret: &Secret,
        commitment: Commitment,
        guess: Guess,
        feedback: Feedback,
    ) -> Result<ProofArtifact, ProofError> {
        if !open(&commitment, secret) {
            return Err(ProofError::CommitmentMismatch);
        }
        let actual = compute(secret.code(), &guess);
        if actual != feedback {
            return Err(ProofError::InconsistentFeedback { claimed: feedback, actual });
        }

        let backend = self.backend().await?;
        check_schema(backend)?;

        let inputs = CircuitInputs::new(secret, commitment, guess, feedback);
        let witness = backend.execute(&inputs).await.map_err(ProofError::GenerationFailed)?;
        let proof = backend
            .prove(&witness, self.oracle)
            .await
            .map_err(ProofError::GenerationFailed)?;
        debug!(bytes = proof.len(), "proof generated");

        let locally_verified = if self.verify_locally {
            match backend.verify(&proof, self.oracle).await {
                Ok(true) => Some(true),
                Ok(false) => {
                    warn!("local verification rejected the proof; submitting anyway");
                    Some(false)
                }
                Err(e) => {
                    warn!(error = %e, "local verification errored; submitting anyway");
                    None
                }
            }
        } else {
            None
        };

        let hash = ProofHash::of_proof(&proof);
        Ok(ProofArtifact { proof, hash, locally_verified })
    }

    /// Release the backend if it was loaded. The pipeline reloads on next use.
    pub async fn shutdown(&mut self) {
        if let Some(backend) = self.backend.take() {
            backend.release().await;
            info!("proving backend released");
        }
    }
}

fn check_schema<B: ProvingBackend>(backend: &B) -> Result<(), ProofError> {
    let declared = backend.declared_schema();
    if declared.len() != CIRCUIT_SCHEMA.len() {
        return Err(ProofError::SchemaDrift(format!(
            "expected {} fields, backend declares {}",
            CIRCUIT_SCHEMA.len(),
            declared.len()
        )));
    }
    for (i, (expected, got)) in CIRCUIT_SCHEMA.iter().zip(declared).enumerate() {
        if expected != got {
            return Err(ProofError::SchemaDrift(format!(
                "field {}: expected {:?}, backend declares {:?}",
                i, expected, got
            )));
        }
    }
    Ok(())
}
