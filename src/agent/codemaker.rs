//! CodeMaker Driver
//!
//! Holds the secret and is the only place it lives. Publishes the
//! commitment, then answers each pending guess with proven feedback.
//!
//! Every move is checked against a fresh snapshot before anything is sent,
//! so a protocol violation never reaches the ledger.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::code::{Guess, Secret};
use crate::error::Result;
use crate::game::feedback::{compute, Feedback};
use crate::game::state::{Address, GamePhase, GameSession, SessionId, MAX_GUESSES};
use crate::game::transition::GameError;
use crate::ledger::client::{LedgerClient, Wallet};
use crate::ledger::hub::GameHub;
use crate::ledger::transactor::{LedgerTransactor, SubmitOutcome};
use crate::ledger::types::Operation;
use crate::proof::artifact::ProofHash;
use crate::proof::backend::ProvingBackend;
use crate::proof::commitment::{commit, Commitment};
use crate::proof::pipeline::{ProofError, ProofFallback, ProofPipeline};

/// Result of answering one guess.
#[derive(Debug, Clone)]
pub struct FeedbackResponse {
    /// Zero-based guess ordinal.
    pub ordinal: u32,
    /// The answered guess.
    pub guess: Guess,
    /// Disclosed feedback.
    pub feedback: Feedback,
    /// Hash stored on the ledger.
    pub proof_hash: ProofHash,
    /// Proof bytes to share with the CodeBreaker. `None` under the placeholder fallback.
    pub proof: Option<Vec<u8>>,
    /// Ledger confirmation.
    pub outcome: SubmitOutcome,
}

/// The secret-holding party.
pub struct CodeMaker<L: LedgerClient, B: ProvingBackend> {
    session_id: SessionId,
    secret: Secret,
    commitment: Commitment,
    wallet: Arc<dyn Wallet>,
    transactor: LedgerTransactor<L>,
    pipeline: ProofPipeline<B>,
    fallback: ProofFallback,
    proofs: BTreeMap<u32, Vec<u8>>,
    max_guesses: u32,
    hub: Option<Arc<dyn GameHub>>,
    reported: Option<bool>,
}

impl<L: LedgerClient, B: ProvingBackend> CodeMaker<L, B> {
    /// Create a CodeMaker for `session_id` holding `secret`.
    pub fn new(
        session_id: SessionId,
        secret: Secret,
        wallet: Arc<dyn Wallet>,
        transactor: LedgerTransactor<L>,
        pipeline: ProofPipeline<B>,
        fallback: ProofFallback,
    ) -> Self {
        let commitment = commit(&secret);
        Self {
            session_id,
            secret,
            commitment,
            wallet,
            transactor,
            pipeline,
            fallback,
            proofs: BTreeMap::new(),
            max_guesses: MAX_GUESSES,
            hub: None,
            reported: None,
        }
    }

    /// Guess limit the local draft is checked against.
    pub fn with_max_guesses(mut self, max_guesses: u32) -> Self {
        self.max_guesses = max_guesses;
        self
    }

    /// Report the outcome to `hub` once the session finishes.
    pub fn with_hub(mut self, hub: Arc<dyn GameHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Own account.
    pub fn address(&self) -> &Address {
        self.wallet.address()
    }

    /// Commitment to the held secret.
    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// Session this CodeMaker plays.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Proof bytes for an answered guess, for off-protocol sharing.
    pub fn proof_for(&self, ordinal: u32) -> Option<&[u8]> {
        self.proofs.get(&ordinal).map(Vec::as_slice)
    }

    /// Lobby draft of the session this CodeMaker would initiate.
    pub fn draft(&self, codebreaker: Address) -> GameSession {
        GameSession::lobby(self.session_id, self.address().clone(), codebreaker, self.max_guesses)
    }

    /// Current session snapshot.
    pub async fn fetch(&self) -> Result<GameSession> {
        Ok(self.transactor.fetch_game(self.session_id).await?)
    }

    /// Create the session with `codebreaker`. Their authorization is
    /// collected through the transactor's registered co-signer.
    #[instrument(skip(self), fields(session_id = self.session_id))]
    pub async fn initiate(&self, codebreaker: Address) -> Result<SubmitOutcome> {
        let mut draft = self.draft(codebreaker.clone());
        draft.initiate()?;

        let op = Operation::Initiate {
            session_id: self.session_id,
            codemaker: self.address().clone(),
            codebreaker,
        };
        let outcome = self.transactor.submit(self.wallet.as_ref(), op).await?;
        info!(ledger = outcome.ledger, "session initiated");

        let session = self.fetch().await?;
        if session.max_guesses != self.max_guesses {
            warn!(ledger_limit = session.max_guesses, local_limit = self.max_guesses, "guess limit differs from the ledger's");
        }
        Ok(outcome)
    }

    /// Publish the commitment.
    #[instrument(skip(self), fields(session_id = self.session_id))]
    pub async fn commit(&self) -> Result<SubmitOutcome> {
        let mut session = self.fetch().await?;
        session.commit_code(self.address(), self.commitment)?;

        let op = Operation::CommitCode {
            session_id: self.session_id,
            codemaker: self.address().clone(),
            commitment: self.commitment,
        };
        let outcome = self.transactor.submit(self.wallet.as_ref(), op).await?;
        info!(commitment = %self.commitment, "commitment published");
        Ok(outcome)
    }

    /// Answer the pending guess with proven feedback.
    #[instrument(skip(self), fields(session_id = self.session_id))]
    pub async fn respond(&mut self) -> Result<FeedbackResponse> {
        let session = self.fetch().await?;
        if session.is_finished() {
            return Err(GameError::GameAlreadyEnded.into());
        }
        let guess = match (session.phase, session.pending_guess) {
            (GamePhase::WaitingForFeedback, Some(guess)) => guess,
            _ => return Err(GameError::InvalidPhase.into()),
        };
        if session.commitment != Some(self.commitment) {
            return Err(ProofError::CommitmentMismatch.into());
        }

        let feedback = compute(self.secret.code(), &guess);
        let (proof_hash, proof) = match self
            .pipeline
            .prepare_and_prove(&self.secret, self.commitment, guess, feedback)
            .await
        {
            Ok(artifact) => (artifact.hash, Some(artifact.proof)),
            Err(e) if self.fallback == ProofFallback::Placeholder => {
                warn!(error = %e, "proof generation failed, submitting placeholder hash");
                (ProofHash::placeholder(&self.commitment, &guess, &feedback), None)
            }
            Err(e) => return Err(e.into()),
        };

        let ordinal = session.guess_count();
        let mut preview = session;
        preview.submit_feedback(
            self.address(),
            feedback.exact_matches as u32,
            feedback.color_matches as u32,
            proof_hash,
        )?;

        let op = Operation::SubmitFeedback {
            session_id: self.session_id,
            codemaker: self.address().clone(),
            exact_matches: feedback.exact_matches as u32,
            color_matches: feedback.color_matches as u32,
            proof_hash,
        };
        let outcome = self.transactor.submit(self.wallet.as_ref(), op).await?;
        info!(ordinal, %guess, %feedback, route = ?outcome.route, "feedback recorded");

        if let Some(bytes) = &proof {
            self.proofs.insert(ordinal, bytes.clone());
        }
        Ok(FeedbackResponse { ordinal, guess, feedback, proof_hash, proof, outcome })
    }

    /// Report the finished session to the hub, once.
    ///
    /// Returns whether the codemaker won, or `None` without a hub.
    #[instrument(skip(self), fields(session_id = self.session_id))]
    pub async fn report_result(&mut self) -> Result<Option<bool>> {
        let Some(hub) = self.hub.clone() else {
            return Ok(None);
        };
        if let Some(codemaker_won) = self.reported {
            return Ok(Some(codemaker_won));
        }

        let codemaker_won = self.fetch().await?.codemaker_won()?;
        hub.end_game(self.session_id, codemaker_won).await?;
        self.reported = Some(codemaker_won);
        info!(codemaker_won, "result reported");
        Ok(Some(codemaker_won))
    }

    /// Release the proving backend.
    pub async fn shutdown(&mut self) {
        self.pipeline.shutdown().await;
    }
}
