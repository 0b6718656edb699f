//! CodeBreaker Driver
//!
//! Submits guesses, checks the proofs the CodeMaker shares, and tracks the
//! codes still consistent with every disclosed feedback.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::code::{Code, Guess, CODE_SPACE};
use crate::error::{Error, Result};
use crate::game::feedback::{compute, Feedback};
use crate::game::state::{Address, GameSession, SessionId};
use crate::game::transition::GameError;
use crate::ledger::client::{LedgerClient, Wallet};
use crate::ledger::transactor::{LedgerTransactor, SubmitOutcome};
use crate::ledger::types::Operation;
use crate::proof::backend::ProvingBackend;
use crate::proof::pipeline::ProofPipeline;

/// Opening guess while every code is still possible.
const OPENING_GUESS: [u8; 4] = [0, 0, 1, 1];

// =============================================================================
// CANDIDATES
// =============================================================================

/// Codes consistent with all feedback seen so far.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    candidates: Vec<Code>,
}

impl CandidateSet {
    /// Every code.
    pub fn new() -> Self {
        Self { candidates: Code::all().collect() }
    }

    /// Remaining candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether no code is consistent (feedback contradicts itself).
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Whether `code` is still possible.
    pub fn contains(&self, code: &Code) -> bool {
        self.candidates.contains(code)
    }

    /// Keep codes that would have produced `feedback` for `guess`.
    pub fn prune(&mut self, guess: &Guess, feedback: Feedback) {
        self.candidates.retain(|c| compute(c, guess) == feedback);
    }

    /// Next guess: a fixed opening, then the first remaining candidate.
    pub fn suggest(&self) -> Option<Guess> {
        if self.candidates.len() == CODE_SPACE {
            return Code::new(OPENING_GUESS).ok();
        }
        self.candidates.first().copied()
    }
}

impl Default for CandidateSet {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// The guessing party.
pub struct CodeBreaker<L: LedgerClient, B: ProvingBackend> {
    session_id: SessionId,
    wallet: Arc<dyn Wallet>,
    transactor: LedgerTransactor<L>,
    verifier: ProofPipeline<B>,
    candidates: CandidateSet,
    observed: usize,
}

impl<L: LedgerClient, B: ProvingBackend> CodeBreaker<L, B> {
    /// Create a CodeBreaker for `session_id`. `verifier` checks shared proofs.
    pub fn new(
        session_id: SessionId,
        wallet: Arc<dyn Wallet>,
        transactor: LedgerTransactor<L>,
        verifier: ProofPipeline<B>,
    ) -> Self {
        Self {
            session_id,
            wallet,
            transactor,
            verifier,
            candidates: CandidateSet::new(),
            observed: 0,
        }
    }

    /// Own account.
    pub fn address(&self) -> &Address {
        self.wallet.address()
    }

    /// Candidate tracking state.
    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    /// Fetch the session and fold in any new feedback.
    pub async fn sync(&mut self) -> Result<GameSession> {
        let session = self.transactor.fetch_game(self.session_id).await?;
        for record in session.records.iter().skip(self.observed) {
            self.candidates.prune(&record.guess, record.feedback);
        }
        if session.records.len() > self.observed {
            debug!(remaining = self.candidates.len(), "candidates pruned");
            self.observed = session.records.len();
        }
        Ok(session)
    }

    /// Submit `guess`.
    #[instrument(skip(self), fields(session_id = self.session_id))]
    pub async fn guess(&mut self, guess: Guess) -> Result<SubmitOutcome> {
        let mut session = self.sync().await?;
        session.submit_guess(self.address(), guess)?;

        let op = Operation::SubmitGuess {
            session_id: self.session_id,
            codebreaker: self.address().clone(),
            guess: guess.to_values().to_vec(),
        };
        let outcome = self.transactor.submit(self.wallet.as_ref(), op).await?;
        info!(%guess, ordinal = session.guess_count(), "guess submitted");
        Ok(outcome)
    }

    /// Submit the candidate set's suggestion.
    pub async fn guess_next(&mut self) -> Result<Guess> {
        self.sync().await?;
        let guess = self.candidates.suggest().ok_or(Error::ContradictoryFeedback)?;
        self.guess(guess).await?;
        Ok(guess)
    }

    /// Check proof bytes shared for answered guess `ordinal`.
    #[instrument(skip(self, proof), fields(session_id = self.session_id))]
    pub async fn verify_feedback(&self, ordinal: u32, proof: &[u8]) -> Result<()> {
        let session = self.transactor.fetch_game(self.session_id).await?;
        let commitment = session.commitment.ok_or(GameError::InvalidPhase)?;
        let record = session.records.get(ordinal as usize).ok_or(GameError::InvalidPhase)?;
        self.verifier.verify_record(&commitment, record, proof).await?;
        info!(ordinal, "feedback proof verified");
        Ok(())
    }

    /// Release the verifying backend.
    pub async fn shutdown(&mut self) {
        self.verifier.shutdown().await;
    }
}
