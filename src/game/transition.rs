//! Session Transitions
//!
//! The only ways a `GameSession` changes. Each transition checks all of its
//! guards before touching any field, so a rejected call leaves the session
//! exactly as it was.
//!
//! Guard order is fixed: terminal state, then phase, then actor, then the
//! transition's own argument checks.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::code::{CodeError, Guess};
use crate::game::feedback::Feedback;
use crate::game::state::{Address, GamePhase, GameSession, GuessRecord, Role, SessionId};
use crate::proof::artifact::ProofHash;
use crate::proof::commitment::Commitment;

/// Rejected transition.
///
/// Codes are stable; ledger simulation reports them as contract errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(u32)]
pub enum GameError {
    /// No session under this id (or it expired).
    #[error("game not found")]
    GameNotFound = 1,
    /// Caller is not the session's codemaker.
    #[error("caller is not the codemaker")]
    NotCodeMaker = 2,
    /// Caller is not the session's codebreaker.
    #[error("caller is not the codebreaker")]
    NotCodeBreaker = 3,
    /// Transition not allowed in the current phase.
    #[error("transition not allowed in current phase")]
    InvalidPhase = 4,
    /// Guess is not 4 symbols in range.
    #[error("invalid guess value")]
    InvalidGuessValue = 5,
    /// Guess limit already reached.
    #[error("maximum guesses reached")]
    MaxGuessesReached = 6,
    /// Feedback pair out of bounds.
    #[error("invalid feedback")]
    InvalidFeedback = 7,
    /// Session is finished.
    #[error("game already ended")]
    GameAlreadyEnded = 8,
    /// Session id already in use.
    #[error("session already exists")]
    SessionExists = 9,
    /// Commitment already written.
    #[error("commitment already set")]
    AlreadyCommitted = 10,
}

impl GameError {
    /// Numeric contract error code.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Decode a contract error code.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::GameNotFound,
            2 => Self::NotCodeMaker,
            3 => Self::NotCodeBreaker,
            4 => Self::InvalidPhase,
            5 => Self::InvalidGuessValue,
            6 => Self::MaxGuessesReached,
            7 => Self::InvalidFeedback,
            8 => Self::GameAlreadyEnded,
            9 => Self::SessionExists,
            10 => Self::AlreadyCommitted,
            _ => return None,
        })
    }

    /// Errors a lagging read view can produce for a move that is legal on
    /// the committed state.
    pub fn is_state_dependent(self) -> bool {
        matches!(self, Self::GameNotFound | Self::InvalidPhase)
    }
}

impl From<CodeError> for GameError {
    fn from(_: CodeError) -> Self {
        GameError::InvalidGuessValue
    }
}

/// What a successful transition did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Session created.
    Initiated {
        /// Session id.
        session_id: SessionId,
    },
    /// Commitment published.
    CodeCommitted {
        /// Session id.
        session_id: SessionId,
        /// Published commitment.
        commitment: Commitment,
    },
    /// Guess recorded as pending.
    GuessSubmitted {
        /// Session id.
        session_id: SessionId,
        /// Zero-based ordinal this guess will occupy.
        ordinal: u32,
        /// The guess.
        guess: Guess,
    },
    /// Feedback appended for the pending guess.
    FeedbackRecorded {
        /// Session id.
        session_id: SessionId,
        /// Zero-based ordinal of the answered guess.
        ordinal: u32,
        /// Disclosed feedback.
        feedback: Feedback,
        /// Winner role if this feedback ended the session.
        finished: Option<Role>,
    },
}

impl GameSession {
    fn ensure_live(&self) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::GameAlreadyEnded);
        }
        Ok(())
    }

    fn ensure_phase(&self, phase: GamePhase) -> Result<(), GameError> {
        if self.phase != phase {
            return Err(GameError::InvalidPhase);
        }
        Ok(())
    }

    fn ensure_codemaker(&self, actor: &Address) -> Result<(), GameError> {
        if *actor != self.codemaker {
            return Err(GameError::NotCodeMaker);
        }
        Ok(())
    }

    fn ensure_codebreaker(&self, actor: &Address) -> Result<(), GameError> {
        if *actor != self.codebreaker {
            return Err(GameError::NotCodeBreaker);
        }
        Ok(())
    }

    /// `lobby -> waiting_for_commitment`.
    pub fn initiate(&mut self) -> Result<GameEvent, GameError> {
        self.ensure_live()?;
        self.ensure_phase(GamePhase::Lobby)?;

        self.phase = GamePhase::WaitingForCommitment;
        Ok(GameEvent::Initiated { session_id: self.session_id })
    }

    /// `waiting_for_commitment -> waiting_for_guess`, codemaker only.
    pub fn commit_code(&mut self, actor: &Address, commitment: Commitment) -> Result<GameEvent, GameError> {
        self.ensure_live()?;
        self.ensure_phase(GamePhase::WaitingForCommitment)?;
        self.ensure_codemaker(actor)?;
        if self.commitment.is_some() {
            return Err(GameError::AlreadyCommitted);
        }

        self.commitment = Some(commitment);
        self.phase = GamePhase::WaitingForGuess;
        Ok(GameEvent::CodeCommitted { session_id: self.session_id, commitment })
    }

    fn ensure_can_guess(&self, actor: &Address) -> Result<(), GameError> {
        self.ensure_live()?;
        self.ensure_phase(GamePhase::WaitingForGuess)?;
        self.ensure_codebreaker(actor)?;
        if self.guess_count() >= self.max_guesses {
            return Err(GameError::MaxGuessesReached);
        }
        Ok(())
    }

    /// `waiting_for_guess -> waiting_for_feedback`, codebreaker only.
    pub fn submit_guess(&mut self, actor: &Address, guess: Guess) -> Result<GameEvent, GameError> {
        self.ensure_can_guess(actor)?;

        self.pending_guess = Some(guess);
        self.phase = GamePhase::WaitingForFeedback;
        Ok(GameEvent::GuessSubmitted {
            session_id: self.session_id,
            ordinal: self.guess_count(),
            guess,
        })
    }

    /// [`submit_guess`](Self::submit_guess) from raw ledger integers.
    ///
    /// Phase and actor guards are reported before value validation.
    pub fn submit_guess_values(&mut self, actor: &Address, values: &[u32]) -> Result<GameEvent, GameError> {
        self.ensure_can_guess(actor)?;
        let guess = Guess::from_values(values)?;
        self.submit_guess(actor, guess)
    }

    /// `waiting_for_feedback -> waiting_for_guess | finished`, codemaker only.
    ///
    /// Consumes the pending guess into a new record. The session finishes on
    /// a solved feedback (codebreaker wins) or on reaching `max_guesses`
    /// (codemaker wins).
    pub fn submit_feedback(
        &mut self,
        actor: &Address,
        exact_matches: u32,
        color_matches: u32,
        proof_hash: ProofHash,
    ) -> Result<GameEvent, GameError> {
        self.ensure_live()?;
        self.ensure_phase(GamePhase::WaitingForFeedback)?;
        self.ensure_codemaker(actor)?;
        let feedback = Feedback::new(exact_matches, color_matches).ok_or(GameError::InvalidFeedback)?;
        let guess = self.pending_guess.ok_or(GameError::InvalidPhase)?;

        self.pending_guess = None;
        self.records.push(GuessRecord { guess, feedback, proof_hash });
        let ordinal = self.guess_count() - 1;

        let finished = if feedback.is_solved() {
            self.winner = Some(self.codebreaker.clone());
            Some(Role::CodeBreaker)
        } else if self.guess_count() >= self.max_guesses {
            self.winner = Some(self.codemaker.clone());
            Some(Role::CodeMaker)
        } else {
            None
        };

        self.phase = if finished.is_some() { GamePhase::Finished } else { GamePhase::WaitingForGuess };

        Ok(GameEvent::FeedbackRecorded {
            session_id: self.session_id,
            ordinal,
            feedback,
            finished,
        })
    }

    /// Outcome for result reporting: `true` if the codemaker won.
    pub fn codemaker_won(&self) -> Result<bool, GameError> {
        match (self.phase, self.winner_role()) {
            (GamePhase::Finished, Some(role)) => Ok(role == Role::CodeMaker),
            _ => Err(GameError::InvalidPhase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::code::Code;
    use crate::game::state::MAX_GUESSES;

    fn maker() -> Address {
        Address::new("GMAKER")
    }

    fn breaker() -> Address {
        Address::new("GBREAKER")
    }

    fn guess() -> Guess {
        Code::new([0, 1, 2, 3]).unwrap()
    }

    fn hash() -> ProofHash {
        ProofHash::of_proof(b"proof")
    }

    fn committed() -> GameSession {
        let mut s = GameSession::lobby(1, maker(), breaker(), MAX_GUESSES);
        s.initiate().unwrap();
        s.commit_code(&maker(), Commitment([0xAB; 32])).unwrap();
        s
    }

    #[test]
    fn test_codebreaker_wins_in_one() {
        let mut s = committed();
        s.submit_guess(&breaker(), guess()).unwrap();
        assert_eq!(s.phase, GamePhase::WaitingForFeedback);

        let event = s.submit_feedback(&maker(), 4, 0, hash()).unwrap();
        assert_eq!(
            event,
            GameEvent::FeedbackRecorded {
                session_id: 1,
                ordinal: 0,
                feedback: Feedback::SOLVED,
                finished: Some(Role::CodeBreaker),
            }
        );
        assert_eq!(s.phase, GamePhase::Finished);
        assert_eq!(s.winner, Some(breaker()));
        assert_eq!(s.guess_count(), 1);
        assert_eq!(s.pending_guess, None);
    }

    #[test]
    fn test_codemaker_wins_after_max_guesses() {
        let mut s = committed();
        for i in 0..MAX_GUESSES {
            s.submit_guess(&breaker(), guess()).unwrap();
            s.submit_feedback(&maker(), 1, 1, hash()).unwrap();
            if i + 1 < MAX_GUESSES {
                assert_eq!(s.phase, GamePhase::WaitingForGuess);
            }
        }
        assert_eq!(s.phase, GamePhase::Finished);
        assert_eq!(s.winner, Some(maker()));
        assert_eq!(s.guess_count(), MAX_GUESSES);
        assert_eq!(s.derive_winner(), Some(Role::CodeMaker));
    }

    #[test]
    fn test_partial_match_continues() {
        let mut s = committed();
        s.submit_guess(&breaker(), guess()).unwrap();
        s.submit_feedback(&maker(), 2, 1, hash()).unwrap();
        assert_eq!(s.phase, GamePhase::WaitingForGuess);
        assert_eq!(s.winner, None);
        assert_eq!(s.records[0].feedback, Feedback::new(2, 1).unwrap());
    }

    #[test]
    fn test_wrong_phase_rejected_unchanged() {
        let mut s = GameSession::lobby(1, maker(), breaker(), MAX_GUESSES);
        s.initiate().unwrap();
        let before = s.clone();

        assert_eq!(s.submit_guess(&breaker(), guess()), Err(GameError::InvalidPhase));
        assert_eq!(s.submit_feedback(&maker(), 0, 0, hash()), Err(GameError::InvalidPhase));
        assert_eq!(s.initiate(), Err(GameError::InvalidPhase));
        assert_eq!(s, before);
    }

    #[test]
    fn test_wrong_actor_rejected_unchanged() {
        let mut s = GameSession::lobby(1, maker(), breaker(), MAX_GUESSES);
        s.initiate().unwrap();
        let before = s.clone();
        assert_eq!(s.commit_code(&breaker(), Commitment([1; 32])), Err(GameError::NotCodeMaker));
        assert_eq!(s, before);

        let mut s = committed();
        let before = s.clone();
        assert_eq!(s.submit_guess(&maker(), guess()), Err(GameError::NotCodeBreaker));
        assert_eq!(s, before);

        s.submit_guess(&breaker(), guess()).unwrap();
        let before = s.clone();
        assert_eq!(s.submit_feedback(&breaker(), 0, 0, hash()), Err(GameError::NotCodeMaker));
        assert_eq!(s.submit_feedback(&Address::new("GSTRANGER"), 0, 0, hash()), Err(GameError::NotCodeMaker));
        assert_eq!(s, before);
    }

    #[test]
    fn test_no_recommitment() {
        let mut s = committed();
        let before = s.clone();
        // Phase guard fires first once the commitment moved the session on.
        assert_eq!(s.commit_code(&maker(), Commitment([2; 32])), Err(GameError::InvalidPhase));
        assert_eq!(s, before);

        // Even if the phase were rewound, the commitment stays immutable.
        let mut rewound = committed();
        rewound.phase = GamePhase::WaitingForCommitment;
        assert_eq!(
            rewound.commit_code(&maker(), Commitment([2; 32])),
            Err(GameError::AlreadyCommitted)
        );
        assert_eq!(rewound.commitment, Some(Commitment([0xAB; 32])));
    }

    #[test]
    fn test_invalid_feedback_sum_rejected() {
        let mut s = committed();
        s.submit_guess(&breaker(), guess()).unwrap();
        let before = s.clone();
        assert_eq!(s.submit_feedback(&maker(), 3, 2, hash()), Err(GameError::InvalidFeedback));
        assert_eq!(s.submit_feedback(&maker(), 5, 0, hash()), Err(GameError::InvalidFeedback));
        assert_eq!(s, before);
    }

    #[test]
    fn test_finished_rejects_everything() {
        let mut s = committed();
        s.submit_guess(&breaker(), guess()).unwrap();
        s.submit_feedback(&maker(), 4, 0, hash()).unwrap();
        let before = s.clone();

        assert_eq!(s.submit_guess(&breaker(), guess()), Err(GameError::GameAlreadyEnded));
        assert_eq!(s.submit_feedback(&maker(), 0, 0, hash()), Err(GameError::GameAlreadyEnded));
        assert_eq!(s.commit_code(&maker(), Commitment([3; 32])), Err(GameError::GameAlreadyEnded));
        assert_eq!(s.initiate(), Err(GameError::GameAlreadyEnded));
        assert_eq!(s, before);
    }

    #[test]
    fn test_max_guesses_guard() {
        let mut s = committed();
        s.max_guesses = 1;
        s.submit_guess(&breaker(), guess()).unwrap();
        // Force the session back to guessing with the limit already hit.
        s.records.push(GuessRecord { guess: guess(), feedback: Feedback::new(0, 0).unwrap(), proof_hash: hash() });
        s.pending_guess = None;
        s.phase = GamePhase::WaitingForGuess;
        assert_eq!(s.submit_guess(&breaker(), guess()), Err(GameError::MaxGuessesReached));
    }

    #[test]
    fn test_error_codes_roundtrip() {
        for code in 1..=10 {
            let err = GameError::from_code(code).unwrap();
            assert_eq!(err.code(), code);
        }
        assert_eq!(GameError::from_code(0), None);
        assert_eq!(GameError::from_code(11), None);
    }

    #[test]
    fn test_state_dependent_classification() {
        assert!(GameError::InvalidPhase.is_state_dependent());
        assert!(GameError::GameNotFound.is_state_dependent());
        assert!(!GameError::NotCodeMaker.is_state_dependent());
        assert!(!GameError::InvalidFeedback.is_state_dependent());
    }

    #[test]
    fn test_result_only_after_finish() {
        let mut s = committed();
        assert_eq!(s.codemaker_won(), Err(GameError::InvalidPhase));
        s.submit_guess(&breaker(), guess()).unwrap();
        assert_eq!(s.codemaker_won(), Err(GameError::InvalidPhase));
        s.submit_feedback(&maker(), 4, 0, hash()).unwrap();
        assert_eq!(s.codemaker_won(), Ok(false));

        let mut s = GameSession::lobby(2, maker(), breaker(), 1);
        s.initiate().unwrap();
        s.commit_code(&maker(), Commitment([1; 32])).unwrap();
        s.submit_guess(&breaker(), guess()).unwrap();
        s.submit_feedback(&maker(), 0, 0, hash()).unwrap();
        assert_eq!(s.codemaker_won(), Ok(true));
    }
}
