//! Game Session State
//!
//! The aggregate root for one Mastermind session as stored on the ledger.
//! Everything here is public except the secret, which never appears.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::code::Guess;
use crate::game::feedback::Feedback;
use crate::proof::artifact::ProofHash;
use crate::proof::commitment::Commitment;

/// Maximum guesses per session.
pub const MAX_GUESSES: u32 = 12;

/// Caller-chosen session identifier.
pub type SessionId = u32;

// =============================================================================
// IDENTITY
// =============================================================================

/// Ledger account identity of a party.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an account string.
    pub fn new(account: impl Into<String>) -> Self {
        Self(account.into())
    }

    /// Account string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a party plays in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Holds the secret, discloses feedback.
    CodeMaker,
    /// Submits guesses.
    CodeBreaker,
}

// =============================================================================
// PHASE
// =============================================================================

/// Session lifecycle phase.
///
/// ```text
/// lobby -> waiting_for_commitment -> waiting_for_guess <-> waiting_for_feedback
///                                                       \-> finished
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum GamePhase {
    /// Drafted locally, not yet initiated.
    Lobby = 0,
    /// Waiting for the CodeMaker's commitment.
    WaitingForCommitment = 1,
    /// Waiting for the CodeBreaker's next guess.
    WaitingForGuess = 2,
    /// A guess is pending; waiting for the CodeMaker's feedback.
    WaitingForFeedback = 3,
    /// Terminal. No further mutation.
    Finished = 4,
}

impl GamePhase {
    /// Which role may act in this phase.
    pub fn actor(self) -> Option<Role> {
        match self {
            GamePhase::WaitingForCommitment | GamePhase::WaitingForFeedback => Some(Role::CodeMaker),
            GamePhase::WaitingForGuess => Some(Role::CodeBreaker),
            GamePhase::Lobby | GamePhase::Finished => None,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One answered guess. Index in `GameSession::records` is the guess ordinal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessRecord {
    /// The guess.
    pub guess: Guess,
    /// Feedback disclosed by the CodeMaker.
    pub feedback: Feedback,
    /// Hash of the proof attesting the feedback.
    pub proof_hash: ProofHash,
}

/// Full session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSession {
    /// Session identifier.
    pub session_id: SessionId,
    /// Party holding the secret.
    pub codemaker: Address,
    /// Party guessing.
    pub codebreaker: Address,
    /// Current phase.
    pub phase: GamePhase,
    /// Commitment, written exactly once.
    pub commitment: Option<Commitment>,
    /// Answered guesses, append-only.
    pub records: Vec<GuessRecord>,
    /// Guess awaiting feedback. `Some` iff phase is `WaitingForFeedback`.
    pub pending_guess: Option<Guess>,
    /// Guess limit.
    pub max_guesses: u32,
    /// Set on entering `Finished`.
    pub winner: Option<Address>,
}

impl GameSession {
    /// Draft a session in the lobby.
    pub fn lobby(session_id: SessionId, codemaker: Address, codebreaker: Address, max_guesses: u32) -> Self {
        Self {
            session_id,
            codemaker,
            codebreaker,
            phase: GamePhase::Lobby,
            commitment: None,
            records: Vec::new(),
            pending_guess: None,
            max_guesses,
            winner: None,
        }
    }

    /// Number of answered guesses.
    #[inline]
    pub fn guess_count(&self) -> u32 {
        self.records.len() as u32
    }

    /// Whether the session is terminal.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Finished
    }

    /// Role of an address in this session, if any.
    pub fn role_of(&self, address: &Address) -> Option<Role> {
        if *address == self.codemaker {
            Some(Role::CodeMaker)
        } else if *address == self.codebreaker {
            Some(Role::CodeBreaker)
        } else {
            None
        }
    }

    /// Address playing `role`.
    pub fn party(&self, role: Role) -> &Address {
        match role {
            Role::CodeMaker => &self.codemaker,
            Role::CodeBreaker => &self.codebreaker,
        }
    }

    /// Role of the winner, once finished.
    ///
    /// One address may hold both roles; the records then decide which one won.
    pub fn winner_role(&self) -> Option<Role> {
        let winner = self.winner.as_ref()?;
        match self.derive_winner() {
            Some(role) if self.party(role) == winner => Some(role),
            _ => self.role_of(winner),
        }
    }

    /// Winner as derived from the records, independent of the stored field.
    pub fn derive_winner(&self) -> Option<Role> {
        if self.records.iter().any(|r| r.feedback.is_solved()) {
            Some(Role::CodeBreaker)
        } else if self.guess_count() >= self.max_guesses {
            Some(Role::CodeMaker)
        } else {
            None
        }
    }

    /// Most recent answered guess.
    pub fn last_record(&self) -> Option<&GuessRecord> {
        self.records.last()
    }
}
