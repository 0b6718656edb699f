//! Session Snapshot Schema
//!
//! The `get_game` return value, decoded against a fixed schema. Every field
//! is required, unknown fields are rejected, and the decoded session must be
//! internally consistent before it is handed to game logic. Nothing is
//! defaulted.
//!
//! Wire shape (JSON):
//!
//! ```text
//! { session_id, codemaker, codebreaker, phase, commitment: hex | null,
//!   guesses: [[u32; 4]], feedbacks: [{ exact_matches, color_matches, proof_hash: hex }],
//!   guess_count, max_guesses, winner: address | null, current_guess: [u32] }
//! ```

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::code::Code;
use crate::game::feedback::Feedback;
use crate::game::state::{Address, GamePhase, GameSession, GuessRecord, SessionId};
use crate::proof::artifact::ProofHash;
use crate::proof::commitment::Commitment;

/// Snapshot decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Missing, extra or mistyped field.
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    /// A field's value is out of its domain.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What is wrong.
        reason: String,
    },

    /// Fields contradict each other.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

/// One disclosed feedback on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackSnapshot {
    /// Red pegs.
    pub exact_matches: u32,
    /// White pegs.
    pub color_matches: u32,
    /// Tagged proof hash, hex.
    pub proof_hash: String,
}

/// `get_game` wire value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameSnapshot {
    /// Session id.
    pub session_id: SessionId,
    /// Codemaker account.
    pub codemaker: String,
    /// Codebreaker account.
    pub codebreaker: String,
    /// Current phase.
    pub phase: GamePhase,
    /// Commitment hex, null before commitment.
    #[serde(deserialize_with = "Option::deserialize")]
    pub commitment: Option<String>,
    /// Answered guesses.
    pub guesses: Vec<Vec<u32>>,
    /// Feedback per answered guess.
    pub feedbacks: Vec<FeedbackSnapshot>,
    /// Number of answered guesses.
    pub guess_count: u32,
    /// Guess limit.
    pub max_guesses: u32,
    /// Winner account, null until finished.
    #[serde(deserialize_with = "Option::deserialize")]
    pub winner: Option<String>,
    /// Pending guess, empty when none.
    pub current_guess: Vec<u32>,
}

impl GameSnapshot {
    /// Wire form of a session.
    pub fn from_session(session: &GameSession) -> Self {
        Self {
            session_id: session.session_id,
            codemaker: session.codemaker.as_str().to_string(),
            codebreaker: session.codebreaker.as_str().to_string(),
            phase: session.phase,
            commitment: session.commitment.map(|c| hex::encode(c.as_bytes())),
            guesses: session.records.iter().map(|r| r.guess.to_values().to_vec()).collect(),
            feedbacks: session
                .records
                .iter()
                .map(|r| FeedbackSnapshot {
                    exact_matches: r.feedback.exact_matches as u32,
                    color_matches: r.feedback.color_matches as u32,
                    proof_hash: hex::encode(r.proof_hash.to_bytes()),
                })
                .collect(),
            guess_count: session.guess_count(),
            max_guesses: session.max_guesses,
            winner: session.winner.as_ref().map(|w| w.as_str().to_string()),
            current_guess: session.pending_guess.map(|g| g.to_values().to_vec()).unwrap_or_default(),
        }
    }

    /// Encode a session as the JSON wire value.
    pub fn encode(session: &GameSession) -> Result<serde_json::Value, SchemaError> {
        serde_json::to_value(Self::from_session(session)).map_err(|e| SchemaError::Malformed(e.to_string()))
    }

    /// Decode and validate a JSON wire value.
    pub fn decode(value: serde_json::Value) -> Result<GameSession, SchemaError> {
        let snapshot: GameSnapshot =
            serde_json::from_value(value).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        snapshot.into_session()
    }

    /// Validate and convert to a session.
    pub fn into_session(self) -> Result<GameSession, SchemaError> {
        if self.phase == GamePhase::Lobby {
            return Err(SchemaError::Inconsistent("lobby sessions are never stored".into()));
        }
        if self.guesses.len() != self.feedbacks.len() {
            return Err(SchemaError::Inconsistent(format!(
                "{} guesses but {} feedbacks",
                self.guesses.len(),
                self.feedbacks.len()
            )));
        }
        if self.guess_count as usize != self.guesses.len() {
            return Err(SchemaError::Inconsistent(format!(
                "guess_count {} but {} records",
                self.guess_count,
                self.guesses.len()
            )));
        }
        if self.guess_count > self.max_guesses {
            return Err(SchemaError::Inconsistent("guess_count exceeds max_guesses".into()));
        }

        let commitment = match (&self.commitment, self.phase) {
            (None, GamePhase::WaitingForCommitment) => None,
            (Some(_), GamePhase::WaitingForCommitment) | (None, _) => {
                return Err(SchemaError::Inconsistent(format!(
                    "commitment presence does not match phase {:?}",
                    self.phase
                )));
            }
            (Some(hex_str), _) => Some(decode_commitment(hex_str)?),
        };

        let waiting = self.phase == GamePhase::WaitingForFeedback;
        let pending_guess = match (waiting, self.current_guess.is_empty()) {
            (true, false) => Some(decode_guess("current_guess", &self.current_guess)?),
            (false, true) => None,
            (true, true) => {
                return Err(SchemaError::Inconsistent("waiting for feedback without a pending guess".into()));
            }
            (false, false) => {
                return Err(SchemaError::Inconsistent("pending guess outside waiting_for_feedback".into()));
            }
        };

        let mut records = Vec::with_capacity(self.guesses.len());
        for (values, fb) in self.guesses.iter().zip(&self.feedbacks) {
            let guess = decode_guess("guesses", values)?;
            let feedback = Feedback::new(fb.exact_matches, fb.color_matches).ok_or_else(|| {
                SchemaError::InvalidField {
                    field: "feedbacks",
                    reason: format!("{}+{} exceeds code length", fb.exact_matches, fb.color_matches),
                }
            })?;
            let proof_hash = decode_proof_hash(&fb.proof_hash)?;
            records.push(GuessRecord { guess, feedback, proof_hash });
        }

        let codemaker = Address::new(self.codemaker);
        let codebreaker = Address::new(self.codebreaker);
        let winner = self.winner.map(Address::new);

        let session = GameSession {
            session_id: self.session_id,
            codemaker,
            codebreaker,
            phase: self.phase,
            commitment,
            records,
            pending_guess,
            max_guesses: self.max_guesses,
            winner,
        };

        let finished = session.phase == GamePhase::Finished;
        if let Some(w) = &session.winner {
            if session.role_of(w).is_none() {
                return Err(SchemaError::InvalidField { field: "winner", reason: format!("{} is not a party", w) });
            }
        }
        let expected = session.derive_winner().map(|role| session.party(role));
        if finished != session.winner.is_some() || session.winner.as_ref() != expected {
            return Err(SchemaError::Inconsistent("winner does not follow from the records".into()));
        }

        Ok(session)
    }
}

fn decode_commitment(hex_str: &str) -> Result<Commitment, SchemaError> {
    let bytes = hex::decode(hex_str).map_err(|e| SchemaError::InvalidField {
        field: "commitment",
        reason: e.to_string(),
    })?;
    Commitment::from_slice(&bytes).ok_or_else(|| SchemaError::InvalidField {
        field: "commitment",
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}

fn decode_guess(field: &'static str, values: &[u32]) -> Result<Code, SchemaError> {
    Code::from_values(values).map_err(|e| SchemaError::InvalidField { field, reason: e.to_string() })
}

fn decode_proof_hash(hex_str: &str) -> Result<ProofHash, SchemaError> {
    let bytes = hex::decode(hex_str).map_err(|e| SchemaError::InvalidField {
        field: "proof_hash",
        reason: e.to_string(),
    })?;
    ProofHash::from_bytes(&bytes).map_err(|e| SchemaError::InvalidField {
        field: "proof_hash",
        reason: e.to_string(),
    })
}
