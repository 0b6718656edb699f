//! Crate Error
//!
//! One error type for callers driving a session end to end. Every failure
//! answers one question: did anything reach the ledger?

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::code::CodeError;
use crate::game::transition::GameError;
use crate::ledger::hub::HubError;
use crate::ledger::schema::SchemaError;
use crate::ledger::transactor::LedgerError;
use crate::proof::pipeline::ProofError;
use crate::proof::verify::VerificationError;

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Nothing reached the ledger. Retry freely.
    RetryFreely,
    /// A transaction was sent. Re-fetch the session before retrying.
    RefetchBeforeRetry,
}

/// Top-level error.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Move rejected locally before any ledger call.
    #[error("protocol violation: {0}")]
    Protocol(#[from] GameError),

    /// Malformed code.
    #[error(transparent)]
    Code(#[from] CodeError),

    /// Proof generation failed.
    #[error(transparent)]
    Proof(#[from] ProofError),

    /// A received proof did not check out.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Ledger submission or read failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Snapshot failed schema validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Result report was refused by the game hub.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// No code is consistent with the feedback recorded so far.
    #[error("recorded feedback is contradictory: no code fits every answer")]
    ContradictoryFeedback,
}

impl Error {
    /// Whether ledger state may have changed.
    pub fn recovery(&self) -> Recovery {
        match self {
            Error::Ledger(e) => e.recovery(),
            _ => Recovery::RetryFreely,
        }
    }

    /// Contract-level rejection, whether caught locally or by simulation.
    pub fn game_error(&self) -> Option<GameError> {
        match self {
            Error::Protocol(e) => Some(*e),
            Error::Ledger(e) => e.game_error(),
            _ => None,
        }
    }
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;
