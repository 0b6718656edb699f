//! Session Drivers
//!
//! One driver per role. Each wraps a wallet, a transactor and a proof
//! pipeline, and checks every move against a fresh snapshot before it is
//! submitted.
//!
//! ```text
//! CodeMaker                          CodeBreaker
//!   initiate ──────────┐
//!   commit ────────────┤
//!                      ├── ledger ──┤ guess
//!   respond (prove) ───┤            │ sync (prune candidates)
//!                      │            └ verify_feedback (shared proof)
//! ```

pub mod codemaker;
pub mod codebreaker;

pub use codemaker::{CodeMaker, FeedbackResponse};
pub use codebreaker::{CandidateSet, CodeBreaker};
