//! # ZKMind
//!
//! Proof-carrying Mastermind: the CodeMaker commits to a secret, answers
//! every guess with feedback, and proves each answer honest against the
//! commitment without revealing the secret.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           ZKMIND                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── code.rs     - Codes, guesses, the secret                │
//! │  └── hash.rs     - Pinned digest, domain separation          │
//! │                                                              │
//! │  game/           - Rules (pure, synchronous)                 │
//! │  ├── feedback.rs - Exact / color match computation           │
//! │  ├── state.rs    - Session aggregate and phases              │
//! │  ├── transition.rs - Guarded transitions, error codes        │
//! │  └── registry.rs - Sessions by id, TTL                       │
//! │                                                              │
//! │  proof/          - Commitment and feedback proofs            │
//! │  ├── commitment.rs - Commit / open                           │
//! │  ├── inputs.rs   - Circuit inputs and schema                 │
//! │  ├── pipeline.rs - Lazy backend, prepare-and-prove           │
//! │  └── verify.rs   - Checking shared proofs                    │
//! │                                                              │
//! │  ledger/         - Submission (async)                        │
//! │  ├── transactor.rs - Simulate, authorize, send, poll         │
//! │  ├── schema.rs   - Snapshot validation                       │
//! │  └── memory.rs   - In-process ledger host                    │
//! │                                                              │
//! │  agent/          - CodeMaker and CodeBreaker drivers         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Trust Boundary
//!
//! The secret never leaves `agent::codemaker`. The ledger only ever sees
//! the commitment, guesses, feedback pairs and proof hashes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod proof;
pub mod ledger;
pub mod agent;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use core::code::{Code, Guess, Secret};
pub use game::feedback::Feedback;
pub use game::state::{Address, GamePhase, GameSession, SessionId};
pub use game::transition::GameError;
pub use proof::commitment::Commitment;
pub use proof::pipeline::ProofPipeline;
pub use ledger::transactor::LedgerTransactor;
pub use agent::{CodeBreaker, CodeMaker};
pub use config::ClientConfig;
pub use error::{Error, Recovery, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
