//! Ledger Module
//!
//! Everything that talks to the shared ledger. Game rules are not decided
//! here; the ledger's contract enforces them and this module survives its
//! latency and lag.
//!
//! ## Module Structure
//!
//! - `types`: Operations, footprints, transactions, simulation results
//! - `client`: `LedgerClient` and `Wallet` traits
//! - `schema`: Fixed-schema `get_game` snapshot decode
//! - `transactor`: Simulate, retry, manual-footprint fallback, finality
//! - `memory`: Deterministic in-memory host with a lagging view
//! - `hub`: Optional finished-session result reporting

pub mod types;
pub mod client;
pub mod schema;
pub mod transactor;
pub mod memory;
pub mod hub;

// Re-export key types
pub use types::{
    AuthEntry, Footprint, LedgerKey, Operation, OperationKind, Query, QueryOutcome, ResourceBudget,
    Signature, SignedTransaction, SimulationOutcome, TransactionHash, TransactionStatus,
    UnsignedTransaction,
};
pub use client::{LedgerClient, TransportError, Wallet, WalletError};
pub use schema::{GameSnapshot, SchemaError};
pub use transactor::{LedgerError, LedgerTransactor, SubmitOutcome, SubmitRoute};
pub use memory::{InMemoryLedger, LedgerFaults, LocalWallet};
pub use hub::{GameHub, HubError, RecordingHub};
