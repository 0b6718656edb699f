//! Ledger and Wallet Traits
//!
//! The transactor talks to the ledger only through [`LedgerClient`] and to
//! signing keys only through [`Wallet`]. Both are async; every call is a
//! suspension point.

use async_trait::async_trait;
use thiserror::Error;

use crate::game::state::Address;
use crate::ledger::types::{
    AuthEntry, Query, QueryOutcome, SignedTransaction, SimulationOutcome, TransactionHash,
    TransactionStatus, UnsignedTransaction,
};

/// Transport layer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Ledger endpoint unreachable.
    #[error("network error: {0}")]
    Network(String),

    /// Ledger refused the transaction before applying it.
    #[error("transaction rejected at submission: {0}")]
    Rejected(String),

    /// Encoding failed on either side.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<bincode::Error> for TransportError {
    fn from(e: bincode::Error) -> Self {
        TransportError::Encoding(e.to_string())
    }
}

/// Wallet errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// User refused to sign.
    #[error("user declined to sign")]
    UserDeclined,

    /// No wallet available.
    #[error("wallet not installed")]
    NotInstalled,

    /// Wallet cannot sign for this account.
    #[error("wallet holds {held}, cannot sign for {requested}")]
    WrongAccount {
        /// Account the wallet holds.
        held: Address,
        /// Account asked for.
        requested: Address,
    },

    /// Transaction could not be encoded for signing.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Ledger RPC surface used by the transactor.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current sequence number of `account`.
    async fn account_sequence(&self, account: &Address) -> Result<u64, TransportError>;

    /// Latest closed ledger.
    async fn latest_ledger(&self) -> Result<u32, TransportError>;

    /// Dry-run a transaction.
    async fn simulate(&self, tx: &UnsignedTransaction) -> Result<SimulationOutcome, TransportError>;

    /// Dry-run a read-only query.
    async fn simulate_query(&self, query: &Query) -> Result<QueryOutcome, TransportError>;

    /// Submit a signed transaction.
    async fn send(&self, tx: &SignedTransaction) -> Result<TransactionHash, TransportError>;

    /// Status of a submitted transaction.
    async fn transaction_status(&self, hash: &TransactionHash) -> Result<TransactionStatus, TransportError>;
}

/// Signing keys for one account.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Account this wallet signs for.
    fn address(&self) -> &Address;

    /// Sign a transaction whose source is this account.
    async fn sign(&self, tx: UnsignedTransaction) -> Result<SignedTransaction, WalletError>;

    /// Sign a contract authorization entry.
    async fn sign_auth_entry(&self, entry: AuthEntry) -> Result<AuthEntry, WalletError>;
}
