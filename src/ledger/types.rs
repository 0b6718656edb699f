//! Ledger Boundary Types
//!
//! Operations, footprints, transactions and simulation results as the
//! transactor sees them. Transactions are identified by the SHA-256 of
//! their canonical bincode encoding.

use std::collections::BTreeSet;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::hash::{hash_with_domain, Digest32, DomainHasher};
use crate::game::state::{Address, SessionId};
use crate::proof::artifact::ProofHash;
use crate::proof::commitment::Commitment;

const TX_DOMAIN: &[u8] = b"ZKMIND_TX_V1";
const AUTH_DOMAIN: &[u8] = b"ZKMIND_AUTH_V1";
const SIGNATURE_DOMAIN: &[u8] = b"ZKMIND_SIG_V1";

/// Ledgers an out-of-band auth entry stays valid for.
pub const AUTH_VALIDITY_LEDGERS: u32 = 100;

// =============================================================================
// OPERATIONS
// =============================================================================

/// The four state-mutating contract entry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create a session. Both parties authorize.
    Initiate {
        /// New session id.
        session_id: SessionId,
        /// Secret holder; transaction source.
        codemaker: Address,
        /// Guessing party; co-signs.
        codebreaker: Address,
    },
    /// Publish the commitment.
    CommitCode {
        /// Target session.
        session_id: SessionId,
        /// Acting codemaker.
        codemaker: Address,
        /// Commitment to the secret.
        commitment: Commitment,
    },
    /// Submit a guess as raw integers.
    SubmitGuess {
        /// Target session.
        session_id: SessionId,
        /// Acting codebreaker.
        codebreaker: Address,
        /// Guess symbols, validated by the contract.
        guess: Vec<u32>,
    },
    /// Disclose feedback for the pending guess.
    SubmitFeedback {
        /// Target session.
        session_id: SessionId,
        /// Acting codemaker.
        codemaker: Address,
        /// Red pegs.
        exact_matches: u32,
        /// White pegs.
        color_matches: u32,
        /// Hash of the feedback proof.
        proof_hash: ProofHash,
    },
}

/// Operation discriminant, for logging and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum OperationKind {
    Initiate,
    CommitCode,
    SubmitGuess,
    SubmitFeedback,
}

impl OperationKind {
    /// Contract function name.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Initiate => "initiate",
            OperationKind::CommitCode => "commit_code",
            OperationKind::SubmitGuess => "submit_guess",
            OperationKind::SubmitFeedback => "submit_feedback",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation {
    /// Discriminant.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Initiate { .. } => OperationKind::Initiate,
            Operation::CommitCode { .. } => OperationKind::CommitCode,
            Operation::SubmitGuess { .. } => OperationKind::SubmitGuess,
            Operation::SubmitFeedback { .. } => OperationKind::SubmitFeedback,
        }
    }

    /// Target session.
    pub fn session_id(&self) -> SessionId {
        match self {
            Operation::Initiate { session_id, .. }
            | Operation::CommitCode { session_id, .. }
            | Operation::SubmitGuess { session_id, .. }
            | Operation::SubmitFeedback { session_id, .. } => *session_id,
        }
    }

    /// Account that submits and pays for the transaction.
    pub fn source(&self) -> &Address {
        match self {
            Operation::Initiate { codemaker, .. }
            | Operation::CommitCode { codemaker, .. }
            | Operation::SubmitFeedback { codemaker, .. } => codemaker,
            Operation::SubmitGuess { codebreaker, .. } => codebreaker,
        }
    }

    /// Accounts whose authorization the contract requires.
    pub fn required_signers(&self) -> Vec<&Address> {
        match self {
            Operation::Initiate { codemaker, codebreaker, .. } => vec![codemaker, codebreaker],
            other => vec![other.source()],
        }
    }

    /// Whether the manual-footprint path may be used.
    ///
    /// Only feedback submission is expected to observe a stale read of the
    /// guess written just before it.
    pub fn allows_manual_footprint(&self) -> bool {
        self.kind() == OperationKind::SubmitFeedback
    }

    /// Digest an auth entry signs over.
    pub fn digest(&self) -> Result<Digest32, bincode::Error> {
        Ok(hash_with_domain(AUTH_DOMAIN, &bincode::serialize(self)?))
    }
}

/// Read-only contract queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Session snapshot.
    GetGame {
        /// Target session.
        session_id: SessionId,
    },
}

// =============================================================================
// FOOTPRINT & RESOURCES
// =============================================================================

/// Storage key touched by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKey {
    /// Contract code.
    ContractCode,
    /// Contract instance storage.
    Instance,
    /// Temporary session entry.
    Game(SessionId),
}

/// Declared read and write sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    /// Keys read but not written.
    pub read_only: BTreeSet<LedgerKey>,
    /// Keys that may be written.
    pub read_write: BTreeSet<LedgerKey>,
}

impl Footprint {
    /// Move `key` into the read-write set.
    pub fn promote(&mut self, key: LedgerKey) {
        self.read_only.remove(&key);
        self.read_write.insert(key);
    }

    /// Whether `key` may be written.
    pub fn is_writable(&self, key: &LedgerKey) -> bool {
        self.read_write.contains(key)
    }
}

/// Resource limits and fee attached to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ResourceBudget {
    pub instructions: u64,
    pub read_bytes: u32,
    pub write_bytes: u32,
    pub resource_fee: u64,
}

impl ResourceBudget {
    /// Conservative fixed budget for the manual-footprint path.
    pub const FALLBACK: ResourceBudget = ResourceBudget {
        instructions: 50_000_000,
        read_bytes: 40_000,
        write_bytes: 20_000,
        resource_fee: 10_000_000,
    };
}

// =============================================================================
// AUTHORIZATION & SIGNATURES
// =============================================================================

/// Opaque signature.
///
/// The in-memory host derives signatures as a keyed digest of signer and
/// message; a real wallet substitutes its own scheme.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(pub Digest32);

impl Signature {
    /// Host signature over `message` by `signer`.
    pub fn derive(signer: &Address, message: &Digest32) -> Self {
        let mut hasher = DomainHasher::new(SIGNATURE_DOMAIN);
        hasher.update_bytes(signer.as_str().as_bytes());
        hasher.update_bytes(message);
        Self(hasher.finalize())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..4]))
    }
}

/// Contract authorization from one required signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEntry {
    /// Authorizing account.
    pub signer: Address,
    /// Digest of the authorized operation.
    pub operation_digest: Digest32,
    /// Replay protection.
    pub nonce: u64,
    /// Last ledger the entry is valid in.
    pub expiration_ledger: u32,
    /// `None` until signed.
    pub signature: Option<Signature>,
}

impl AuthEntry {
    /// Unsigned entry for `signer` over `operation`.
    pub fn new(
        signer: Address,
        operation: &Operation,
        nonce: u64,
        expiration_ledger: u32,
    ) -> Result<Self, bincode::Error> {
        Ok(Self {
            signer,
            operation_digest: operation.digest()?,
            nonce,
            expiration_ledger,
            signature: None,
        })
    }

    /// Message the signer signs.
    pub fn payload(&self) -> Digest32 {
        let mut hasher = DomainHasher::new(AUTH_DOMAIN);
        hasher.update_bytes(&self.operation_digest);
        hasher.update_u64(self.nonce);
        hasher.update_u32(self.expiration_ledger);
        hasher.finalize()
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub Digest32);

impl fmt::Debug for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionHash({})", hex::encode(self.0))
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Transaction before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Paying account.
    pub source: Address,
    /// Source account sequence number for this transaction.
    pub sequence: u64,
    /// Contract call.
    pub operation: Operation,
    /// Set after simulation or by the manual-footprint path.
    pub footprint: Option<Footprint>,
    /// Resource limits and fee.
    pub budget: Option<ResourceBudget>,
    /// Signed contract authorizations.
    pub auth: Vec<AuthEntry>,
}

impl UnsignedTransaction {
    /// Bare transaction for `operation` at `sequence`.
    pub fn new(operation: Operation, sequence: u64) -> Self {
        Self {
            source: operation.source().clone(),
            sequence,
            operation,
            footprint: None,
            budget: None,
            auth: Vec::new(),
        }
    }

    /// Canonical encoding.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Transaction id.
    pub fn hash(&self) -> Result<TransactionHash, bincode::Error> {
        Ok(TransactionHash(hash_with_domain(TX_DOMAIN, &self.canonical_bytes()?)))
    }
}

/// Transaction signed by its source account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Signed body.
    pub transaction: UnsignedTransaction,
    /// Source account signature over the transaction hash.
    pub signature: Signature,
}

impl SignedTransaction {
    /// Transaction id.
    pub fn hash(&self) -> Result<TransactionHash, bincode::Error> {
        self.transaction.hash()
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Dry-run result for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// Would succeed with these resources and auth requirements.
    Success {
        /// Keys the call touches.
        footprint: Footprint,
        /// Estimated resources.
        budget: ResourceBudget,
        /// Unsigned auth entries to fill in.
        auth: Vec<AuthEntry>,
    },
    /// Contract guard rejected the call.
    ContractError {
        /// Contract error code.
        code: u32,
    },
    /// Host-level failure unrelated to contract guards.
    HostError {
        /// Host message.
        message: String,
    },
}

/// Dry-run result for a read-only query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Authoritative keys and the returned value.
    Success {
        /// Keys the query read.
        footprint: Footprint,
        /// Returned value.
        value: serde_json::Value,
    },
    /// Contract guard rejected the call.
    ContractError {
        /// Contract error code.
        code: u32,
    },
    /// Host-level failure.
    HostError {
        /// Host message.
        message: String,
    },
}

/// Status of a sent transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Not yet visible.
    NotFound,
    /// Applied in `ledger`.
    Success {
        /// Ledger the transaction closed in.
        ledger: u32,
    },
    /// Terminal failure; no state change.
    Failed {
        /// Host-reported reason.
        reason: String,
    },
}
