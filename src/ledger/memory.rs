//! In-Memory Ledger Host
//!
//! A deterministic stand-in for the ledger, backed by a [`GameRegistry`].
//! It reproduces the behaviours the transactor has to survive:
//! - simulations served from a view one write behind the committed state
//! - transactions that stay "not found" for a few polls
//! - terminal failures after submission
//!
//! Committed writes are checked the way the contract host checks them:
//! source signature, sequence number, declared footprint, and one valid
//! auth entry per required signer.

use std::collections::{HashMap, HashSet};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::game::registry::GameRegistry;
use crate::game::state::Address;
use crate::game::transition::{GameError, GameEvent};
use crate::ledger::client::{LedgerClient, TransportError, Wallet, WalletError};
use crate::ledger::schema::GameSnapshot;
use crate::ledger::types::{
    AuthEntry, Footprint, LedgerKey, Operation, Query, QueryOutcome, ResourceBudget, Signature,
    SignedTransaction, SimulationOutcome, TransactionHash, TransactionStatus, UnsignedTransaction,
    AUTH_VALIDITY_LEDGERS,
};

/// Resource estimate returned by successful simulations.
const SIMULATED_BUDGET: ResourceBudget = ResourceBudget {
    instructions: 4_000_000,
    read_bytes: 4_000,
    write_bytes: 2_000,
    resource_fee: 120_000,
};

/// Injected misbehaviour.
#[derive(Debug, Clone, Default)]
pub struct LedgerFaults {
    /// Upcoming write simulations served from the lagged view.
    pub stale_simulations: u32,
    /// Polls each sent transaction reports "not found" before its status.
    pub pending_polls: u32,
    /// Fail the next sent transaction at apply time with this reason.
    pub fail_next_apply: Option<String>,
}

struct TxEntry {
    status: TransactionStatus,
    hidden_polls: u32,
}

struct HostState {
    registry: GameRegistry,
    lagged: GameRegistry,
    ledger: u32,
    sequences: HashMap<Address, u64>,
    transactions: HashMap<TransactionHash, TxEntry>,
    used_nonces: HashSet<(Address, u64)>,
    next_nonce: u64,
    faults: LedgerFaults,
}

/// In-memory ledger with a lagging simulation view.
pub struct InMemoryLedger {
    state: Mutex<HostState>,
}

impl InMemoryLedger {
    /// Empty ledger with reference limits.
    pub fn new() -> Self {
        Self::with_registry(GameRegistry::new())
    }

    /// Ledger over an existing registry.
    pub fn with_registry(registry: GameRegistry) -> Self {
        Self {
            state: Mutex::new(HostState {
                lagged: registry.clone(),
                registry,
                ledger: 1,
                sequences: HashMap::new(),
                transactions: HashMap::new(),
                used_nonces: HashSet::new(),
                next_nonce: 1,
                faults: LedgerFaults::default(),
            }),
        }
    }

    /// Replace the injected faults.
    pub async fn set_faults(&self, faults: LedgerFaults) {
        self.state.lock().await.faults = faults;
    }

    /// Close `count` empty ledgers.
    pub async fn advance_ledgers(&self, count: u32) {
        self.state.lock().await.ledger += count;
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_operation(registry: &mut GameRegistry, op: &Operation, ledger: u32) -> Result<GameEvent, GameError> {
    match op {
        Operation::Initiate { session_id, codemaker, codebreaker } => {
            registry.initiate(*session_id, codemaker.clone(), codebreaker.clone(), ledger)
        }
        Operation::CommitCode { session_id, codemaker, commitment } => {
            registry.commit_code(*session_id, codemaker, *commitment, ledger)
        }
        Operation::SubmitGuess { session_id, codebreaker, guess } => {
            registry.submit_guess(*session_id, codebreaker, guess, ledger)
        }
        Operation::SubmitFeedback { session_id, codemaker, exact_matches, color_matches, proof_hash } => {
            registry.submit_feedback(*session_id, codemaker, *exact_matches, *color_matches, *proof_hash, ledger)
        }
    }
}

impl HostState {
    fn check_auth(&mut self, tx: &UnsignedTransaction) -> Result<(), String> {
        let digest = tx.operation.digest().map_err(|e| e.to_string())?;
        for signer in tx.operation.required_signers() {
            let entry = tx
                .auth
                .iter()
                .find(|e| &e.signer == signer)
                .ok_or_else(|| format!("missing authorization for {}", signer))?;
            let valid = entry.operation_digest == digest
                && entry.expiration_ledger >= self.ledger
                && entry.signature == Some(Signature::derive(signer, &entry.payload()))
                && !self.used_nonces.contains(&(signer.clone(), entry.nonce));
            if !valid {
                return Err(format!("invalid authorization for {}", signer));
            }
        }
        for entry in &tx.auth {
            self.used_nonces.insert((entry.signer.clone(), entry.nonce));
        }
        Ok(())
    }

    fn apply(&mut self, tx: &UnsignedTransaction) -> TransactionStatus {
        if let Some(reason) = self.faults.fail_next_apply.take() {
            return TransactionStatus::Failed { reason };
        }

        let key = LedgerKey::Game(tx.operation.session_id());
        let covered = tx.footprint.as_ref().map(|f| f.is_writable(&key)).unwrap_or(false);
        if !covered || tx.budget.is_none() {
            return TransactionStatus::Failed { reason: "footprint does not cover session entry".into() };
        }
        if let Err(reason) = self.check_auth(tx) {
            return TransactionStatus::Failed { reason };
        }

        let before = self.registry.clone();
        match apply_operation(&mut self.registry, &tx.operation, self.ledger) {
            Ok(event) => {
                debug!(?event, ledger = self.ledger, "applied");
                self.lagged = before;
                TransactionStatus::Success { ledger: self.ledger }
            }
            Err(e) => TransactionStatus::Failed { reason: format!("contract error {}: {}", e.code(), e) },
        }
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn account_sequence(&self, account: &Address) -> Result<u64, TransportError> {
        Ok(self.state.lock().await.sequences.get(account).copied().unwrap_or(0))
    }

    async fn latest_ledger(&self) -> Result<u32, TransportError> {
        Ok(self.state.lock().await.ledger)
    }

    async fn simulate(&self, tx: &UnsignedTransaction) -> Result<SimulationOutcome, TransportError> {
        let mut state = self.state.lock().await;
        let mut view = if state.faults.stale_simulations > 0 {
            state.faults.stale_simulations -= 1;
            state.lagged.clone()
        } else {
            state.registry.clone()
        };

        if let Err(e) = apply_operation(&mut view, &tx.operation, state.ledger) {
            debug!(code = e.code(), "simulation rejected");
            return Ok(SimulationOutcome::ContractError { code: e.code() });
        }

        let mut footprint = Footprint::default();
        footprint.read_only.insert(LedgerKey::ContractCode);
        footprint.read_only.insert(LedgerKey::Instance);
        footprint.read_write.insert(LedgerKey::Game(tx.operation.session_id()));

        let expiration = state.ledger + AUTH_VALIDITY_LEDGERS;
        let mut auth = Vec::new();
        for signer in tx.operation.required_signers() {
            let nonce = state.next_nonce;
            state.next_nonce += 1;
            auth.push(AuthEntry::new(signer.clone(), &tx.operation, nonce, expiration)?);
        }

        Ok(SimulationOutcome::Success { footprint, budget: SIMULATED_BUDGET, auth })
    }

    async fn simulate_query(&self, query: &Query) -> Result<QueryOutcome, TransportError> {
        let state = self.state.lock().await;
        let Query::GetGame { session_id } = query;
        match state.registry.get(*session_id, state.ledger) {
            Ok(session) => {
                let value = GameSnapshot::encode(session).map_err(|e| TransportError::Encoding(e.to_string()))?;
                let mut footprint = Footprint::default();
                footprint.read_only.insert(LedgerKey::ContractCode);
                footprint.read_only.insert(LedgerKey::Instance);
                footprint.read_only.insert(LedgerKey::Game(*session_id));
                Ok(QueryOutcome::Success { footprint, value })
            }
            Err(e) => Ok(QueryOutcome::ContractError { code: e.code() }),
        }
    }

    async fn send(&self, signed: &SignedTransaction) -> Result<TransactionHash, TransportError> {
        let hash = signed.hash()?;
        let tx = &signed.transaction;
        if signed.signature != Signature::derive(&tx.source, &hash.0) {
            return Err(TransportError::Rejected("bad source signature".into()));
        }

        let mut state = self.state.lock().await;
        let current = state.sequences.get(&tx.source).copied().unwrap_or(0);
        if tx.sequence != current + 1 {
            return Err(TransportError::Rejected(format!(
                "bad sequence {}, expected {}",
                tx.sequence,
                current + 1
            )));
        }
        state.sequences.insert(tx.source.clone(), tx.sequence);

        let status = state.apply(tx);
        state.ledger += 1;
        let hidden_polls = state.faults.pending_polls;
        debug!(%hash, ?status, "transaction accepted");
        state.transactions.insert(hash, TxEntry { status, hidden_polls });
        Ok(hash)
    }

    async fn transaction_status(&self, hash: &TransactionHash) -> Result<TransactionStatus, TransportError> {
        let mut state = self.state.lock().await;
        match state.transactions.get_mut(hash) {
            None => Ok(TransactionStatus::NotFound),
            Some(entry) if entry.hidden_polls > 0 => {
                entry.hidden_polls -= 1;
                Ok(TransactionStatus::NotFound)
            }
            Some(entry) => Ok(entry.status.clone()),
        }
    }
}

/// Wallet holding one account's host keys.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    address: Address,
    decline: bool,
}

impl LocalWallet {
    /// Wallet for `account`.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            address: Address::new(account),
            decline: false,
        }
    }

    /// Same wallet, but the user declines every request.
    pub fn declining(mut self) -> Self {
        self.decline = true;
        self
    }

    fn ensure_signs_for(&self, account: &Address) -> Result<(), WalletError> {
        if self.decline {
            return Err(WalletError::UserDeclined);
        }
        if *account != self.address {
            return Err(WalletError::WrongAccount {
                held: self.address.clone(),
                requested: account.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn sign(&self, tx: UnsignedTransaction) -> Result<SignedTransaction, WalletError> {
        self.ensure_signs_for(&tx.source)?;
        let hash = tx.hash().map_err(|e| WalletError::Encoding(e.to_string()))?;
        Ok(SignedTransaction {
            signature: Signature::derive(&self.address, &hash.0),
            transaction: tx,
        })
    }

    async fn sign_auth_entry(&self, mut entry: AuthEntry) -> Result<AuthEntry, WalletError> {
        self.ensure_signs_for(&entry.signer)?;
        entry.signature = Some(Signature::derive(&self.address, &entry.payload()));
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::commitment::Commitment;

    fn initiate() -> Operation {
        Operation::Initiate {
            session_id: 9,
            codemaker: Address::new("GMAKER"),
            codebreaker: Address::new("GBREAKER"),
        }
    }

    async fn signed(ledger: &InMemoryLedger, wallets: &[&LocalWallet], op: Operation) -> SignedTransaction {
        let source = op.source().clone();
        let mut tx = UnsignedTransaction::new(op, ledger.account_sequence(&source).await.unwrap() + 1);
        match ledger.simulate(&tx).await.unwrap() {
            SimulationOutcome::Success { footprint, budget, auth } => {
                tx.footprint = Some(footprint);
                tx.budget = Some(budget);
                let mut signed_auth = Vec::new();
                for entry in auth {
                    let wallet = wallets.iter().find(|w| *w.address() == entry.signer).unwrap();
                    signed_auth.push(wallet.sign_auth_entry(entry).await.unwrap());
                }
                tx.auth = signed_auth;
            }
            other => panic!("unexpected simulation {:?}", other),
        }
        let wallet = wallets.iter().find(|w| *w.address() == source).unwrap();
        wallet.sign(tx).await.unwrap()
    }

    #[tokio::test]
    async fn test_apply_and_query() {
        let ledger = InMemoryLedger::new();
        let maker = LocalWallet::new("GMAKER");
        let breaker = LocalWallet::new("GBREAKER");

        let tx = signed(&ledger, &[&maker, &breaker], initiate()).await;
        let hash = ledger.send(&tx).await.unwrap();
        assert_eq!(ledger.transaction_status(&hash).await.unwrap(), TransactionStatus::Success { ledger: 1 });
        assert_eq!(ledger.latest_ledger().await.unwrap(), 2);

        match ledger.simulate_query(&Query::GetGame { session_id: 9 }).await.unwrap() {
            QueryOutcome::Success { value, footprint } => {
                assert_eq!(value["phase"], "waiting_for_commitment");
                assert!(footprint.read_only.contains(&LedgerKey::Game(9)));
            }
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_cosigner_auth_fails() {
        let ledger = InMemoryLedger::new();
        let maker = LocalWallet::new("GMAKER");
        let breaker = LocalWallet::new("GBREAKER");

        let mut tx = signed(&ledger, &[&maker, &breaker], initiate()).await.transaction;
        tx.auth.retain(|e| e.signer == *maker.address());
        let tx = maker.sign(tx).await.unwrap();

        let hash = ledger.send(&tx).await.unwrap();
        assert!(matches!(
            ledger.transaction_status(&hash).await.unwrap(),
            TransactionStatus::Failed { .. }
        ));
        assert_eq!(
            ledger.simulate_query(&Query::GetGame { session_id: 9 }).await.unwrap(),
            QueryOutcome::ContractError { code: GameError::GameNotFound.code() }
        );
    }

    #[tokio::test]
    async fn test_bad_sequence_and_signature_rejected() {
        let ledger = InMemoryLedger::new();
        let maker = LocalWallet::new("GMAKER");
        let breaker = LocalWallet::new("GBREAKER");

        let tx = signed(&ledger, &[&maker, &breaker], initiate()).await;
        ledger.send(&tx).await.unwrap();
        assert!(matches!(ledger.send(&tx).await, Err(TransportError::Rejected(_))));

        let commit = Operation::CommitCode {
            session_id: 9,
            codemaker: maker.address().clone(),
            commitment: Commitment([3; 32]),
        };
        let genuine = signed(&ledger, &[&maker, &breaker], commit).await;
        let mut forged = genuine.clone();
        forged.signature = Signature::derive(breaker.address(), &genuine.hash().unwrap().0);
        match ledger.send(&forged).await {
            Err(TransportError::Rejected(reason)) => assert!(reason.contains("signature")),
            other => panic!("forged signature accepted: {:?}", other),
        }

        // The rejected send consumed neither the sequence number nor the auth nonce.
        let hash = ledger.send(&genuine).await.unwrap();
        assert_eq!(ledger.transaction_status(&hash).await.unwrap(), TransactionStatus::Success { ledger: 2 });
    }

    #[tokio::test]
    async fn test_stale_view_is_one_write_behind() {
        let ledger = InMemoryLedger::new();
        let maker = LocalWallet::new("GMAKER");
        let breaker = LocalWallet::new("GBREAKER");

        let tx = signed(&ledger, &[&maker, &breaker], initiate()).await;
        ledger.send(&tx).await.unwrap();

        ledger.set_faults(LedgerFaults { stale_simulations: 1, ..Default::default() }).await;
        let commit = Operation::CommitCode {
            session_id: 9,
            codemaker: maker.address().clone(),
            commitment: Commitment([2; 32]),
        };
        let tx = UnsignedTransaction::new(commit, 2);
        assert_eq!(
            ledger.simulate(&tx).await.unwrap(),
            SimulationOutcome::ContractError { code: GameError::GameNotFound.code() }
        );
        assert!(matches!(ledger.simulate(&tx).await.unwrap(), SimulationOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn test_pending_polls_and_injected_failure() {
        let ledger = InMemoryLedger::new();
        let maker = LocalWallet::new("GMAKER");
        let breaker = LocalWallet::new("GBREAKER");
        ledger
            .set_faults(LedgerFaults { pending_polls: 2, fail_next_apply: Some("boom".into()), ..Default::default() })
            .await;

        let tx = signed(&ledger, &[&maker, &breaker], initiate()).await;
        let hash = ledger.send(&tx).await.unwrap();
        assert_eq!(ledger.transaction_status(&hash).await.unwrap(), TransactionStatus::NotFound);
        assert_eq!(ledger.transaction_status(&hash).await.unwrap(), TransactionStatus::NotFound);
        assert_eq!(
            ledger.transaction_status(&hash).await.unwrap(),
            TransactionStatus::Failed { reason: "boom".into() }
        );
    }

    #[tokio::test]
    async fn test_session_expires() {
        let ledger = InMemoryLedger::with_registry(GameRegistry::with_limits(12, 10));
        let maker = LocalWallet::new("GMAKER");
        let breaker = LocalWallet::new("GBREAKER");
        let tx = signed(&ledger, &[&maker, &breaker], initiate()).await;
        ledger.send(&tx).await.unwrap();

        ledger.advance_ledgers(20).await;
        assert_eq!(
            ledger.simulate_query(&Query::GetGame { session_id: 9 }).await.unwrap(),
            QueryOutcome::ContractError { code: GameError::GameNotFound.code() }
        );
    }

    #[tokio::test]
    async fn test_wallet_refuses_other_accounts() {
        let maker = LocalWallet::new("GMAKER");
        let tx = UnsignedTransaction::new(
            Operation::SubmitGuess { session_id: 1, codebreaker: Address::new("GBREAKER"), guess: vec![0; 4] },
            1,
        );
        assert!(matches!(maker.sign(tx).await, Err(WalletError::WrongAccount { .. })));
    }
}
