//! Ledger Transactor
//!
//! Submits protocol operations to a ledger whose simulation view may lag
//! its committed state by one write.
//!
//! ```text
//! build ─► simulate ──ok──────────────────────────────┐
//!            │ state-dependent error                  │
//!            ├─► settle, re-simulate (bounded) ──ok───┤
//!            │ budget exhausted                       │
//!            ├─► submit_feedback: manual footprint ───┤
//!            └─► anything else: StaleSimulation       ▼
//!                                         sign ─► send ─► poll until found
//! ```
//!
//! The manual-footprint path is a separate, named route. It only activates
//! for `submit_feedback`, and the outcome reports which route was taken.

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::TransactorConfig;
use crate::error::Recovery;
use crate::game::state::{Address, GameSession, SessionId};
use crate::game::transition::GameError;
use crate::ledger::client::{LedgerClient, TransportError, Wallet, WalletError};
use crate::ledger::schema::{GameSnapshot, SchemaError};
use crate::ledger::types::{
    AuthEntry, LedgerKey, Operation, Query, QueryOutcome, ResourceBudget, SimulationOutcome,
    TransactionHash, TransactionStatus, UnsignedTransaction, AUTH_VALIDITY_LEDGERS,
};

/// Ledger submission errors.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transport failed before anything was sent.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Wallet refused or failed.
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Wallet does not hold the operation's source account.
    #[error("operation source is {expected}, wallet holds {got}")]
    WrongSigner {
        /// Operation source.
        expected: Address,
        /// Wallet account.
        got: Address,
    },

    /// A required co-signer is not registered.
    #[error("no co-signer registered for {0}")]
    MissingCosigner(Address),

    /// Contract guard rejected the operation in simulation.
    #[error("rejected by contract: {0}")]
    Rejected(GameError),

    /// Contract returned a code this client does not know.
    #[error("unknown contract error code {0}")]
    UnknownContractError(u32),

    /// Simulation kept failing on a state-dependent error.
    #[error("simulation still failing after {attempts} attempts: {error}")]
    StaleSimulation {
        /// Last contract error.
        error: GameError,
        /// Simulations run.
        attempts: u32,
    },

    /// Host failure during simulation.
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// Snapshot failed schema validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Sending failed; the transaction may or may not have been accepted.
    #[error("send failed: {0}")]
    Send(TransportError),

    /// Ledger reported a terminal failure for a sent transaction.
    #[error("transaction {hash} failed: {reason}")]
    Finality {
        /// Transaction id.
        hash: TransactionHash,
        /// Host-reported reason.
        reason: String,
    },

    /// Transaction not visible after the poll budget.
    #[error("transaction {hash} not found after {polls} polls")]
    PollTimeout {
        /// Transaction id.
        hash: TransactionHash,
        /// Polls made.
        polls: u32,
    },

    /// Status polling failed after send.
    #[error("status poll failed for {hash}: {source}")]
    Poll {
        /// Transaction id.
        hash: TransactionHash,
        /// Underlying error.
        source: TransportError,
    },
}

impl LedgerError {
    /// Whether ledger state may have changed.
    pub fn recovery(&self) -> Recovery {
        match self {
            LedgerError::Send(_)
            | LedgerError::Finality { .. }
            | LedgerError::PollTimeout { .. }
            | LedgerError::Poll { .. } => Recovery::RefetchBeforeRetry,
            _ => Recovery::RetryFreely,
        }
    }

    /// Contract error carried by this failure, if any.
    pub fn game_error(&self) -> Option<GameError> {
        match self {
            LedgerError::Rejected(e) | LedgerError::StaleSimulation { error: e, .. } => Some(*e),
            _ => None,
        }
    }

    fn from_contract_code(code: u32) -> Self {
        match GameError::from_code(code) {
            Some(e) => LedgerError::Rejected(e),
            None => LedgerError::UnknownContractError(code),
        }
    }
}

/// Route a submitted transaction took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitRoute {
    /// Resources from a successful simulation.
    Simulated,
    /// Footprint from a read-only query, fixed budget.
    ManualFootprint,
}

/// Finalized submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Transaction id.
    pub hash: TransactionHash,
    /// Ledger it closed in.
    pub ledger: u32,
    /// Route taken.
    pub route: SubmitRoute,
    /// Simulations run before submission.
    pub simulations: u32,
}

/// Builds, simulates, signs, sends and confirms protocol operations.
pub struct LedgerTransactor<L: LedgerClient> {
    client: Arc<L>,
    config: TransactorConfig,
    cosigners: HashMap<Address, Arc<dyn Wallet>>,
}

impl<L: LedgerClient> LedgerTransactor<L> {
    /// Create a transactor.
    pub fn new(client: Arc<L>, config: TransactorConfig) -> Self {
        Self {
            client,
            config,
            cosigners: HashMap::new(),
        }
    }

    /// Register a wallet whose auth entries are collected out-of-band.
    pub fn with_cosigner(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.cosigners.insert(wallet.address().clone(), wallet);
        self
    }

    /// Underlying ledger client.
    pub fn client(&self) -> &Arc<L> {
        &self.client
    }

    /// Submit `operation` signed by `wallet`.
    #[instrument(skip_all, fields(op = %operation.kind(), session_id = operation.session_id()))]
    pub async fn submit(&self, wallet: &dyn Wallet, operation: Operation) -> Result<SubmitOutcome, LedgerError> {
        if wallet.address() != operation.source() {
            return Err(LedgerError::WrongSigner {
                expected: operation.source().clone(),
                got: wallet.address().clone(),
            });
        }

        let sequence = self.client.account_sequence(operation.source()).await?;
        let tx = UnsignedTransaction::new(operation, sequence + 1);

        let (tx, route, simulations) = match self.simulate_with_retry(&tx).await? {
            Simulated::Ready(prepared, attempts) => (prepared, SubmitRoute::Simulated, attempts),
            Simulated::Stale(error, attempts) => {
                if !tx.operation.allows_manual_footprint() {
                    return Err(LedgerError::StaleSimulation { error, attempts });
                }
                warn!(%error, attempts, "simulation stale, taking manual-footprint path");
                (self.manual_footprint(tx).await?, SubmitRoute::ManualFootprint, attempts)
            }
        };

        let tx = self.authorize(wallet, tx).await?;
        let signed = wallet.sign(tx).await?;
        let hash = self.client.send(&signed).await.map_err(LedgerError::Send)?;
        info!(%hash, ?route, "transaction sent");

        let ledger = self.await_finality(hash).await?;
        info!(%hash, ledger, "transaction applied");
        Ok(SubmitOutcome { hash, ledger, route, simulations })
    }

    /// Read a session through the fixed snapshot schema.
    #[instrument(skip(self))]
    pub async fn fetch_game(&self, session_id: SessionId) -> Result<GameSession, LedgerError> {
        match self.client.simulate_query(&Query::GetGame { session_id }).await? {
            QueryOutcome::Success { value, .. } => Ok(GameSnapshot::decode(value)?),
            QueryOutcome::ContractError { code } => Err(LedgerError::from_contract_code(code)),
            QueryOutcome::HostError { message } => Err(LedgerError::Simulation(message)),
        }
    }

    async fn simulate_with_retry(&self, tx: &UnsignedTransaction) -> Result<Simulated, LedgerError> {
        let budget = self.config.simulation_retries;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.simulate(tx).await? {
                SimulationOutcome::Success { footprint, budget: resources, auth } => {
                    let mut prepared = tx.clone();
                    prepared.footprint = Some(footprint);
                    prepared.budget = Some(resources);
                    prepared.auth = auth;
                    return Ok(Simulated::Ready(prepared, attempt));
                }
                SimulationOutcome::ContractError { code } => {
                    let error = match GameError::from_code(code) {
                        Some(e) if e.is_state_dependent() => e,
                        _ => return Err(LedgerError::from_contract_code(code)),
                    };
                    if attempt > budget {
                        return Ok(Simulated::Stale(error, attempt));
                    }
                    debug!(%error, attempt, "state-dependent simulation error, settling");
                    tokio::time::sleep(self.config.settlement_interval).await;
                }
                SimulationOutcome::HostError { message } => return Err(LedgerError::Simulation(message)),
            }
        }
    }

    /// Build resources without a successful write simulation.
    ///
    /// Storage keys come from a read-only query of the same session; the
    /// session entry is promoted to read-write and the fixed fallback budget
    /// is attached. Auth entries are built locally with fresh nonces.
    #[instrument(skip_all, fields(session_id = tx.operation.session_id()))]
    async fn manual_footprint(&self, mut tx: UnsignedTransaction) -> Result<UnsignedTransaction, LedgerError> {
        let session_id = tx.operation.session_id();
        let mut footprint = match self.client.simulate_query(&Query::GetGame { session_id }).await? {
            QueryOutcome::Success { footprint, .. } => footprint,
            QueryOutcome::ContractError { code } => return Err(LedgerError::from_contract_code(code)),
            QueryOutcome::HostError { message } => return Err(LedgerError::Simulation(message)),
        };
        footprint.promote(LedgerKey::Game(session_id));

        let expiration = self.client.latest_ledger().await? + AUTH_VALIDITY_LEDGERS;
        let mut auth = Vec::new();
        for signer in tx.operation.required_signers() {
            let entry = AuthEntry::new(signer.clone(), &tx.operation, rand::random(), expiration)
                .map_err(TransportError::from)?;
            auth.push(entry);
        }

        tx.footprint = Some(footprint);
        tx.budget = Some(ResourceBudget::FALLBACK);
        tx.auth = auth;
        Ok(tx)
    }

    async fn authorize(&self, wallet: &dyn Wallet, mut tx: UnsignedTransaction) -> Result<UnsignedTransaction, LedgerError> {
        let mut signed = Vec::with_capacity(tx.auth.len());
        for entry in std::mem::take(&mut tx.auth) {
            let entry = if &entry.signer == wallet.address() {
                wallet.sign_auth_entry(entry).await?
            } else {
                let cosigner = self
                    .cosigners
                    .get(&entry.signer)
                    .ok_or_else(|| LedgerError::MissingCosigner(entry.signer.clone()))?;
                debug!(signer = %entry.signer, "collecting co-signer authorization");
                cosigner.sign_auth_entry(entry).await?
            };
            signed.push(entry);
        }
        tx.auth = signed;
        Ok(tx)
    }

    async fn await_finality(&self, hash: TransactionHash) -> Result<u32, LedgerError> {
        for poll in 0..self.config.max_polls {
            let status = self
                .client
                .transaction_status(&hash)
                .await
                .map_err(|source| LedgerError::Poll { hash, source })?;
            match status {
                TransactionStatus::NotFound => {
                    debug!(%hash, poll, "not found yet");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                TransactionStatus::Success { ledger } => return Ok(ledger),
                TransactionStatus::Failed { reason } => {
                    warn!(%hash, %reason, "transaction failed");
                    return Err(LedgerError::Finality { hash, reason });
                }
            }
        }
        Err(LedgerError::PollTimeout { hash, polls: self.config.max_polls })
    }
}

enum Simulated {
    Ready(UnsignedTransaction, u32),
    Stale(GameError, u32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::ledger::memory::{InMemoryLedger, LedgerFaults, LocalWallet};
    use crate::proof::artifact::ProofHash;
    use crate::proof::commitment::Commitment;

    struct Setup {
        ledger: Arc<InMemoryLedger>,
        transactor: LedgerTransactor<InMemoryLedger>,
        maker: LocalWallet,
        breaker: Arc<LocalWallet>,
    }

    fn config() -> TransactorConfig {
        TransactorConfig {
            simulation_retries: 3,
            settlement_interval: Duration::from_millis(2_000),
            poll_interval: Duration::from_millis(1_000),
            max_polls: 5,
        }
    }

    fn setup() -> Setup {
        let ledger = Arc::new(InMemoryLedger::new());
        let maker = LocalWallet::new("GMAKER");
        let breaker = Arc::new(LocalWallet::new("GBREAKER"));
        let transactor = LedgerTransactor::new(ledger.clone(), config()).with_cosigner(breaker.clone());
        Setup { ledger, transactor, maker, breaker }
    }

    fn initiate(s: &Setup) -> Operation {
        Operation::Initiate {
            session_id: 1,
            codemaker: s.maker.address().clone(),
            codebreaker: s.breaker.address().clone(),
        }
    }

    async fn to_waiting_for_feedback(s: &Setup) {
        s.transactor.submit(&s.maker, initiate(s)).await.unwrap();
        let commit = Operation::CommitCode {
            session_id: 1,
            codemaker: s.maker.address().clone(),
            commitment: Commitment([1; 32]),
        };
        s.transactor.submit(&s.maker, commit).await.unwrap();
        let guess = Operation::SubmitGuess {
            session_id: 1,
            codebreaker: s.breaker.address().clone(),
            guess: vec![0, 1, 2, 3],
        };
        s.transactor.submit(s.breaker.as_ref(), guess).await.unwrap();
    }

    fn feedback(s: &Setup) -> Operation {
        Operation::SubmitFeedback {
            session_id: 1,
            codemaker: s.maker.address().clone(),
            exact_matches: 1,
            color_matches: 1,
            proof_hash: ProofHash::of_proof(b"proof"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_route() {
        let s = setup();
        let outcome = s.transactor.submit(&s.maker, initiate(&s)).await.unwrap();
        assert_eq!(outcome.route, SubmitRoute::Simulated);
        assert_eq!(outcome.simulations, 1);

        let session = s.transactor.fetch_game(1).await.unwrap();
        assert_eq!(session.codebreaker, *s.breaker.address());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initiate_needs_cosigner() {
        let ledger = Arc::new(InMemoryLedger::new());
        let transactor = LedgerTransactor::new(ledger, config());
        let maker = LocalWallet::new("GMAKER");
        let op = Operation::Initiate {
            session_id: 1,
            codemaker: maker.address().clone(),
            codebreaker: Address::new("GBREAKER"),
        };
        let err = transactor.submit(&maker, op).await.unwrap_err();
        assert!(matches!(err, LedgerError::MissingCosigner(_)));
        assert_eq!(err.recovery(), Recovery::RetryFreely);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_signer() {
        let s = setup();
        let err = s.transactor.submit(s.breaker.as_ref(), initiate(&s)).await.unwrap_err();
        assert!(matches!(err, LedgerError::WrongSigner { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_short_lag() {
        let s = setup();
        to_waiting_for_feedback(&s).await;
        s.ledger.set_faults(LedgerFaults { stale_simulations: 2, ..Default::default() }).await;

        let started = tokio::time::Instant::now();
        let outcome = s.transactor.submit(&s.maker, feedback(&s)).await.unwrap();
        assert_eq!(outcome.route, SubmitRoute::Simulated);
        assert_eq!(outcome.simulations, 3);
        assert!(started.elapsed() >= Duration::from_millis(4_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feedback_takes_manual_footprint() {
        let s = setup();
        to_waiting_for_feedback(&s).await;
        s.ledger.set_faults(LedgerFaults { stale_simulations: u32::MAX, ..Default::default() }).await;

        let outcome = s.transactor.submit(&s.maker, feedback(&s)).await.unwrap();
        assert_eq!(outcome.route, SubmitRoute::ManualFootprint);
        assert_eq!(outcome.simulations, 4);

        let session = s.transactor.fetch_game(1).await.unwrap();
        assert_eq!(session.guess_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guess_never_takes_manual_footprint() {
        let s = setup();
        to_waiting_for_feedback(&s).await;
        s.transactor.submit(&s.maker, feedback(&s)).await.unwrap();
        s.ledger.set_faults(LedgerFaults { stale_simulations: u32::MAX, ..Default::default() }).await;

        let guess = Operation::SubmitGuess {
            session_id: 1,
            codebreaker: s.breaker.address().clone(),
            guess: vec![3, 2, 1, 0],
        };
        let err = s.transactor.submit(s.breaker.as_ref(), guess).await.unwrap_err();
        assert!(matches!(err, LedgerError::StaleSimulation { error: GameError::InvalidPhase, attempts: 4 }));
        assert_eq!(err.recovery(), Recovery::RetryFreely);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_state_dependent_errors_retried() {
        let s = setup();
        s.transactor.submit(&s.maker, initiate(&s)).await.unwrap();
        let guess = Operation::SubmitGuess {
            session_id: 1,
            codebreaker: s.breaker.address().clone(),
            guess: vec![0, 1, 2, 3],
        };
        let started = tokio::time::Instant::now();
        let err = s.transactor.submit(s.breaker.as_ref(), guess).await.unwrap_err();
        assert!(matches!(err, LedgerError::StaleSimulation { .. }));
        assert!(started.elapsed() >= Duration::from_millis(6_000));

        let bad_actor = Operation::CommitCode {
            session_id: 1,
            codemaker: s.breaker.address().clone(),
            commitment: Commitment([1; 32]),
        };
        let started = tokio::time::Instant::now();
        let err = s.transactor.submit(s.breaker.as_ref(), bad_actor).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(GameError::NotCodeMaker)));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finality_error_leaves_state() {
        let s = setup();
        to_waiting_for_feedback(&s).await;
        let before = s.transactor.fetch_game(1).await.unwrap();

        s.ledger
            .set_faults(LedgerFaults { fail_next_apply: Some("resource limit exceeded".into()), ..Default::default() })
            .await;
        let err = s.transactor.submit(&s.maker, feedback(&s)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Finality { .. }));
        assert_eq!(err.recovery(), Recovery::RefetchBeforeRetry);
        assert_eq!(s.transactor.fetch_game(1).await.unwrap(), before);

        // Whole operation is safe to retry.
        s.transactor.submit(&s.maker, feedback(&s)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_found() {
        let s = setup();
        s.ledger.set_faults(LedgerFaults { pending_polls: 3, ..Default::default() }).await;
        let started = tokio::time::Instant::now();
        s.transactor.submit(&s.maker, initiate(&s)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeout() {
        let s = setup();
        s.ledger.set_faults(LedgerFaults { pending_polls: 10, ..Default::default() }).await;
        let err = s.transactor.submit(&s.maker, initiate(&s)).await.unwrap_err();
        assert!(matches!(err, LedgerError::PollTimeout { polls: 5, .. }));
        assert_eq!(err.recovery(), Recovery::RefetchBeforeRetry);
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_signature() {
        let s = setup();
        let declining = LocalWallet::new("GMAKER").declining();
        let err = s.transactor.submit(&declining, initiate(&s)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Wallet(WalletError::UserDeclined)));
        assert_eq!(err.recovery(), Recovery::RetryFreely);
        assert!(matches!(
            s.transactor.fetch_game(1).await,
            Err(LedgerError::Rejected(GameError::GameNotFound))
        ));
    }
}
