//! ZKMind Demo
//!
//! Plays one full session on the in-process ledger with the stub prover.
//! The CodeBreaker checks every shared proof before guessing again.

use std::sync::Arc;
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zkmind::{
    ClientConfig, CodeBreaker, CodeMaker, GamePhase, LedgerTransactor, ProofPipeline, Secret, VERSION,
    game::registry::{GameRegistry, GAME_TTL_LEDGERS},
    ledger::{client::Wallet, hub::RecordingHub, memory::{InMemoryLedger, LocalWallet}},
    proof::stub::{StubBackend, StubConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ClientConfig::from_env();
    info!("ZKMind v{}", VERSION);
    info!(oracle = ?config.proof.oracle, max_guesses = config.max_guesses, "configuration loaded");

    let ledger = Arc::new(InMemoryLedger::with_registry(GameRegistry::with_limits(
        config.max_guesses,
        GAME_TTL_LEDGERS,
    )));
    let maker_wallet: Arc<dyn Wallet> = Arc::new(LocalWallet::new("GCODEMAKER"));
    let breaker_wallet: Arc<dyn Wallet> = Arc::new(LocalWallet::new("GCODEBREAKER"));

    let hub = Arc::new(RecordingHub::new());
    let session_id = rand::random::<u32>();
    let secret = Secret::random(&mut rand::thread_rng());

    let mut maker = CodeMaker::new(
        session_id,
        secret,
        maker_wallet,
        LedgerTransactor::new(ledger.clone(), config.transactor.clone()).with_cosigner(breaker_wallet.clone()),
        ProofPipeline::<StubBackend>::new(StubConfig::default(), &config.proof),
        config.proof.fallback,
    )
    .with_max_guesses(config.max_guesses)
    .with_hub(hub.clone());
    let mut breaker = CodeBreaker::new(
        session_id,
        breaker_wallet.clone(),
        LedgerTransactor::new(ledger.clone(), config.transactor.clone()),
        ProofPipeline::<StubBackend>::new(StubConfig::default(), &config.proof),
    );

    maker.initiate(breaker_wallet.address().clone()).await.context("initiate")?;
    maker.commit().await.context("commit")?;
    info!(session_id, commitment = %maker.commitment(), "=== Session Open ===");

    loop {
        let guess = breaker.guess_next().await.context("guess")?;
        let response = maker.respond().await.context("feedback")?;
        info!(ordinal = response.ordinal, %guess, feedback = %response.feedback, "round complete");

        match &response.proof {
            Some(proof) => breaker.verify_feedback(response.ordinal, proof).await.context("verify")?,
            None => info!(ordinal = response.ordinal, "no proof shared, feedback unverified"),
        }

        let session = breaker.sync().await.context("sync")?;
        if session.phase == GamePhase::Finished {
            info!("=== Session Finished ===");
            info!(guesses = session.guess_count(), winner = ?session.winner_role(), "result");
            let codemaker_won = maker.report_result().await.context("report")?;
            info!(?codemaker_won, hub = ?hub.result(session_id).await, "result reported to hub");
            break;
        }
        info!(remaining = breaker.candidates().len(), "candidates left");
    }

    maker.shutdown().await;
    breaker.shutdown().await;
    Ok(())
}
