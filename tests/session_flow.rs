//! End-to-end sessions on the in-process ledger with the stub prover.

use std::sync::Arc;

use zkmind::{
    Code, CodeBreaker, CodeMaker, Error, GameError, GamePhase, LedgerTransactor, ProofPipeline, Secret,
    config::{ProofConfig, TransactorConfig},
    game::state::{Role, MAX_GUESSES},
    ledger::{client::Wallet, memory::{InMemoryLedger, LocalWallet}},
    proof::{pipeline::ProofFallback, stub::{StubBackend, StubConfig}, verify::VerificationError},
};

const SESSION: u32 = 7;

struct Table {
    maker: CodeMaker<InMemoryLedger, StubBackend>,
    breaker: CodeBreaker<InMemoryLedger, StubBackend>,
    breaker_wallet: Arc<dyn Wallet>,
}

async fn open_table(secret: [u8; 4]) -> Table {
    let ledger = Arc::new(InMemoryLedger::new());
    let maker_wallet: Arc<dyn Wallet> = Arc::new(LocalWallet::new("GMAKER"));
    let breaker_wallet: Arc<dyn Wallet> = Arc::new(LocalWallet::new("GBREAKER"));

    let maker = CodeMaker::new(
        SESSION,
        Secret::new(Code::new(secret).unwrap()),
        maker_wallet,
        LedgerTransactor::new(ledger.clone(), TransactorConfig::default()).with_cosigner(breaker_wallet.clone()),
        ProofPipeline::new(StubConfig::default(), &ProofConfig::default()),
        ProofFallback::Refuse,
    );
    let breaker = CodeBreaker::new(
        SESSION,
        breaker_wallet.clone(),
        LedgerTransactor::new(ledger, TransactorConfig::default()),
        ProofPipeline::new(StubConfig::default(), &ProofConfig::default()),
    );

    maker.initiate(breaker_wallet.address().clone()).await.unwrap();
    maker.commit().await.unwrap();
    Table { maker, breaker, breaker_wallet }
}

#[tokio::test(start_paused = true)]
async fn test_codebreaker_wins_in_one_guess() {
    let mut t = open_table([0, 1, 2, 3]).await;

    t.breaker.guess(Code::new([0, 1, 2, 3]).unwrap()).await.unwrap();
    let response = t.maker.respond().await.unwrap();
    assert!(response.feedback.is_solved());

    let proof = response.proof.expect("proof shared");
    t.breaker.verify_feedback(0, &proof).await.unwrap();

    let session = t.breaker.sync().await.unwrap();
    assert_eq!(session.phase, GamePhase::Finished);
    assert_eq!(session.guess_count(), 1);
    assert_eq!(session.winner.as_ref(), Some(t.breaker_wallet.address()));
    assert_eq!(session.winner_role(), Some(Role::CodeBreaker));

    t.maker.shutdown().await;
    t.breaker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_codemaker_wins_when_guesses_run_out() {
    let mut t = open_table([0, 1, 2, 3]).await;
    let miss = Code::new([5, 5, 5, 5]).unwrap();

    for round in 0..MAX_GUESSES {
        t.breaker.guess(miss).await.unwrap();
        let response = t.maker.respond().await.unwrap();
        assert_eq!(response.ordinal, round);
        assert!(!response.feedback.is_solved());
    }

    let session = t.breaker.sync().await.unwrap();
    assert_eq!(session.phase, GamePhase::Finished);
    assert_eq!(session.guess_count(), MAX_GUESSES);
    assert_eq!(session.winner_role(), Some(Role::CodeMaker));

    let err = t.breaker.guess(miss).await.unwrap_err();
    assert_eq!(err.game_error(), Some(GameError::GameAlreadyEnded));
}

#[tokio::test(start_paused = true)]
async fn test_candidate_strategy_finds_secret() {
    let mut t = open_table([3, 1, 4, 1]).await;

    let mut rounds = 0;
    loop {
        t.breaker.guess_next().await.unwrap();
        let response = t.maker.respond().await.unwrap();
        let proof = response.proof.expect("proof shared");
        t.breaker.verify_feedback(response.ordinal, &proof).await.unwrap();
        rounds += 1;
        if response.feedback.is_solved() {
            break;
        }
        assert!(rounds < MAX_GUESSES, "strategy did not converge");
    }

    let session = t.breaker.sync().await.unwrap();
    assert_eq!(session.winner_role(), Some(Role::CodeBreaker));
    assert_eq!(t.breaker.candidates().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tampered_proof_rejected() {
    let mut t = open_table([0, 1, 2, 3]).await;

    t.breaker.guess(Code::new([0, 0, 0, 0]).unwrap()).await.unwrap();
    let response = t.maker.respond().await.unwrap();
    let mut proof = response.proof.expect("proof shared");
    let last = proof.len() - 1;
    proof[last] ^= 0x01;

    let err = t.breaker.verify_feedback(0, &proof).await.unwrap_err();
    assert!(matches!(err, Error::Verification(VerificationError::HashMismatch)));
}

#[tokio::test(start_paused = true)]
async fn test_proof_for_other_ordinal_rejected() {
    let mut t = open_table([0, 1, 2, 3]).await;

    t.breaker.guess(Code::new([0, 0, 0, 0]).unwrap()).await.unwrap();
    let first = t.maker.respond().await.unwrap();
    t.breaker.guess(Code::new([1, 1, 1, 1]).unwrap()).await.unwrap();
    t.maker.respond().await.unwrap();

    let proof = first.proof.expect("proof shared");
    assert!(t.breaker.verify_feedback(0, &proof).await.is_ok());
    assert!(matches!(
        t.breaker.verify_feedback(1, &proof).await,
        Err(Error::Verification(VerificationError::HashMismatch))
    ));
}
