//! Client Configuration
//!
//! Reference constants with `ZKMIND_*` environment overrides. Absent or
//! unparsable values fall back to the defaults.

use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::game::state::MAX_GUESSES;
use crate::proof::backend::OracleHash;
use crate::proof::pipeline::ProofFallback;

/// Simulation retry budget for state-dependent errors.
pub const DEFAULT_SIMULATION_RETRIES: u32 = 3;

/// Wait between stale simulations, in milliseconds.
pub const DEFAULT_SETTLEMENT_MS: u64 = 2_000;

/// Wait between status polls, in milliseconds.
pub const DEFAULT_POLL_MS: u64 = 1_000;

/// Status polls before giving up.
pub const DEFAULT_MAX_POLLS: u32 = 30;

/// Ledger submission settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactorConfig {
    /// Re-simulations after a state-dependent contract error.
    pub simulation_retries: u32,
    /// Wait before each re-simulation.
    pub settlement_interval: Duration,
    /// Wait between status polls.
    pub poll_interval: Duration,
    /// Polls before reporting a timeout.
    pub max_polls: u32,
}

impl Default for TransactorConfig {
    fn default() -> Self {
        Self {
            simulation_retries: DEFAULT_SIMULATION_RETRIES,
            settlement_interval: Duration::from_millis(DEFAULT_SETTLEMENT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

impl TransactorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            simulation_retries: env_parse("ZKMIND_SIM_RETRIES").unwrap_or(defaults.simulation_retries),
            settlement_interval: env_parse("ZKMIND_SETTLE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.settlement_interval),
            poll_interval: env_parse("ZKMIND_POLL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_polls: env_parse("ZKMIND_MAX_POLLS").unwrap_or(defaults.max_polls),
        }
    }
}

/// Proof generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProofConfig {
    /// Transcript oracle for generated proofs.
    pub oracle: OracleHash,
    /// Verify each proof locally before submission (best-effort).
    pub verify_locally: bool,
    /// Policy when proving fails.
    pub fallback: ProofFallback,
}

impl ProofConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            oracle: std::env::var("ZKMIND_ORACLE")
                .ok()
                .and_then(|v| OracleHash::parse(&v))
                .unwrap_or_default(),
            verify_locally: std::env::var("ZKMIND_VERIFY_LOCALLY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            fallback: match std::env::var("ZKMIND_PROOF_FALLBACK").as_deref() {
                Ok("placeholder") => ProofFallback::Placeholder,
                _ => ProofFallback::Refuse,
            },
        }
    }
}

/// Everything a CodeMaker or CodeBreaker client needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Ledger submission.
    pub transactor: TransactorConfig,
    /// Proof generation.
    pub proof: ProofConfig,
    /// Guess limit for new sessions.
    pub max_guesses: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transactor: TransactorConfig::default(),
            proof: ProofConfig::default(),
            max_guesses: MAX_GUESSES,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            transactor: TransactorConfig::from_env(),
            proof: ProofConfig::from_env(),
            max_guesses: env_parse("ZKMIND_MAX_GUESSES")
                .filter(|&n| n > 0)
                .unwrap_or(MAX_GUESSES),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
