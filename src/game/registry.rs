//! Session Registry
//!
//! Session storage keyed by session id, as the ledger contract holds it.
//! Entries are temporary: every write extends the live-until ledger by
//! [`GAME_TTL_LEDGERS`], and an expired session reads as not found.

use std::collections::BTreeMap;
use tracing::debug;

use crate::game::state::{Address, GameSession, SessionId, MAX_GUESSES};
use crate::game::transition::{GameError, GameEvent};
use crate::proof::artifact::ProofHash;
use crate::proof::commitment::Commitment;

/// TTL extension per write, in ledgers (~30 days).
pub const GAME_TTL_LEDGERS: u32 = 518_400;

#[derive(Clone, Debug)]
struct Entry {
    session: GameSession,
    live_until: u32,
}

/// All sessions on one contract instance.
#[derive(Clone, Debug)]
pub struct GameRegistry {
    sessions: BTreeMap<SessionId, Entry>,
    max_guesses: u32,
    ttl_ledgers: u32,
}

impl GameRegistry {
    /// Create a registry with the reference limits.
    pub fn new() -> Self {
        Self::with_limits(MAX_GUESSES, GAME_TTL_LEDGERS)
    }

    /// Create a registry with explicit guess limit and TTL.
    pub fn with_limits(max_guesses: u32, ttl_ledgers: u32) -> Self {
        Self {
            sessions: BTreeMap::new(),
            max_guesses,
            ttl_ledgers,
        }
    }

    /// Read a live session.
    pub fn get(&self, session_id: SessionId, ledger: u32) -> Result<&GameSession, GameError> {
        match self.sessions.get(&session_id) {
            Some(entry) if entry.live_until >= ledger => Ok(&entry.session),
            _ => Err(GameError::GameNotFound),
        }
    }

    /// Live-until ledger for a session, if stored.
    pub fn live_until(&self, session_id: SessionId) -> Option<u32> {
        self.sessions.get(&session_id).map(|e| e.live_until)
    }

    /// Create a session in `waiting_for_commitment`.
    pub fn initiate(
        &mut self,
        session_id: SessionId,
        codemaker: Address,
        codebreaker: Address,
        ledger: u32,
    ) -> Result<GameEvent, GameError> {
        if self.get(session_id, ledger).is_ok() {
            return Err(GameError::SessionExists);
        }

        let mut session = GameSession::lobby(session_id, codemaker, codebreaker, self.max_guesses);
        let event = session.initiate()?;
        self.sessions.insert(session_id, Entry { session, live_until: ledger + self.ttl_ledgers });
        debug!(session_id, "session initiated");
        Ok(event)
    }

    /// Apply `commit_code`.
    pub fn commit_code(
        &mut self,
        session_id: SessionId,
        actor: &Address,
        commitment: Commitment,
        ledger: u32,
    ) -> Result<GameEvent, GameError> {
        self.mutate(session_id, ledger, |s| s.commit_code(actor, commitment))
    }

    /// Apply `submit_guess` from raw ledger integers.
    pub fn submit_guess(
        &mut self,
        session_id: SessionId,
        actor: &Address,
        values: &[u32],
        ledger: u32,
    ) -> Result<GameEvent, GameError> {
        self.mutate(session_id, ledger, |s| s.submit_guess_values(actor, values))
    }

    /// Apply `submit_feedback`.
    pub fn submit_feedback(
        &mut self,
        session_id: SessionId,
        actor: &Address,
        exact_matches: u32,
        color_matches: u32,
        proof_hash: ProofHash,
        ledger: u32,
    ) -> Result<GameEvent, GameError> {
        self.mutate(session_id, ledger, |s| s.submit_feedback(actor, exact_matches, color_matches, proof_hash))
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&mut self, ledger: u32) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, e| e.live_until >= ledger);
        before - self.sessions.len()
    }

    /// Number of stored entries (live or not yet purged).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn mutate<F>(&mut self, session_id: SessionId, ledger: u32, f: F) -> Result<GameEvent, GameError>
    where
        F: FnOnce(&mut GameSession) -> Result<GameEvent, GameError>,
    {
        let ttl = self.ttl_ledgers;
        let entry = match self.sessions.get_mut(&session_id) {
            Some(entry) if entry.live_until >= ledger => entry,
            _ => return Err(GameError::GameNotFound),
        };

        let event = f(&mut entry.session)?;
        entry.live_until = ledger + ttl;
        Ok(event)
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}
