//! Game Hub Reporting
//!
//! A finished session's outcome can be reported to an external game hub
//! that keeps results across games. Reporting is optional and happens at
//! most once per session, only after the session is finished.

use std::collections::BTreeMap;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::game::state::SessionId;

/// Hub call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Hub already holds a result for this session.
    #[error("session {0} already reported")]
    AlreadyReported(SessionId),

    /// Hub unreachable or refused the call.
    #[error("hub unavailable: {0}")]
    Unavailable(String),
}

/// Receiver of finished-session results.
#[async_trait]
pub trait GameHub: Send + Sync {
    /// Record the outcome of `session_id`.
    async fn end_game(&self, session_id: SessionId, codemaker_won: bool) -> Result<(), HubError>;
}

/// Hub that keeps results in memory.
#[derive(Debug, Default)]
pub struct RecordingHub {
    results: Mutex<BTreeMap<SessionId, bool>>,
}

impl RecordingHub {
    /// Empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reported outcome for `session_id`: `Some(true)` if the codemaker won.
    pub async fn result(&self, session_id: SessionId) -> Option<bool> {
        self.results.lock().await.get(&session_id).copied()
    }
}

#[async_trait]
impl GameHub for RecordingHub {
    async fn end_game(&self, session_id: SessionId, codemaker_won: bool) -> Result<(), HubError> {
        let mut results = self.results.lock().await;
        if results.contains_key(&session_id) {
            return Err(HubError::AlreadyReported(session_id));
        }
        results.insert(session_id, codemaker_won);
        debug!(session_id, codemaker_won, "result recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_report_rejected() {
        let hub = RecordingHub::new();
        hub.end_game(3, true).await.unwrap();
        assert_eq!(hub.end_game(3, false).await, Err(HubError::AlreadyReported(3)));
        assert_eq!(hub.result(3).await, Some(true));
        assert_eq!(hub.result(4).await, None);
    }
}
