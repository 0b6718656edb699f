//! Game Logic Module
//!
//! Pure, synchronous game rules. No I/O.
//!
//! ## Module Structure
//!
//! - `feedback`: Red/white peg computation
//! - `state`: Session aggregate, phases, records
//! - `transition`: Guarded phase transitions and their errors
//! - `registry`: Session storage keyed by id, with TTL

pub mod feedback;
pub mod state;
pub mod transition;
pub mod registry;

// Re-export key types
pub use feedback::{compute, Feedback};
pub use state::{Address, GamePhase, GameSession, GuessRecord, Role, SessionId, MAX_GUESSES};
pub use transition::{GameError, GameEvent};
pub use registry::{GameRegistry, GAME_TTL_LEDGERS};
