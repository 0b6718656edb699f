//! Feedback Computation
//!
//! Red/white peg scoring. This is the exact function the proof circuit
//! asserts, so it must stay pure and total.
//!
//! Two passes are required. Exact matches consume their positions first;
//! color matches are then counted per symbol over the remaining positions
//! only, as `min(count_in_secret, count_in_guess)`. A single pass would let
//! a symbol consumed by an exact match also score a color match.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::code::{Code, ALPHABET_SIZE, CODE_LENGTH};

/// Feedback disclosed for one guess.
///
/// Invariant: `exact_matches + color_matches <= CODE_LENGTH`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feedback {
    /// Right symbol, right position (red pegs).
    pub exact_matches: u8,
    /// Right symbol, wrong position (white pegs).
    pub color_matches: u8,
}

impl Feedback {
    /// The winning feedback.
    pub const SOLVED: Feedback = Feedback { exact_matches: CODE_LENGTH as u8, color_matches: 0 };

    /// Validate a claimed feedback pair.
    ///
    /// Returns `None` when the pair can't come from any (secret, guess).
    pub fn new(exact_matches: u32, color_matches: u32) -> Option<Self> {
        let limit = CODE_LENGTH as u32;
        if exact_matches > limit || color_matches > limit || exact_matches + color_matches > limit {
            return None;
        }
        Some(Self {
            exact_matches: exact_matches as u8,
            color_matches: color_matches as u8,
        })
    }

    /// All four symbols in place.
    #[inline]
    pub fn is_solved(&self) -> bool {
        self.exact_matches as usize == CODE_LENGTH
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}R/{}W", self.exact_matches, self.color_matches)
    }
}

/// Score `guess` against `secret`.
pub fn compute(secret: &Code, guess: &Code) -> Feedback {
    let secret = secret.symbols();
    let guess = guess.symbols();

    let mut exact_matches = 0u8;
    let mut secret_counts = [0u8; ALPHABET_SIZE as usize];
    let mut guess_counts = [0u8; ALPHABET_SIZE as usize];

    for i in 0..CODE_LENGTH {
        if secret[i] == guess[i] {
            exact_matches += 1;
        } else {
            secret_counts[secret[i] as usize] += 1;
            guess_counts[guess[i] as usize] += 1;
        }
    }

    let color_matches = secret_counts
        .iter()
        .zip(guess_counts.iter())
        .map(|(s, g)| (*s).min(*g))
        .sum();

    Feedback { exact_matches, color_matches }
}
