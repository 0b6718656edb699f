//! Code Sequences
//!
//! A code is 4 symbols drawn from a 6-symbol alphabet. The same shape is
//! used for the CodeMaker's secret and the CodeBreaker's guesses.

use std::fmt;
use rand::Rng;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of symbols in a code.
pub const CODE_LENGTH: usize = 4;

/// Number of distinct symbols ("colors").
pub const ALPHABET_SIZE: u8 = 6;

/// Size of the code space (6^4).
pub const CODE_SPACE: usize = 1296;

/// Rejected code input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    /// Wrong number of symbols.
    #[error("code must have {CODE_LENGTH} symbols, got {0}")]
    WrongLength(usize),
    /// Symbol outside the alphabet.
    #[error("symbol {value} at position {position} is outside 0..{ALPHABET_SIZE}")]
    SymbolOutOfRange {
        /// Position in the code.
        position: usize,
        /// Offending value.
        value: u32,
    },
}

/// An ordered sequence of [`CODE_LENGTH`] symbols, each `< ALPHABET_SIZE`.
///
/// Construction validates, so every `Code` in the program is in range.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct Code([u8; CODE_LENGTH]);

/// A guess submitted by the CodeBreaker.
pub type Guess = Code;

impl Code {
    /// Build from symbol values, validating the alphabet.
    pub fn new(symbols: [u8; CODE_LENGTH]) -> Result<Self, CodeError> {
        for (position, &value) in symbols.iter().enumerate() {
            if value >= ALPHABET_SIZE {
                return Err(CodeError::SymbolOutOfRange { position, value: value as u32 });
            }
        }
        Ok(Self(symbols))
    }

    /// Build from the ledger's integer representation.
    pub fn from_values(values: &[u32]) -> Result<Self, CodeError> {
        if values.len() != CODE_LENGTH {
            return Err(CodeError::WrongLength(values.len()));
        }
        let mut symbols = [0u8; CODE_LENGTH];
        for (position, &value) in values.iter().enumerate() {
            if value >= ALPHABET_SIZE as u32 {
                return Err(CodeError::SymbolOutOfRange { position, value });
            }
            symbols[position] = value as u8;
        }
        Ok(Self(symbols))
    }

    /// Code at a given index in `0..CODE_SPACE` (base-6, most significant first).
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= CODE_SPACE {
            return None;
        }
        let mut symbols = [0u8; CODE_LENGTH];
        let mut rest = index;
        for slot in symbols.iter_mut().rev() {
            *slot = (rest % ALPHABET_SIZE as usize) as u8;
            rest /= ALPHABET_SIZE as usize;
        }
        Some(Self(symbols))
    }

    /// Iterate every code in index order.
    pub fn all() -> impl Iterator<Item = Code> {
        (0..CODE_SPACE).filter_map(Code::from_index)
    }

    /// Symbols as bytes.
    #[inline]
    pub fn symbols(&self) -> &[u8; CODE_LENGTH] {
        &self.0
    }

    /// Symbols widened to the ledger's integer type.
    pub fn to_values(&self) -> [u32; CODE_LENGTH] {
        self.0.map(u32::from)
    }

    /// Apply a symbol permutation (`map[old] = new`).
    pub fn relabel(&self, map: &[u8; ALPHABET_SIZE as usize]) -> Self {
        Self(self.0.map(|s| map[s as usize]))
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code{:?}", self.0)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.0 {
            write!(f, "{}", s)?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<u32>> for Code {
    type Error = CodeError;

    fn try_from(values: Vec<u32>) -> Result<Self, Self::Error> {
        Code::from_values(&values)
    }
}

impl From<Code> for Vec<u32> {
    fn from(code: Code) -> Self {
        code.to_values().to_vec()
    }
}

/// The CodeMaker's secret.
///
/// Deliberately not `Serialize`/`Deserialize`, and `Debug` is redacted:
/// the secret exists only inside the CodeMaker's process.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Code);

impl Secret {
    /// Wrap a validated code.
    pub fn new(code: Code) -> Self {
        Self(code)
    }

    /// Draw a uniformly random secret.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut symbols = [0u8; CODE_LENGTH];
        for slot in symbols.iter_mut() {
            *slot = rng.gen_range(0..ALPHABET_SIZE);
        }
        Self(Code(symbols))
    }

    /// Borrow the underlying code.
    #[inline]
    pub fn code(&self) -> &Code {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Code::new([0, 1, 2, 5]).is_ok());
        assert_eq!(
            Code::new([0, 6, 2, 3]),
            Err(CodeError::SymbolOutOfRange { position: 1, value: 6 })
        );
        assert_eq!(Code::from_values(&[0, 1, 2]), Err(CodeError::WrongLength(3)));
        assert!(matches!(
            Code::from_values(&[0, 1, 2, 99]),
            Err(CodeError::SymbolOutOfRange { position: 3, value: 99 })
        ));
    }

    #[test]
    fn test_code_space_enumeration() {
        let codes: Vec<Code> = Code::all().collect();
        assert_eq!(codes.len(), CODE_SPACE);
        assert_eq!(codes[0].symbols(), &[0, 0, 0, 0]);
        assert_eq!(codes[CODE_SPACE - 1].symbols(), &[5, 5, 5, 5]);
        assert_eq!(Code::from_index(CODE_SPACE), None);
        // base-6: 1*216 + 2*36 + 3*6 + 4
        assert_eq!(Code::from_index(310).map(|c| *c.symbols()), Some([1, 2, 3, 4]));
    }

    #[test]
    fn test_serde_as_integers() {
        let code = Code::new([0, 1, 2, 3]).unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "[0,1,2,3]");

        let back: Code = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);

        assert!(serde_json::from_str::<Code>("[0,1,2,7]").is_err());
        assert!(serde_json::from_str::<Code>("[0,1,2]").is_err());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new(Code::new([1, 2, 3, 4]).unwrap());
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains('1'));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_random_secret_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let secret = Secret::random(&mut rng);
            assert!(secret.code().symbols().iter().all(|&s| s < ALPHABET_SIZE));
        }
    }
}
