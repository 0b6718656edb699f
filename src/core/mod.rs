//! Core primitives.
//!
//! Code sequences and the pinned digest. Everything else in the crate
//! builds on these two modules.

pub mod code;
pub mod hash;

// Re-export core types
pub use code::{Code, Guess, Secret, CodeError, CODE_LENGTH, ALPHABET_SIZE, CODE_SPACE};
pub use hash::{Digest32, DigestKind, DomainHasher, PINNED_DIGEST, hash_bytes, hash_with_domain};
