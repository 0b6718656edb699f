//! Circuit Inputs
//!
//! The structured record handed to the proving backend. Field names, order
//! and types must match the circuit's declared interface exactly; drift here
//! does not crash, it silently proves the wrong statement. The schema is a
//! constant so the pipeline can compare it against what a backend declares
//! before generating a witness.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::code::{Guess, Secret, CODE_LENGTH};
use crate::core::hash::Digest32;
use crate::game::feedback::Feedback;
use crate::proof::commitment::Commitment;

/// Total number of u32 elements in the flattened input.
pub const INPUT_ELEMENT_COUNT: usize = 18;

/// Element type of a circuit input field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Array of u32 symbols or counts.
    U32,
    /// 32-byte digest, flattened to 8 little-endian u32 words.
    Bytes32,
}

/// One declared input field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InputField {
    /// Field name as declared by the circuit.
    pub name: &'static str,
    /// Element type.
    pub ty: FieldType,
    /// Number of elements of `ty`.
    pub len: usize,
    /// Whether the verifier sees this field.
    pub public: bool,
}

/// The feedback circuit's interface, in declaration order.
pub const CIRCUIT_SCHEMA: &[InputField] = &[
    InputField { name: "secret", ty: FieldType::U32, len: CODE_LENGTH, public: false },
    InputField { name: "commitment", ty: FieldType::Bytes32, len: 1, public: true },
    InputField { name: "guess", ty: FieldType::U32, len: CODE_LENGTH, public: true },
    InputField { name: "exact_matches", ty: FieldType::U32, len: 1, public: true },
    InputField { name: "color_matches", ty: FieldType::U32, len: 1, public: true },
];

/// Public part of a feedback statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicInputs {
    /// Published commitment.
    pub commitment: Commitment,
    /// Guess being answered.
    pub guess: Guess,
    /// Claimed feedback.
    pub feedback: Feedback,
}

impl PublicInputs {
    /// Flatten public fields in schema order.
    pub fn to_field_elements(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(INPUT_ELEMENT_COUNT - CODE_LENGTH);
        out.extend_from_slice(&digest_words(self.commitment.as_bytes()));
        out.extend_from_slice(&self.guess.to_values());
        out.push(self.feedback.exact_matches as u32);
        out.push(self.feedback.color_matches as u32);
        out
    }
}

/// Full witness input binding secret, commitment, guess and claimed feedback.
#[derive(Clone)]
pub struct CircuitInputs {
    secret: Secret,
    public: PublicInputs,
}

impl CircuitInputs {
    /// Bind the four values.
    pub fn new(secret: &Secret, commitment: Commitment, guess: Guess, feedback: Feedback) -> Self {
        Self {
            secret: secret.clone(),
            public: PublicInputs { commitment, guess, feedback },
        }
    }

    /// The private secret input.
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// The public part.
    pub fn public(&self) -> &PublicInputs {
        &self.public
    }

    /// Flatten every field in schema order.
    pub fn to_field_elements(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(INPUT_ELEMENT_COUNT);
        out.extend_from_slice(&self.secret.code().to_values());
        out.extend(self.public.to_field_elements());
        out
    }
}

impl fmt::Debug for CircuitInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitInputs")
            .field("secret", &self.secret)
            .field("public", &self.public)
            .finish()
    }
}

/// Number of u32 elements a schema flattens to.
pub fn schema_element_count(schema: &[InputField]) -> usize {
    schema
        .iter()
        .map(|f| match f.ty {
            FieldType::U32 => f.len,
            FieldType::Bytes32 => f.len * 8,
        })
        .sum()
}

fn digest_words(digest: &Digest32) -> [u32; 8] {
    let mut words = [0u32; 8];
    for (i, chunk) in digest.chunks_exact(4).enumerate() {
        words[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}
