//! Proof System
//!
//! Binds the CodeMaker to the secret and to honest feedback:
//! - Secret commitment (pinned digest)
//! - Circuit input record and schema
//! - Proving backend boundary and a clear-text stub
//! - Proof pipeline producing the stored proof hash
//! - CodeBreaker-side verification of received proofs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commitment.rs - commit / open over the pinned digest       │
//! │  inputs.rs     - circuit input record, pinned schema        │
//! │  artifact.rs   - tagged ProofHash, proof artifacts          │
//! │  backend.rs    - ProvingBackend trait                       │
//! │  stub.rs       - clear-text reference backend               │
//! │  pipeline.rs   - prepare_and_prove, lazy backend ownership  │
//! │  verify.rs     - opponent-side proof check                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod inputs;
pub mod artifact;
pub mod backend;
pub mod stub;
pub mod pipeline;
pub mod verify;

// Re-export key types
pub use commitment::{commit, open, Commitment, COMMITMENT_DOMAIN};
pub use inputs::{CircuitInputs, FieldType, InputField, PublicInputs, CIRCUIT_SCHEMA};
pub use artifact::{ProofArtifact, ProofHash, ProofHashError, ProofHashKind, PROOF_HASH_LEN};
pub use backend::{BackendError, OracleHash, ProvingBackend, Witness};
pub use stub::{StubBackend, StubConfig, StubCounters};
pub use pipeline::{ProofError, ProofFallback, ProofPipeline};
pub use verify::{verify_record, VerificationError};
