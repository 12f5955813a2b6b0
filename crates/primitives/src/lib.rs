//! Primitive types for upgrading an EOA into a smart wallet and classifying its on-chain state.
//!
//! Everything in this crate is pure: commitments are built and hashed, delegation code and
//! owner-set storage words are decoded, and signatures are packed, without any I/O.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod commitment;
pub mod delegation;
pub mod issues;
pub mod owner;
pub mod signature;
pub mod step;
pub mod webauthn;

pub use commitment::{InitializationCommitment, SetImplementationCommitment, replay_safe_hash};
pub use delegation::{DelegateCode, DelegateMismatch, DelegationDesignation};
pub use issues::IssueVector;
pub use owner::{OwnerBytesError, OwnerCredential, OwnerSetLayout, StoredBytes};
pub use signature::{pack_ecdsa, wrap_owner_signature};
pub use step::{StepLog, VerificationStep};
pub use webauthn::{WebAuthnAssertion, WebAuthnError};
