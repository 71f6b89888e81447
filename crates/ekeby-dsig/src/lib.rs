#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) reference processing and verification.
//!
//! A [`DsigContext`] is built once and shared by reference. The
//! [`ReferenceProcessor`] runs one `<Reference>` through
//! resolve → transform → digest, and [`verify`] checks a whole
//! `<Signature>` on top of it.

pub mod context;
pub mod processor;
pub mod reference;
pub mod verify;

pub use context::DsigContext;
pub use processor::ReferenceProcessor;
pub use reference::Reference;
pub use verify::{verify, verify_signature, verify_with_key, VerifyResult};
