#![forbid(unsafe_code)]

//! Ekeby: the reference-processing and verification core of XML-DSig.
//!
//! This crate only re-exports the workspace crates; start with
//! [`dsig::DsigContext`] and [`dsig::verify`].

pub use ekeby_c14n as c14n;
pub use ekeby_core as core;
pub use ekeby_crypto as crypto;
pub use ekeby_dsig as dsig;
pub use ekeby_keys as keys;
pub use ekeby_resolver as resolver;
pub use ekeby_transforms as transforms;
pub use ekeby_xml as xml;

pub use ekeby_core::{Error, Result};
pub use ekeby_dsig::{verify, DsigContext, VerifyResult};
