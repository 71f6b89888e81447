#![forbid(unsafe_code)]

//! Core types shared by every Ekeby crate: algorithm URIs, namespace and
//! element names, and the common [`Error`] type.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
