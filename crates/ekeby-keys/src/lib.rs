#![forbid(unsafe_code)]

//! Key management for the Ekeby XML signature core.
//!
//! Parses `<KeyInfo>` children into [`KeyInfoContent`], holds X.509
//! certificates in [`CertificateSource`]s walked by a resettable
//! [`StorageResolver`] cursor, and maps KeyInfo descriptors to keys through
//! the [`KeyResolverChain`].

pub mod key;
pub mod keyinfo;
pub mod resolver;
pub mod storage;
pub mod x509;

pub use key::PublicKey;
pub use keyinfo::{IssuerSerial, KeyInfoContent, KeyValue, RetrievalMethod, X509Data};
pub use resolver::{KeyResolver, KeyResolverChain};
pub use storage::{CertificateCollection, CertificateSource, StorageResolver};
pub use x509::X509Certificate;
