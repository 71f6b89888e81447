#![forbid(unsafe_code)]

//! Cryptographic algorithms for the Ekeby XML signature core.
//!
//! Provides digest algorithms with a streaming [`DigestWriter`] sink, the
//! [`SignatureCodec`] between ASN.1 `SEQUENCE { r, s }` and the fixed-width
//! XML-DSig encoding, and the DSA, ECDSA and RSA signature algorithms.

pub mod codec;
pub mod digest;
pub mod sign;

pub use codec::{decode_asn1_to_fixed, encode_fixed_to_asn1, SignatureCodec};
pub use digest::{DigestAlgorithm, DigestWriter};
pub use sign::{SignatureAlgorithm, SigningKey};
