#![forbid(unsafe_code)]

//! Digest (hash) algorithm implementations.

use ekeby_core::{algorithm, Error};
use digest::Digest;
use std::io::{self, Write};

/// Trait for digest algorithms.
pub trait DigestAlgorithm: Send {
    /// Feed data into the hash.
    fn update(&mut self, data: &[u8]);
    /// Finalize and return the hash value.
    fn finalize(self: Box<Self>) -> Vec<u8>;
    /// Algorithm URI.
    fn uri(&self) -> &'static str;
}

/// Create a digest algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
    match uri {
        algorithm::SHA1 => Ok(Box::new(Sha1Digest::new())),
        algorithm::SHA224 => Ok(Box::new(Sha224Digest::new())),
        algorithm::SHA256 => Ok(Box::new(Sha256Digest::new())),
        algorithm::SHA384 => Ok(Box::new(Sha384Digest::new())),
        algorithm::SHA512 => Ok(Box::new(Sha512Digest::new())),
        _ => Err(Error::UnsupportedAlgorithm(format!(
            "digest algorithm: {uri}"
        ))),
    }
}

/// Compute a digest in one shot.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut hasher = from_uri(uri)?;
    hasher.update(data);
    Ok(hasher.finalize())
}

// ── Streaming sink ───────────────────────────────────────────────────

/// An [`io::Write`] sink that hashes everything written to it.
///
/// Canonicalizers write straight into this, so the canonical form of a
/// reference never has to be held in memory. At `trace` level the bytes
/// are also collected and logged when the digest is finalized.
pub struct DigestWriter {
    hasher: Box<dyn DigestAlgorithm>,
    written: u64,
    trace: Option<Vec<u8>>,
}

impl DigestWriter {
    pub fn new(uri: &str) -> Result<Self, Error> {
        let trace = tracing::enabled!(tracing::Level::TRACE).then(Vec::new);
        Ok(Self {
            hasher: from_uri(uri)?,
            written: 0,
            trace,
        })
    }

    pub fn uri(&self) -> &'static str {
        self.hasher.uri()
    }

    /// Number of bytes hashed so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn finalize(self) -> Vec<u8> {
        if let Some(trace) = &self.trace {
            tracing::trace!(
                algorithm = self.hasher.uri(),
                input = %String::from_utf8_lossy(trace),
                "pre-digest input"
            );
        }
        self.hasher.finalize()
    }
}

impl Write for DigestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hasher.update(buf);
        self.written += buf.len() as u64;
        if let Some(trace) = &mut self.trace {
            trace.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for DigestWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestWriter")
            .field("algorithm", &self.hasher.uri())
            .field("written", &self.written)
            .finish()
    }
}

// ── Concrete implementations ─────────────────────────────────────────

macro_rules! impl_digest {
    ($name:ident, $hasher:ty, $uri:expr) => {
        struct $name {
            inner: $hasher,
        }

        impl $name {
            fn new() -> Self {
                Self {
                    inner: <$hasher>::new(),
                }
            }
        }

        impl DigestAlgorithm for $name {
            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.inner, data);
            }

            fn finalize(self: Box<Self>) -> Vec<u8> {
                Digest::finalize(self.inner).to_vec()
            }

            fn uri(&self) -> &'static str {
                $uri
            }
        }
    };
}

impl_digest!(Sha1Digest, sha1::Sha1, algorithm::SHA1);
impl_digest!(Sha224Digest, sha2::Sha224, algorithm::SHA224);
impl_digest!(Sha256Digest, sha2::Sha256, algorithm::SHA256);
impl_digest!(Sha384Digest, sha2::Sha384, algorithm::SHA384);
impl_digest!(Sha512Digest, sha2::Sha512, algorithm::SHA512);
