#![forbid(unsafe_code)]

//! Certificate storage consulted by key resolvers.
//!
//! A [`StorageResolver`] is a single-pass cursor over the certificates of
//! one or more [`CertificateSource`]s. Cursors are cheap: hand every
//! resolution attempt (or every parallel task) its own via
//! [`StorageResolver::fork`].

use crate::x509::X509Certificate;
use ekeby_core::Error;

/// Something that holds certificates, such as a trust store.
pub trait CertificateSource: Send + Sync {
    fn name(&self) -> &str;
    fn certificates(&self) -> &[X509Certificate];
}

/// An in-memory list of certificates.
#[derive(Debug, Clone, Default)]
pub struct CertificateCollection {
    name: String,
    certificates: Vec<X509Certificate>,
}

impl CertificateCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            certificates: Vec::new(),
        }
    }

    pub fn push(&mut self, certificate: X509Certificate) {
        self.certificates.push(certificate);
    }

    /// Parse and add a DER certificate.
    pub fn add_der(&mut self, der: &[u8]) -> Result<(), Error> {
        self.push(X509Certificate::from_der(der)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

impl CertificateSource for CertificateCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn certificates(&self) -> &[X509Certificate] {
        &self.certificates
    }
}

/// Cursor over the certificates of several sources, in source order.
#[derive(Clone, Default)]
pub struct StorageResolver<'s> {
    sources: Vec<&'s dyn CertificateSource>,
    source: usize,
    index: usize,
}

impl<'s> StorageResolver<'s> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            source: 0,
            index: 0,
        }
    }

    /// A cursor over a single source.
    pub fn with_source(source: &'s dyn CertificateSource) -> Self {
        let mut storage = Self::new();
        storage.add(source);
        storage
    }

    pub fn add(&mut self, source: &'s dyn CertificateSource) {
        self.sources.push(source);
    }

    /// True while another certificate remains before the end.
    pub fn has_next(&self) -> bool {
        let Some(current) = self.sources.get(self.source) else {
            return false;
        };
        self.index < current.certificates().len()
            || self.sources[self.source + 1..]
                .iter()
                .any(|s| !s.certificates().is_empty())
    }

    /// Rewind to the first certificate.
    pub fn reset(&mut self) {
        self.source = 0;
        self.index = 0;
    }

    /// A fresh cursor over the same sources, positioned at the start.
    pub fn fork(&self) -> Self {
        Self {
            sources: self.sources.clone(),
            source: 0,
            index: 0,
        }
    }
}

impl<'s> Iterator for StorageResolver<'s> {
    type Item = &'s X509Certificate;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(source) = self.sources.get(self.source) {
            if let Some(cert) = source.certificates().get(self.index) {
                self.index += 1;
                return Some(cert);
            }
            self.source += 1;
            self.index = 0;
        }
        None
    }
}

impl std::fmt::Debug for StorageResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageResolver")
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("source", &self.source)
            .field("index", &self.index)
            .finish()
    }
}
