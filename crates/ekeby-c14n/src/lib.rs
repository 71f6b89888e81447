#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for the Ekeby XML signature core.
//!
//! Canonicalizers are looked up by algorithm URI through a
//! [`CanonicalizerRegistry`]. The built-in [`InclusiveCanonicalizer`] covers
//! Canonical XML 1.0 and 1.1, each with and without comments; other
//! algorithms can be registered by the embedding system.

pub mod escape;
pub mod inclusive;
pub mod render;

pub use inclusive::{C14nVersion, InclusiveCanonicalizer};

use ekeby_core::Error;
use ekeby_xml::{NodeSetData, SignatureInput};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// A canonicalization algorithm.
pub trait Canonicalizer: Send + Sync {
    /// The algorithm URI.
    fn uri(&self) -> &str;

    /// Write the canonical form of a (possibly filtered) node-set.
    fn canonicalize_nodes<'a>(
        &self,
        nodes: &NodeSetData<'a>,
        out: &mut dyn Write,
    ) -> Result<(), Error>;

    /// Parse `data` as a document and write its canonical form.
    fn canonicalize_octets(&self, data: &[u8], out: &mut dyn Write) -> Result<(), Error> {
        let text = ekeby_xml::octets_as_text(data)?;
        let doc = ekeby_xml::parse(text)?;
        let input = SignatureInput::from_document(&doc, false);
        match input.node_set() {
            Some(nodes) => self.canonicalize_nodes(nodes, out),
            None => Ok(()),
        }
    }
}

/// Canonicalizers keyed by algorithm URI.
#[derive(Clone)]
pub struct CanonicalizerRegistry {
    by_uri: HashMap<String, Arc<dyn Canonicalizer>>,
}

impl CanonicalizerRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            by_uri: HashMap::new(),
        }
    }

    /// A registry with the inclusive C14N 1.0/1.1 variants.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for c in InclusiveCanonicalizer::all() {
            registry.register(Arc::new(c));
        }
        registry
    }

    /// Register (or replace) the canonicalizer for its URI.
    pub fn register(&mut self, canonicalizer: Arc<dyn Canonicalizer>) {
        self.by_uri
            .insert(canonicalizer.uri().to_owned(), canonicalizer);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.by_uri.contains_key(uri)
    }

    pub fn get(&self, uri: &str) -> Result<Arc<dyn Canonicalizer>, Error> {
        self.by_uri
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("canonicalization: {uri}")))
    }
}

impl Default for CanonicalizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CanonicalizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut uris: Vec<_> = self.by_uri.keys().collect();
        uris.sort();
        f.debug_struct("CanonicalizerRegistry")
            .field("uris", &uris)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekeby_core::algorithm;

    #[test]
    fn test_default_registry() {
        let registry = CanonicalizerRegistry::new();
        for uri in [
            algorithm::C14N,
            algorithm::C14N_WITH_COMMENTS,
            algorithm::C14N11,
            algorithm::C14N11_WITH_COMMENTS,
        ] {
            assert_eq!(registry.get(uri).unwrap().uri(), uri);
        }
        let exclusive = "http://www.w3.org/2001/10/xml-exc-c14n#";
        assert!(!registry.contains(exclusive));
        assert!(matches!(
            registry.get(exclusive),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
