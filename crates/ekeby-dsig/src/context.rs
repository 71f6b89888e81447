#![forbid(unsafe_code)]

//! DSig context: the strategies and settings used by signature processing.

use ekeby_keys::{CertificateSource, KeyResolverChain, StorageResolver};
use ekeby_resolver::ResourceResolverChain;
use ekeby_transforms::TransformRegistry;
use ekeby_xml::IdAttributes;
use std::sync::Arc;

/// Configuration for XML-DSig processing.
///
/// Build once, then share by reference; nothing in here is mutated while
/// references are processed, so one context can serve parallel tasks.
#[derive(Clone)]
pub struct DsigContext {
    /// Reference URI resolvers, tried in order.
    pub resolvers: ResourceResolverChain,
    /// Transforms, canonicalizers and the XPath evaluator.
    pub transforms: TransformRegistry,
    /// KeyInfo resolvers, tried in order.
    pub key_resolvers: KeyResolverChain,
    /// Reject identifiers declared more than once. On by default.
    pub secure_validation: bool,
    /// Attribute names that declare element identifiers.
    pub id_attrs: IdAttributes,
    /// Prefixed to reference URIs to label resolved content.
    pub base_uri: Option<String>,
    certificates: Vec<Arc<dyn CertificateSource>>,
}

impl DsigContext {
    /// A context with the default strategies and secure validation on.
    pub fn new() -> Self {
        Self {
            resolvers: ResourceResolverChain::new(),
            transforms: TransformRegistry::new(),
            key_resolvers: KeyResolverChain::new(),
            secure_validation: true,
            id_attrs: IdAttributes::new(),
            base_uri: None,
            certificates: Vec::new(),
        }
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Register an additional ID attribute name.
    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name);
    }

    /// Add a certificate source for issuer/serial key lookups.
    pub fn add_certificate_source(&mut self, source: Arc<dyn CertificateSource>) {
        self.certificates.push(source);
    }

    /// A fresh storage cursor over the registered certificate sources.
    pub fn storage(&self) -> Option<StorageResolver<'_>> {
        if self.certificates.is_empty() {
            return None;
        }
        let mut storage = StorageResolver::new();
        for source in &self.certificates {
            storage.add(source.as_ref());
        }
        Some(storage)
    }
}

impl Default for DsigContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DsigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DsigContext")
            .field("resolvers", &self.resolvers)
            .field("transforms", &self.transforms)
            .field("key_resolvers", &self.key_resolvers)
            .field("secure_validation", &self.secure_validation)
            .field("id_attrs", &self.id_attrs)
            .field("base_uri", &self.base_uri)
            .field(
                "certificates",
                &self.certificates.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekeby_keys::CertificateCollection;

    #[test]
    fn test_defaults() {
        let ctx = DsigContext::new();
        assert!(ctx.secure_validation);
        assert_eq!(ctx.resolvers.len(), 2);
        assert_eq!(ctx.key_resolvers.len(), 4);
        assert!(ctx.storage().is_none());
    }

    #[test]
    fn test_extra_id_attribute() {
        let mut ctx = DsigContext::new().with_base_uri("urn:base");
        ctx.add_id_attr("wsuId");
        assert_eq!(ctx.base_uri.as_deref(), Some("urn:base"));
        let doc = roxmltree::Document::parse(r#"<a><b wsuId="x"/></a>"#).unwrap();
        assert_eq!(ctx.id_attrs.elements_with_id(doc.root_element(), "x").len(), 1);
    }

    #[test]
    fn test_storage_cursor_per_call() {
        let mut ctx = DsigContext::new();
        ctx.add_certificate_source(Arc::new(CertificateCollection::new("empty")));
        let storage = ctx.storage().unwrap();
        assert!(!storage.has_next());
    }
}
