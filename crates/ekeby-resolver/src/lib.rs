#![forbid(unsafe_code)]

//! Reference URI resolution for the Ekeby XML signature core.
//!
//! A [`ResourceResolverChain`] holds resolver strategies in registration
//! order. The first strategy that claims a URI dereferences it into a
//! [`SignatureInput`]; if none claims it the chain fails with
//! [`Error::NoResolverAvailable`].
//!
//! Same-document lookups by identifier go through the
//! [`AntiWrappingGuard`] when secure validation is on.

pub mod detached;
pub mod fragment;
pub mod guard;
pub mod xpointer;

pub use detached::DetachedContentResolver;
pub use fragment::FragmentResolver;
pub use guard::AntiWrappingGuard;
pub use xpointer::XPointerResolver;

use ekeby_core::Error;
use ekeby_xml::{IdAttributes, SignatureInput};
use roxmltree::{Document, Node};
use std::sync::Arc;

/// Everything a strategy needs to dereference one reference URI.
#[derive(Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// The raw `URI` attribute value.
    pub uri: &'a str,
    pub base_uri: Option<&'a str>,
    /// The document that contains the reference.
    pub document: &'a Document<'a>,
    pub secure_validation: bool,
    pub id_attrs: &'a IdAttributes,
}

impl<'a> ResolveRequest<'a> {
    /// `base_uri` followed by the raw URI, or the raw URI alone.
    pub fn source_uri(&self) -> String {
        match self.base_uri {
            Some(base) if !base.is_empty() => format!("{base}{}", self.uri),
            _ => self.uri.to_owned(),
        }
    }

    /// Find the element declaring `id`, guarding against wrapping when
    /// secure validation is on. Without it the first match in document
    /// order wins.
    pub fn element_by_id(&self, id: &str) -> Result<Node<'a, 'a>, Error> {
        let start = self.document.root_element();
        if self.secure_validation {
            AntiWrappingGuard::new(self.id_attrs).check(start, id)?;
        }
        let found = self
            .id_attrs
            .elements_with_id(start, id)
            .into_iter()
            .next();
        tracing::debug!(id, found = found.is_some(), "identifier lookup");
        found.ok_or_else(|| Error::ReferenceNotFound { id: id.to_owned() })
    }
}

impl std::fmt::Debug for ResolveRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveRequest")
            .field("uri", &self.uri)
            .field("base_uri", &self.base_uri)
            .field("secure_validation", &self.secure_validation)
            .finish()
    }
}

/// One way of dereferencing reference URIs.
pub trait ResourceResolver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn can_resolve(&self, request: &ResolveRequest<'_>) -> bool;

    fn resolve<'a>(&self, request: &ResolveRequest<'a>) -> Result<SignatureInput<'a>, Error>;
}

/// Resolver strategies tried in registration order.
#[derive(Clone)]
pub struct ResourceResolverChain {
    resolvers: Vec<Arc<dyn ResourceResolver>>,
}

impl ResourceResolverChain {
    /// A chain with no strategies.
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// The XPointer and same-document fragment strategies.
    pub fn new() -> Self {
        let mut chain = Self::empty();
        chain.push(Arc::new(XPointerResolver));
        chain.push(Arc::new(FragmentResolver));
        chain
    }

    /// Append a strategy; it is consulted after the existing ones.
    pub fn push(&mut self, resolver: Arc<dyn ResourceResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Dereference with the first strategy that claims the URI. Its result,
    /// success or failure, is final.
    pub fn resolve<'a>(&self, request: &ResolveRequest<'a>) -> Result<SignatureInput<'a>, Error> {
        let resolver = self
            .resolvers
            .iter()
            .find(|r| r.can_resolve(request))
            .ok_or_else(|| Error::NoResolverAvailable {
                uri: request.uri.to_owned(),
            })?;
        tracing::debug!(resolver = resolver.name(), uri = request.uri, "resolving reference");
        resolver.resolve(request)
    }
}

impl Default for ResourceResolverChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(doc: &'a Document<'a>, ids: &'a IdAttributes, uri: &'a str) -> ResolveRequest<'a> {
        ResolveRequest {
            uri,
            base_uri: None,
            document: doc,
            secure_validation: true,
            id_attrs: ids,
        }
    }

    #[test]
    fn test_unclaimed_uri() {
        let doc = roxmltree::Document::parse("<a/>").unwrap();
        let ids = IdAttributes::new();
        let err = ResourceResolverChain::new()
            .resolve(&request(&doc, &ids, "http://example.com/x"))
            .unwrap_err();
        assert!(matches!(err, Error::NoResolverAvailable { ref uri } if uri == "http://example.com/x"));
    }

    #[test]
    fn test_source_uri_label() {
        let doc = roxmltree::Document::parse("<a/>").unwrap();
        let ids = IdAttributes::new();
        let mut req = request(&doc, &ids, "#x");
        assert_eq!(req.source_uri(), "#x");
        req.base_uri = Some("");
        assert_eq!(req.source_uri(), "#x");
        req.base_uri = Some("file:///doc.xml");
        assert_eq!(req.source_uri(), "file:///doc.xml#x");
    }

    #[test]
    fn test_first_claimant_wins() {
        let doc = roxmltree::Document::parse("<a/>").unwrap();
        let ids = IdAttributes::new();
        let mut chain = ResourceResolverChain::empty();
        let mut first = DetachedContentResolver::new();
        first.insert("urn:doc", b"one".to_vec());
        let mut second = DetachedContentResolver::new();
        second.insert("urn:doc", b"two".to_vec());
        chain.push(Arc::new(first));
        chain.push(Arc::new(second));

        let out = chain.resolve(&request(&doc, &ids, "urn:doc")).unwrap();
        assert_eq!(out.octets(), Some(&b"one"[..]));
    }
}
