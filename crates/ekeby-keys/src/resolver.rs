#![forbid(unsafe_code)]

//! Key resolvers: map a `<KeyInfo>` child element to key material.
//!
//! Each [`KeyResolver`] either produces a result, abstains with `Ok(None)`,
//! or fails. The [`KeyResolverChain`] tries strategies in registration
//! order, moves on when one abstains and stops at the first result or the
//! first failure.

use crate::key::PublicKey;
use crate::keyinfo::{KeyValue, X509Data};
use crate::storage::StorageResolver;
use crate::x509::X509Certificate;
use ekeby_core::{ns, Error};
use ekeby_xml::document::is_element;
use roxmltree::Node;
use std::sync::Arc;

/// One way of turning a KeyInfo child into a key.
///
/// `storage`, when given, is positioned at its first certificate.
pub trait KeyResolver: Send + Sync {
    /// Short name for logs and errors.
    fn name(&self) -> &'static str;

    fn resolve_certificate(
        &self,
        _element: Node<'_, '_>,
        _base_uri: Option<&str>,
        _storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<X509Certificate>, Error> {
        Ok(None)
    }

    /// Defaults to the public key of [`Self::resolve_certificate`]'s result.
    fn resolve_public_key(
        &self,
        element: Node<'_, '_>,
        base_uri: Option<&str>,
        storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<PublicKey>, Error> {
        self.resolve_certificate(element, base_uri, storage)?
            .map(|cert| cert.public_key())
            .transpose()
    }

    fn resolve_secret_key(
        &self,
        _element: Node<'_, '_>,
        _base_uri: Option<&str>,
        _storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<Vec<u8>>, Error> {
        Ok(None)
    }
}

// ── Chain ────────────────────────────────────────────────────────────

/// Key resolver strategies tried in registration order.
#[derive(Clone)]
pub struct KeyResolverChain {
    resolvers: Vec<Arc<dyn KeyResolver>>,
}

impl KeyResolverChain {
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Issuer/serial, embedded certificate, `RSAKeyValue` and `DSAKeyValue`.
    pub fn new() -> Self {
        let mut chain = Self::empty();
        chain.push(Arc::new(X509IssuerSerialResolver));
        chain.push(Arc::new(X509CertificateResolver));
        chain.push(Arc::new(RsaKeyValueResolver));
        chain.push(Arc::new(DsaKeyValueResolver));
        chain
    }

    pub fn push(&mut self, resolver: Arc<dyn KeyResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn resolve_public_key(
        &self,
        element: Node<'_, '_>,
        base_uri: Option<&str>,
        storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<PublicKey>, Error> {
        self.first(element, storage, |r, s| r.resolve_public_key(element, base_uri, s))
    }

    pub fn resolve_certificate(
        &self,
        element: Node<'_, '_>,
        base_uri: Option<&str>,
        storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<X509Certificate>, Error> {
        self.first(element, storage, |r, s| r.resolve_certificate(element, base_uri, s))
    }

    pub fn resolve_secret_key(
        &self,
        element: Node<'_, '_>,
        base_uri: Option<&str>,
        storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<Vec<u8>>, Error> {
        self.first(element, storage, |r, s| r.resolve_secret_key(element, base_uri, s))
    }

    /// Resolve a public key from the children of a whole `<KeyInfo>`
    /// element, in document order.
    pub fn resolve_key_info(
        &self,
        key_info: Node<'_, '_>,
        base_uri: Option<&str>,
        mut storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<PublicKey>, Error> {
        for child in key_info.children().filter(Node::is_element) {
            if let Some(key) = self.resolve_public_key(child, base_uri, storage.as_deref_mut())? {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    fn first<T>(
        &self,
        element: Node<'_, '_>,
        mut storage: Option<&mut StorageResolver<'_>>,
        mut attempt: impl FnMut(&dyn KeyResolver, Option<&mut StorageResolver<'_>>) -> Result<Option<T>, Error>,
    ) -> Result<Option<T>, Error> {
        for resolver in &self.resolvers {
            if let Some(storage) = storage.as_deref_mut() {
                storage.reset();
            }
            match attempt(resolver.as_ref(), storage.as_deref_mut()) {
                Ok(Some(found)) => {
                    tracing::debug!(
                        resolver = resolver.name(),
                        element = element.tag_name().name(),
                        "key resolved"
                    );
                    return Ok(Some(found));
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(resolver = resolver.name(), error = %e, "key resolver failed");
                    return Err(e);
                }
            }
        }
        Ok(None)
    }
}

impl Default for KeyResolverChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

// ── Strategies ───────────────────────────────────────────────────────

/// Looks up `<X509IssuerSerial>` entries in the certificate storage.
pub struct X509IssuerSerialResolver;

impl KeyResolver for X509IssuerSerialResolver {
    fn name(&self) -> &'static str {
        "X509IssuerSerial"
    }

    fn resolve_certificate(
        &self,
        element: Node<'_, '_>,
        _base_uri: Option<&str>,
        storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<X509Certificate>, Error> {
        let Ok(data) = X509Data::parse(element) else {
            return Ok(None);
        };
        if !data.contains_issuer_serial() {
            return Ok(None);
        }
        let Some(storage) = storage else {
            return Err(Error::StorageResolverRequired {
                element: ns::node::X509_ISSUER_SERIAL.into(),
            });
        };

        for cert in storage {
            tracing::debug!(
                issuer = cert.issuer_name(),
                serial = cert.serial_number(),
                "candidate certificate"
            );
            for entry in &data.issuer_serials {
                if cert.matches_issuer_serial(&entry.issuer_name, &entry.serial_number) {
                    tracing::debug!(issuer = %entry.issuer_name, serial = %entry.serial_number, "match");
                    return Ok(Some(cert.clone()));
                }
                tracing::debug!(issuer = %entry.issuer_name, serial = %entry.serial_number, "no match");
            }
        }
        Ok(None)
    }
}

/// Uses a certificate embedded in `<X509Data>`.
pub struct X509CertificateResolver;

impl KeyResolver for X509CertificateResolver {
    fn name(&self) -> &'static str {
        "X509Certificate"
    }

    fn resolve_certificate(
        &self,
        element: Node<'_, '_>,
        _base_uri: Option<&str>,
        _storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<X509Certificate>, Error> {
        let Ok(data) = X509Data::parse(element) else {
            return Ok(None);
        };
        let certs = data.parsed_certificates().map_err(|e| Error::KeyResolution {
            resolver: self.name(),
            message: e.to_string(),
        })?;
        Ok(leaf_certificate(certs))
    }
}

/// The certificate that issued none of the others; the first one when
/// that does not single one out.
fn leaf_certificate(mut certs: Vec<X509Certificate>) -> Option<X509Certificate> {
    if certs.len() <= 1 {
        return certs.pop();
    }
    let leaves: Vec<usize> = (0..certs.len())
        .filter(|&i| {
            !certs
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && other.issuer_name() == certs[i].subject_name())
        })
        .collect();
    let index = match leaves.as_slice() {
        [only] => *only,
        _ => 0,
    };
    Some(certs.swap_remove(index))
}

/// Builds an RSA key from `<KeyValue><RSAKeyValue>`.
pub struct RsaKeyValueResolver;

impl KeyResolver for RsaKeyValueResolver {
    fn name(&self) -> &'static str {
        "RSAKeyValue"
    }

    fn resolve_public_key(
        &self,
        element: Node<'_, '_>,
        _base_uri: Option<&str>,
        _storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<PublicKey>, Error> {
        key_value(self.name(), element, ns::node::RSA_KEY_VALUE)
    }
}

/// Builds a DSA key from `<KeyValue><DSAKeyValue>`.
pub struct DsaKeyValueResolver;

impl KeyResolver for DsaKeyValueResolver {
    fn name(&self) -> &'static str {
        "DSAKeyValue"
    }

    fn resolve_public_key(
        &self,
        element: Node<'_, '_>,
        _base_uri: Option<&str>,
        _storage: Option<&mut StorageResolver<'_>>,
    ) -> Result<Option<PublicKey>, Error> {
        key_value(self.name(), element, ns::node::DSA_KEY_VALUE)
    }
}

fn key_value(
    resolver: &'static str,
    element: Node<'_, '_>,
    inner: &str,
) -> Result<Option<PublicKey>, Error> {
    let claimed = is_element(element, ns::DSIG, inner)
        || (is_element(element, ns::DSIG, ns::node::KEY_VALUE)
            && element.children().any(|c| is_element(c, ns::DSIG, inner)));
    if !claimed {
        return Ok(None);
    }
    KeyValue::parse(element)
        .and_then(|kv| kv.to_public_key())
        .map(Some)
        .map_err(|e| Error::KeyResolution {
            resolver,
            message: e.to_string(),
        })
}
