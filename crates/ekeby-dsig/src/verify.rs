#![forbid(unsafe_code)]

//! XML-DSig signature verification.
//!
//! Processing order:
//! 1. Read `<SignedInfo>`: CanonicalizationMethod, SignatureMethod
//! 2. For each `<Reference>`: resolve URI, run transforms, digest, compare
//! 3. Resolve the verification key from `<KeyInfo>` (unless one is given)
//! 4. Canonicalize `<SignedInfo>`
//! 5. Verify `<SignatureValue>`

use crate::context::DsigContext;
use crate::processor::ReferenceProcessor;
use crate::reference::{decode_base64, Reference};
use ekeby_core::{ns, Error};
use ekeby_keys::PublicKey;
use ekeby_xml::document::{child_elements, element_text, find_child_element, find_element};
use ekeby_xml::SignatureInput;
use roxmltree::{Document, Node};

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Every reference digest and the signature value check out.
    Valid,
    /// The signature is well formed but does not verify.
    Invalid { reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }
}

/// Verify the first `<Signature>` of a document, taking the key from its
/// `<KeyInfo>`.
pub fn verify(ctx: &DsigContext, xml: &str) -> Result<VerifyResult, Error> {
    let doc = ekeby_xml::parse(xml)?;
    let signature = signature_element(&doc)?;
    verify_signature(ctx, &doc, signature, None)
}

/// Verify the first `<Signature>` of a document with a known key.
pub fn verify_with_key(
    ctx: &DsigContext,
    xml: &str,
    key: &PublicKey,
) -> Result<VerifyResult, Error> {
    let doc = ekeby_xml::parse(xml)?;
    let signature = signature_element(&doc)?;
    verify_signature(ctx, &doc, signature, Some(key))
}

/// Verify one `<Signature>` element of an already parsed document.
pub fn verify_signature<'d>(
    ctx: &DsigContext,
    doc: &'d Document<'d>,
    signature: Node<'d, 'd>,
    key: Option<&PublicKey>,
) -> Result<VerifyResult, Error> {
    let signed_info = find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNED_INFO.into()))?;

    let c14n_uri = algorithm_of(signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let canonicalizer = ctx.transforms.canonicalizers().get(c14n_uri)?;
    let sig_method = ekeby_crypto::sign::from_uri(algorithm_of(
        signed_info,
        ns::node::SIGNATURE_METHOD,
    )?)?;

    let references = child_elements(signed_info, ns::DSIG, ns::node::REFERENCE);
    if references.is_empty() {
        return Err(Error::MissingElement(ns::node::REFERENCE.into()));
    }
    let processor = ReferenceProcessor::new(ctx);
    for element in references {
        let reference = Reference::parse(element, &ctx.transforms)?;
        if !processor.verify(doc, &reference)? {
            let uri = reference.uri.unwrap_or_default();
            tracing::debug!(uri = %uri, "reference digest mismatch");
            return Ok(VerifyResult::Invalid {
                reason: format!("digest mismatch for reference {uri:?}"),
            });
        }
    }

    let resolved;
    let key = match key {
        Some(key) => key,
        None => {
            let key_info = find_child_element(signature, ns::DSIG, ns::node::KEY_INFO)
                .ok_or_else(|| Error::Key("no key supplied and no KeyInfo present".into()))?;
            resolved = ctx
                .key_resolvers
                .resolve_key_info(key_info, ctx.base_uri.as_deref(), ctx.storage().as_mut())?
                .ok_or_else(|| Error::Key("KeyInfo did not yield a verification key".into()))?;
            &resolved
        }
    };
    tracing::debug!(key = key.kind(), algorithm = sig_method.uri(), "verifying signature value");

    let mut signed_bytes = Vec::new();
    let input = SignatureInput::from_subtree(doc, signed_info, false);
    if let Some(nodes) = input.node_set() {
        canonicalizer.canonicalize_nodes(nodes, &mut signed_bytes)?;
    }

    let value_node = find_child_element(signature, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE_VALUE.into()))?;
    let value = decode_base64(&element_text(value_node), ns::node::SIGNATURE_VALUE)?;

    if sig_method.verify(&key.to_signing_key(), &signed_bytes, &value)? {
        Ok(VerifyResult::Valid)
    } else {
        Ok(VerifyResult::Invalid {
            reason: "signature value verification failed".into(),
        })
    }
}

fn signature_element<'a>(doc: &'a Document<'a>) -> Result<Node<'a, 'a>, Error> {
    find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE.into()))
}

fn algorithm_of<'a>(parent: Node<'a, 'a>, name: &str) -> Result<&'a str, Error> {
    find_child_element(parent, ns::DSIG, name)
        .ok_or_else(|| Error::MissingElement(name.into()))?
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute(format!("{} on {name}", ns::attr::ALGORITHM)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signature_element() {
        let err = verify(&DsigContext::new(), "<doc/>").unwrap_err();
        assert!(matches!(err, Error::MissingElement(ref e) if e == "Signature"));
    }

    #[test]
    fn test_unknown_signature_method() {
        let xml = format!(
            r#"<ds:Signature xmlns:ds="{}"><ds:SignedInfo>
<ds:CanonicalizationMethod Algorithm="{}"/>
<ds:SignatureMethod Algorithm="urn:unknown"/>
</ds:SignedInfo></ds:Signature>"#,
            ns::DSIG,
            ekeby_core::algorithm::C14N
        );
        let err = verify(&DsigContext::new(), &xml).unwrap_err();
        assert_eq!(err.message_key(), "algorithms.NoSuchAlgorithm");
    }

    #[test]
    fn test_is_valid() {
        assert!(VerifyResult::Valid.is_valid());
        assert!(!VerifyResult::Invalid { reason: "x".into() }.is_valid());
    }
}
