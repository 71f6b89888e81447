#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Removes the `<Signature>` element that contains the transform, and
//! everything under it, from the node-set.

use crate::pipeline::Transform;
use ekeby_core::{algorithm, Error};
use ekeby_xml::{NodeFilter, SignatureInput};
use roxmltree::Node;

/// Excludes the subtree of one `<Signature>` element.
pub struct EnvelopedSignatureTransform<'d> {
    signature: Node<'d, 'd>,
}

impl<'d> EnvelopedSignatureTransform<'d> {
    pub fn new(signature: Node<'d, 'd>) -> Self {
        Self { signature }
    }
}

impl<'d> Transform<'d> for EnvelopedSignatureTransform<'d> {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn apply<'a>(&self, mut input: SignatureInput<'a>) -> Result<SignatureInput<'a>, Error>
    where
        'd: 'a,
    {
        let Some(nodes) = input.node_set_mut() else {
            return Err(Error::transformation(
                "transform.NodeSetRequired",
                "enveloped-signature transform requires node-set input",
            ));
        };
        nodes.add_filter(Box::new(SubtreeExclusion {
            excluded: self.signature,
        }));
        Ok(input)
    }
}

/// Rejects every node at or below `excluded`.
pub struct SubtreeExclusion<'d> {
    pub excluded: Node<'d, 'd>,
}

impl<'a, 'd: 'a> NodeFilter<'a> for SubtreeExclusion<'d> {
    fn include(&self, node: Node<'a, 'a>) -> Result<bool, Error> {
        if !std::ptr::eq(node.document(), self.excluded.document()) {
            return Ok(true);
        }
        let excluded = self.excluded.id();
        Ok(!node.ancestors().any(|a| a.id() == excluded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekeby_c14n::{C14nVersion, Canonicalizer, InclusiveCanonicalizer};

    #[test]
    fn test_signature_subtree_removed() {
        let xml = r#"<doc><data>v</data><Signature><SignedInfo/></Signature></doc>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let sig = doc
            .descendants()
            .find(|n| n.has_tag_name("Signature"))
            .unwrap();

        let out = EnvelopedSignatureTransform::new(sig)
            .apply(SignatureInput::from_document(&doc, true))
            .unwrap();

        let mut bytes = Vec::new();
        InclusiveCanonicalizer::new(C14nVersion::V10, false)
            .canonicalize_nodes(out.node_set().unwrap(), &mut bytes)
            .unwrap();
        assert_eq!(bytes, b"<doc><data>v</data></doc>");
    }

    #[test]
    fn test_octets_rejected() {
        let doc = roxmltree::Document::parse("<Signature/>").unwrap();
        let t = EnvelopedSignatureTransform::new(doc.root_element());
        let err = t
            .apply(SignatureInput::from_octets(b"<a/>".to_vec()))
            .unwrap_err();
        assert_eq!(err.message_key(), "transform.NodeSetRequired");
    }

    #[test]
    fn test_other_documents_untouched() {
        let sig_doc = roxmltree::Document::parse("<Signature/>").unwrap();
        let other = roxmltree::Document::parse("<Signature/>").unwrap();
        let filter = SubtreeExclusion {
            excluded: sig_doc.root_element(),
        };
        assert!(filter.include(other.root_element()).unwrap());
        assert!(!filter.include(sig_doc.root_element()).unwrap());
    }
}
