#![forbid(unsafe_code)]

//! The `<Reference>` element: what was digested and how.

use base64::Engine;
use ekeby_core::{ns, Error};
use ekeby_transforms::{TransformPipeline, TransformRegistry};
use ekeby_xml::document::{element_text, find_child_element};
use roxmltree::Node;

/// One reference of a signature.
pub struct Reference<'d> {
    /// The raw `URI` attribute; `None` when absent.
    pub uri: Option<String>,
    pub ref_type: Option<String>,
    pub id: Option<String>,
    pub transforms: TransformPipeline<'d>,
    pub digest_method: String,
    /// Expected digest; absent on a reference being produced.
    pub digest_value: Option<Vec<u8>>,
}

impl<'d> Reference<'d> {
    /// A reference with no transforms.
    pub fn new(uri: impl Into<String>, digest_method: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ref_type: None,
            id: None,
            transforms: TransformPipeline::new(),
            digest_method: digest_method.into(),
            digest_value: None,
        }
    }

    /// Read a `<ds:Reference>` element, building its transforms from
    /// `registry`.
    pub fn parse(element: Node<'d, 'd>, registry: &TransformRegistry) -> Result<Self, Error> {
        let transforms =
            registry.build_pipeline(find_child_element(element, ns::DSIG, ns::node::TRANSFORMS))?;

        let digest_method = find_child_element(element, ns::DSIG, ns::node::DIGEST_METHOD)
            .ok_or_else(|| Error::MissingElement(ns::node::DIGEST_METHOD.into()))?
            .attribute(ns::attr::ALGORITHM)
            .ok_or_else(|| Error::MissingAttribute(format!("Algorithm on {}", ns::node::DIGEST_METHOD)))?;

        let digest_value = find_child_element(element, ns::DSIG, ns::node::DIGEST_VALUE)
            .map(|node| decode_base64(&element_text(node), ns::node::DIGEST_VALUE))
            .transpose()?;

        Ok(Self {
            uri: element.attribute(ns::attr::URI).map(str::to_owned),
            ref_type: element.attribute(ns::attr::TYPE).map(str::to_owned),
            id: element.attribute(ns::attr::ID).map(str::to_owned),
            transforms,
            digest_method: digest_method.to_owned(),
            digest_value,
        })
    }
}

impl std::fmt::Debug for Reference<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reference")
            .field("uri", &self.uri)
            .field("ref_type", &self.ref_type)
            .field("transforms", &self.transforms.uris())
            .field("digest_method", &self.digest_method)
            .finish()
    }
}

pub(crate) fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}
