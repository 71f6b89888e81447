#![forbid(unsafe_code)]

//! Transform factories keyed by algorithm URI.

use crate::base64_transform::Base64DecodeTransform;
use crate::enveloped::EnvelopedSignatureTransform;
use crate::pipeline::{CanonicalizationTransform, Transform, TransformPipeline};
use crate::xpath_filter::XPathFilterTransform;
use ekeby_c14n::CanonicalizerRegistry;
use ekeby_core::{algorithm, ns, Error};
use ekeby_xml::document::{child_elements, is_element};
use ekeby_xml::{BasicXPathEvaluator, XPathEvaluator};
use roxmltree::Node;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a transform from its `<Transform>` element.
pub trait TransformFactory: Send + Sync {
    fn uri(&self) -> &str;

    /// `descriptor` is the `<Transform>` element, when there is one.
    fn create<'d>(
        &self,
        descriptor: Option<Node<'d, 'd>>,
        registry: &TransformRegistry,
    ) -> Result<Box<dyn Transform<'d> + 'd>, Error>;
}

/// Every known transform, plus the canonicalizers and XPath evaluator
/// they delegate to. Built once and shared by reference.
#[derive(Clone)]
pub struct TransformRegistry {
    canonicalizers: CanonicalizerRegistry,
    xpath: Arc<dyn XPathEvaluator>,
    factories: HashMap<String, Arc<dyn TransformFactory>>,
}

impl TransformRegistry {
    /// Registry with the inclusive canonicalizers, XPath filtering,
    /// enveloped signature and Base64 decoding.
    pub fn new() -> Self {
        let mut registry = Self {
            canonicalizers: CanonicalizerRegistry::new(),
            xpath: Arc::new(BasicXPathEvaluator),
            factories: HashMap::new(),
        };
        registry.register(Arc::new(XPathFactory));
        registry.register(Arc::new(EnvelopedFactory));
        registry.register(Arc::new(Base64Factory));
        registry
    }

    pub fn register(&mut self, factory: Arc<dyn TransformFactory>) {
        self.factories.insert(factory.uri().to_owned(), factory);
    }

    pub fn canonicalizers(&self) -> &CanonicalizerRegistry {
        &self.canonicalizers
    }

    pub fn canonicalizers_mut(&mut self) -> &mut CanonicalizerRegistry {
        &mut self.canonicalizers
    }

    pub fn xpath_evaluator(&self) -> Arc<dyn XPathEvaluator> {
        Arc::clone(&self.xpath)
    }

    /// Replace the XPath evaluator used by filter transforms.
    pub fn set_xpath_evaluator(&mut self, evaluator: Arc<dyn XPathEvaluator>) {
        self.xpath = evaluator;
    }

    /// Create the transform for `uri`. Every registered canonicalizer is
    /// usable as a transform.
    pub fn create<'d>(
        &self,
        uri: &str,
        descriptor: Option<Node<'d, 'd>>,
    ) -> Result<Box<dyn Transform<'d> + 'd>, Error> {
        if self.canonicalizers.contains(uri) {
            let c14n = self.canonicalizers.get(uri)?;
            return Ok(Box::new(CanonicalizationTransform::new(c14n)));
        }
        match self.factories.get(uri) {
            Some(factory) => factory.create(descriptor, self),
            None => Err(Error::transformation(
                "signature.Transform.UnknownTransform",
                format!("unknown transform algorithm: {uri}"),
            )),
        }
    }

    /// Build the pipeline described by a `<Transforms>` element.
    pub fn build_pipeline<'d>(
        &self,
        transforms: Option<Node<'d, 'd>>,
    ) -> Result<TransformPipeline<'d>, Error> {
        let mut pipeline = TransformPipeline::new();
        let Some(transforms) = transforms else {
            return Ok(pipeline);
        };
        for node in child_elements(transforms, ns::DSIG, ns::node::TRANSFORM) {
            let uri = node.attribute(ns::attr::ALGORITHM).ok_or_else(|| {
                Error::MissingAttribute(format!(
                    "{} on {}",
                    ns::attr::ALGORITHM,
                    ns::node::TRANSFORM
                ))
            })?;
            pipeline.push(self.create(uri, Some(node))?);
        }
        Ok(pipeline)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut uris: Vec<_> = self.factories.keys().collect();
        uris.sort();
        f.debug_struct("TransformRegistry")
            .field("canonicalizers", &self.canonicalizers)
            .field("factories", &uris)
            .finish()
    }
}

fn descriptor_required<'d>(uri: &str, descriptor: Option<Node<'d, 'd>>) -> Result<Node<'d, 'd>, Error> {
    descriptor.ok_or_else(|| {
        Error::transformation(
            "xml.WrongContent",
            format!("transform {uri} needs its <Transform> element"),
        )
    })
}

struct XPathFactory;

impl TransformFactory for XPathFactory {
    fn uri(&self) -> &str {
        algorithm::XPATH
    }

    fn create<'d>(
        &self,
        descriptor: Option<Node<'d, 'd>>,
        registry: &TransformRegistry,
    ) -> Result<Box<dyn Transform<'d> + 'd>, Error> {
        let descriptor = descriptor_required(self.uri(), descriptor)?;
        Ok(Box::new(XPathFilterTransform::new(
            descriptor,
            registry.xpath_evaluator(),
        )))
    }
}

struct EnvelopedFactory;

impl TransformFactory for EnvelopedFactory {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn create<'d>(
        &self,
        descriptor: Option<Node<'d, 'd>>,
        _registry: &TransformRegistry,
    ) -> Result<Box<dyn Transform<'d> + 'd>, Error> {
        let descriptor = descriptor_required(self.uri(), descriptor)?;
        let signature = descriptor
            .ancestors()
            .find(|a| is_element(*a, ns::DSIG, ns::node::SIGNATURE))
            .ok_or_else(|| {
                Error::transformation(
                    "xml.WrongContent",
                    "enveloped-signature transform outside a <Signature>",
                )
            })?;
        Ok(Box::new(EnvelopedSignatureTransform::new(signature)))
    }
}

struct Base64Factory;

impl TransformFactory for Base64Factory {
    fn uri(&self) -> &str {
        algorithm::BASE64
    }

    fn create<'d>(
        &self,
        _descriptor: Option<Node<'d, 'd>>,
        _registry: &TransformRegistry,
    ) -> Result<Box<dyn Transform<'d> + 'd>, Error> {
        Ok(Box::new(Base64DecodeTransform))
    }
}
