#![forbid(unsafe_code)]

//! XPath filtering transform (`http://www.w3.org/TR/1999/REC-xpath-19991116`).
//!
//! The expression is read from the `<XPath>` child of the `<Transform>`
//! element when the transform runs. It becomes a node filter that is
//! evaluated during canonicalization, with `here()` bound to the
//! expression's own text node.

use crate::pipeline::Transform;
use ekeby_core::{algorithm, ns, Error};
use ekeby_xml::document::{describe_node, element_text, find_child_element};
use ekeby_xml::{NodeFilter, SignatureInput, XPathEvaluator};
use roxmltree::Node;
use std::sync::Arc;

/// XPath filter transform bound to its `<Transform>` element.
pub struct XPathFilterTransform<'d> {
    descriptor: Node<'d, 'd>,
    evaluator: Arc<dyn XPathEvaluator>,
}

impl<'d> XPathFilterTransform<'d> {
    pub fn new(descriptor: Node<'d, 'd>, evaluator: Arc<dyn XPathEvaluator>) -> Self {
        Self {
            descriptor,
            evaluator,
        }
    }
}

/// True if the expression needs the node-set materialized before
/// canonicalization.
pub fn needs_expansion(expr: &str) -> bool {
    expr.contains("namespace") || expr.contains("name()")
}

impl<'d> Transform<'d> for XPathFilterTransform<'d> {
    fn uri(&self) -> &str {
        algorithm::XPATH
    }

    fn apply<'a>(&self, mut input: SignatureInput<'a>) -> Result<SignatureInput<'a>, Error>
    where
        'd: 'a,
    {
        let xpath = find_child_element(self.descriptor, ns::DSIG, ns::node::XPATH).ok_or_else(
            || {
                Error::transformation(
                    "xml.WrongContent",
                    format!("missing <{}> child in transform", ns::node::XPATH),
                )
            },
        )?;
        let expr = element_text(xpath);
        let here = xpath.first_child().filter(|c| c.is_text()).unwrap_or(xpath);

        let Some(nodes) = input.node_set_mut() else {
            return Err(Error::transformation(
                "transform.NodeSetRequired",
                "XPath filtering requires node-set input",
            ));
        };
        if needs_expansion(&expr) {
            nodes.set_needs_expansion(true);
        }
        tracing::debug!(%expr, expand = nodes.needs_expansion(), "adding XPath filter");
        nodes.add_filter(Box::new(XPathFilter {
            expr,
            here,
            ns_context: xpath,
            evaluator: Arc::clone(&self.evaluator),
        }));
        Ok(input)
    }
}

struct XPathFilter<'d> {
    expr: String,
    here: Node<'d, 'd>,
    ns_context: Node<'d, 'd>,
    evaluator: Arc<dyn XPathEvaluator>,
}

impl<'a, 'd: 'a> NodeFilter<'a> for XPathFilter<'d> {
    fn include(&self, node: Node<'a, 'a>) -> Result<bool, Error> {
        self.evaluator
            .evaluate(node, self.here, &self.expr, self.ns_context)
            .map_err(|e| Error::Transformation {
                key: "signature.Transform.node",
                message: format!("evaluating {:?} failed: {e}", self.expr),
                node: Some(describe_node(node)),
                source: Some(Box::new(e)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekeby_xml::BasicXPathEvaluator;

    fn transform<'d>(doc: &'d roxmltree::Document<'d>) -> XPathFilterTransform<'d> {
        let descriptor = doc
            .descendants()
            .find(|n| n.has_tag_name((ns::DSIG, ns::node::TRANSFORM)))
            .unwrap();
        XPathFilterTransform::new(descriptor, Arc::new(BasicXPathEvaluator))
    }

    #[test]
    fn test_missing_xpath_child() {
        let xml = format!(r#"<ds:Transform xmlns:ds="{}"/>"#, ns::DSIG);
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let t = transform(&doc);
        let err = t.apply(SignatureInput::from_document(&doc, true)).unwrap_err();
        assert!(matches!(err, Error::Transformation { key: "xml.WrongContent", .. }));
    }

    #[test]
    fn test_expansion_heuristic() {
        assert!(needs_expansion("count(namespace::*) > 0"));
        assert!(needs_expansion("name() = 'a'"));
        assert!(!needs_expansion("not(ancestor-or-self::ds:Signature)"));
    }

    #[test]
    fn test_octets_rejected() {
        let xml = format!(
            r#"<ds:Transform xmlns:ds="{}"><ds:XPath>true()</ds:XPath></ds:Transform>"#,
            ns::DSIG
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let t = transform(&doc);
        assert!(t.apply(SignatureInput::from_octets(b"<a/>".to_vec())).is_err());
    }

    #[test]
    fn test_filter_is_recorded_not_evaluated() {
        let xml = format!(
            r#"<r><ds:Transform xmlns:ds="{}"><ds:XPath>bogus(</ds:XPath></ds:Transform></r>"#,
            ns::DSIG
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let t = transform(&doc);
        let out = t.apply(SignatureInput::from_document(&doc, true)).unwrap();
        let nodes = out.node_set().unwrap();
        assert_eq!(nodes.filter_count(), 1);

        let err = nodes.is_selected(doc.root_element()).unwrap_err();
        assert_eq!(err.message_key(), "signature.Transform.node");
        assert!(err.message_args().iter().any(|a| a == "element <r>"));
    }
}
