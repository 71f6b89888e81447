#![forbid(unsafe_code)]

//! XML layer for the Ekeby XML signature core.
//!
//! Provides the [`SignatureInput`] content model that flows through the
//! transform pipeline, identifier lookup over `roxmltree` documents, the
//! eagerly materialized [`NodeSet`], and the XPath evaluator contract used
//! by filter transforms.

pub mod document;
pub mod input;
pub mod nodeset;
pub mod xpath;

pub use document::IdAttributes;
pub use input::{Content, NodeFilter, NodeSetData, SignatureInput};
pub use nodeset::NodeSet;
pub use xpath::{BasicXPathEvaluator, XPathEvaluator, XPointer};

use ekeby_core::Error;

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree never fetches external entities and only substitutes internal
/// ones, so accepting a DTD does not open an entity-expansion channel.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse XML text with [`parsing_options`].
///
/// This is the explicit octet to node-set step: the caller owns the text and
/// the returned tree, and builds a node-set [`SignatureInput`] from it.
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))
}

/// Interpret octets as UTF-8 XML text, ready for [`parse`].
pub fn octets_as_text(data: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(data).map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))
}
