#![forbid(unsafe_code)]

//! The content unit that moves through resolution, transforms and digesting.
//!
//! A [`SignatureInput`] is either octets or a node-set over a document owned
//! by the caller. Node-set filters are recorded as they are added and only
//! evaluated when the input is canonicalized.

use crate::nodeset::NodeSet;
use ekeby_core::Error;
use roxmltree::{Document, Node, NodeId, NodeType};
use std::fmt;
use std::io::Write;

/// A predicate deciding whether a node belongs to a node-set.
pub trait NodeFilter<'a> {
    /// Return `true` to keep `node`.
    fn include(&self, node: Node<'a, 'a>) -> Result<bool, Error>;
}

/// Node-set mode: a subtree of an externally owned document plus pending filters.
pub struct NodeSetData<'a> {
    document: &'a Document<'a>,
    apex: NodeId,
    exclude_comments: bool,
    filters: Vec<Box<dyn NodeFilter<'a> + 'a>>,
    needs_expansion: bool,
}

impl<'a> NodeSetData<'a> {
    pub fn document(&self) -> &'a Document<'a> {
        self.document
    }

    /// The node whose subtree this node-set covers.
    pub fn apex(&self) -> Node<'a, 'a> {
        self.document
            .get_node(self.apex)
            .unwrap_or_else(|| self.document.root())
    }

    pub fn exclude_comments(&self) -> bool {
        self.exclude_comments
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn add_filter(&mut self, filter: Box<dyn NodeFilter<'a> + 'a>) {
        self.filters.push(filter);
    }

    /// True when filters must be materialized before canonicalization.
    pub fn needs_expansion(&self) -> bool {
        self.needs_expansion
    }

    pub fn set_needs_expansion(&mut self, value: bool) {
        self.needs_expansion = value;
    }

    /// True if `node` lies inside the apex subtree.
    pub fn in_scope(&self, node: Node<'a, 'a>) -> bool {
        let apex = self.apex;
        node.ancestors().any(|a| a.id() == apex)
    }

    /// Evaluate comment exclusion and every filter for one node.
    ///
    /// Filters run in registration order and stop at the first rejection.
    pub fn is_selected(&self, node: Node<'a, 'a>) -> Result<bool, Error> {
        if self.exclude_comments && node.node_type() == NodeType::Comment {
            return Ok(false);
        }
        for filter in &self.filters {
            if !filter.include(node)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Materialize the selected nodes of the apex subtree.
    pub fn expand(&self) -> Result<NodeSet, Error> {
        let mut set = NodeSet::new();
        for node in self.apex().descendants() {
            if self.is_selected(node)? {
                set.insert(node.id());
            }
        }
        tracing::trace!(
            nodes = set.len(),
            filters = self.filters.len(),
            "expanded node-set"
        );
        Ok(set)
    }
}

/// The active representation of a [`SignatureInput`].
pub enum Content<'a> {
    /// An immutable byte sequence.
    Octets(Vec<u8>),
    /// A filtered view of a document subtree.
    NodeSet(NodeSetData<'a>),
    /// Canonical bytes were written straight into the attached sink.
    Streamed,
}

/// Content flowing through the signature pipeline.
pub struct SignatureInput<'a> {
    content: Content<'a>,
    mime_type: Option<String>,
    source_uri: Option<String>,
    sink: Option<&'a mut dyn Write>,
}

impl<'a> SignatureInput<'a> {
    fn with_content(content: Content<'a>) -> Self {
        Self {
            content,
            mime_type: None,
            source_uri: None,
            sink: None,
        }
    }

    /// Octet-mode input.
    pub fn from_octets(data: impl Into<Vec<u8>>) -> Self {
        Self::with_content(Content::Octets(data.into()))
    }

    /// Node-set input covering the subtree rooted at `apex`.
    pub fn from_subtree(document: &'a Document<'a>, apex: Node<'a, 'a>, exclude_comments: bool) -> Self {
        Self::with_content(Content::NodeSet(NodeSetData {
            document,
            apex: apex.id(),
            exclude_comments,
            filters: Vec::new(),
            needs_expansion: false,
        }))
    }

    /// Node-set input covering the whole document.
    pub fn from_document(document: &'a Document<'a>, exclude_comments: bool) -> Self {
        Self::from_subtree(document, document.root(), exclude_comments)
    }

    /// The marker left behind once canonical bytes went to a sink.
    pub fn streamed() -> Self {
        Self::with_content(Content::Streamed)
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn source_uri(&self) -> Option<&str> {
        self.source_uri.as_deref()
    }

    pub fn content(&self) -> &Content<'a> {
        &self.content
    }

    pub fn is_octets(&self) -> bool {
        matches!(self.content, Content::Octets(_))
    }

    pub fn is_node_set(&self) -> bool {
        matches!(self.content, Content::NodeSet(_))
    }

    pub fn is_streamed(&self) -> bool {
        matches!(self.content, Content::Streamed)
    }

    pub fn needs_expansion(&self) -> bool {
        match &self.content {
            Content::NodeSet(data) => data.needs_expansion(),
            _ => false,
        }
    }

    pub fn octets(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Octets(data) => Some(data),
            _ => None,
        }
    }

    pub fn node_set(&self) -> Option<&NodeSetData<'a>> {
        match &self.content {
            Content::NodeSet(data) => Some(data),
            _ => None,
        }
    }

    pub fn node_set_mut(&mut self) -> Option<&mut NodeSetData<'a>> {
        match &mut self.content {
            Content::NodeSet(data) => Some(data),
            _ => None,
        }
    }

    /// Attach an output sink; a canonicalizing step streams into it.
    pub fn attach_sink(&mut self, sink: &'a mut dyn Write) {
        self.sink = Some(sink);
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn take_sink(&mut self) -> Option<&'a mut dyn Write> {
        self.sink.take()
    }

    /// Split into content and labels, dropping any sink.
    pub fn into_parts(self) -> (Content<'a>, Option<String>, Option<String>) {
        (self.content, self.mime_type, self.source_uri)
    }

    /// Take the octets, failing for node-set input.
    pub fn into_octets(self) -> Result<Vec<u8>, Error> {
        match self.content {
            Content::Octets(data) => Ok(data),
            Content::NodeSet(_) => Err(Error::transformation(
                "signature.Transform.NodeSetExpected",
                "input is a node-set; canonicalize it before reading octets",
            )),
            Content::Streamed => Err(Error::transformation(
                "signature.Transform.Streamed",
                "content was already streamed to a sink",
            )),
        }
    }
}

impl fmt::Debug for SignatureInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SignatureInput");
        match &self.content {
            Content::Octets(data) => s.field("octets", &data.len()),
            Content::NodeSet(data) => s
                .field("apex", &data.apex)
                .field("exclude_comments", &data.exclude_comments)
                .field("filters", &data.filters.len())
                .field("needs_expansion", &data.needs_expansion),
            Content::Streamed => s.field("streamed", &true),
        };
        s.field("mime_type", &self.mime_type)
            .field("source_uri", &self.source_uri)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectNamed(&'static str);

    impl<'a> NodeFilter<'a> for RejectNamed {
        fn include(&self, node: Node<'a, 'a>) -> Result<bool, Error> {
            Ok(node.tag_name().name() != self.0)
        }
    }

    #[test]
    fn test_octets_round() {
        let input = SignatureInput::from_octets(b"abc".to_vec()).with_mime_type("text/plain");
        assert!(input.is_octets());
        assert_eq!(input.mime_type(), Some("text/plain"));
        assert_eq!(input.into_octets().unwrap(), b"abc");
    }

    #[test]
    fn test_filters_are_lazy_until_expand() {
        let doc = roxmltree::Document::parse("<a><b/><!--c--><d/></a>").unwrap();
        let mut input = SignatureInput::from_document(&doc, true);
        input
            .node_set_mut()
            .unwrap()
            .add_filter(Box::new(RejectNamed("b")));
        let data = input.node_set().unwrap();
        assert_eq!(data.filter_count(), 1);

        let set = data.expand().unwrap();
        let names: Vec<_> = doc
            .descendants()
            .filter(|n| set.contains(*n))
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect();
        assert_eq!(names, ["a", "d"]);
        assert!(!doc.descendants().any(|n| n.is_comment() && set.contains(n)));
    }

    #[test]
    fn test_node_set_is_not_octets() {
        let doc = roxmltree::Document::parse("<a/>").unwrap();
        let input = SignatureInput::from_document(&doc, false);
        assert!(input.is_node_set());
        assert!(input.into_octets().is_err());
    }

    #[test]
    fn test_in_scope_follows_apex() {
        let doc = roxmltree::Document::parse("<a><b><c/></b><d/></a>").unwrap();
        let b = doc.descendants().find(|n| n.has_tag_name("b")).unwrap();
        let input = SignatureInput::from_subtree(&doc, b, false);
        let data = input.node_set().unwrap();
        let c = doc.descendants().find(|n| n.has_tag_name("c")).unwrap();
        let d = doc.descendants().find(|n| n.has_tag_name("d")).unwrap();
        assert!(data.in_scope(c));
        assert!(!data.in_scope(d));
    }
}
