#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 and 1.1.
//!
//! - 1.0: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315` (`#WithComments`)
//! - 1.1: `http://www.w3.org/2006/12/xml-c14n11` (`#WithComments`)
//!
//! The canonical form writes namespace declarations sorted by prefix
//! (default first), attributes sorted by (namespace URI, local name), and
//! escapes text and attribute values. Node-set filters are evaluated while
//! walking, unless the input asks for expansion, in which case the visible
//! set is materialized first.

use crate::escape;
use crate::render::{Attr, NsDecl};
use crate::Canonicalizer;
use ekeby_core::{algorithm, ns, Error};
use ekeby_xml::document::{attribute_prefix, qualified_name};
use ekeby_xml::{NodeSet, NodeSetData};
use roxmltree::{Node, NodeType};
use std::collections::BTreeMap;
use std::io::Write;

/// Which Canonical XML recommendation to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nVersion {
    V10,
    V11,
}

/// Inclusive canonicalizer for one (version, comments) combination.
#[derive(Debug, Clone, Copy)]
pub struct InclusiveCanonicalizer {
    version: C14nVersion,
    with_comments: bool,
}

impl InclusiveCanonicalizer {
    pub fn new(version: C14nVersion, with_comments: bool) -> Self {
        Self {
            version,
            with_comments,
        }
    }

    /// The four registered variants.
    pub fn all() -> [Self; 4] {
        [
            Self::new(C14nVersion::V10, false),
            Self::new(C14nVersion::V10, true),
            Self::new(C14nVersion::V11, false),
            Self::new(C14nVersion::V11, true),
        ]
    }
}

impl Canonicalizer for InclusiveCanonicalizer {
    fn uri(&self) -> &str {
        match (self.version, self.with_comments) {
            (C14nVersion::V10, false) => algorithm::C14N,
            (C14nVersion::V10, true) => algorithm::C14N_WITH_COMMENTS,
            (C14nVersion::V11, false) => algorithm::C14N11,
            (C14nVersion::V11, true) => algorithm::C14N11_WITH_COMMENTS,
        }
    }

    fn canonicalize_nodes<'a>(
        &self,
        nodes: &NodeSetData<'a>,
        out: &mut dyn Write,
    ) -> Result<(), Error> {
        let expanded = if nodes.needs_expansion() {
            Some(nodes.expand()?)
        } else {
            None
        };
        let walker = Walker {
            nodes,
            expanded,
            version: self.version,
            with_comments: self.with_comments,
        };
        let apex = nodes.apex();
        tracing::trace!(
            uri = self.uri(),
            eager = walker.expanded.is_some(),
            "canonicalizing node-set"
        );
        walker.process_node(apex, out, &BTreeMap::new(), false)
    }
}

type NsMap<'a> = BTreeMap<&'a str, &'a str>;

struct Walker<'v, 'a> {
    nodes: &'v NodeSetData<'a>,
    expanded: Option<NodeSet>,
    version: C14nVersion,
    with_comments: bool,
}

impl<'v, 'a> Walker<'v, 'a> {
    fn is_visible(&self, node: Node<'a, 'a>) -> Result<bool, Error> {
        if node.node_type() == NodeType::Comment && !self.with_comments {
            return Ok(false);
        }
        match &self.expanded {
            Some(set) => Ok(set.contains(node)),
            None => self.nodes.is_selected(node),
        }
    }

    /// `parent_visible` is the visibility of the nearest parent element
    /// inside the walked subtree (false at the apex).
    fn process_node(
        &self,
        node: Node<'a, 'a>,
        out: &mut dyn Write,
        inherited_ns: &NsMap<'a>,
        parent_visible: bool,
    ) -> Result<(), Error> {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, out, inherited_ns, false)?;
                }
            }
            NodeType::Element => {
                self.process_element(node, out, inherited_ns, parent_visible)?;
            }
            NodeType::Text => {
                if self.is_visible(node)? {
                    escape::write_text(out, node.text().unwrap_or(""))?;
                }
            }
            NodeType::Comment => {
                if self.is_visible(node)? {
                    self.around_document_element(node, out, |out| {
                        out.write_all(b"<!--")?;
                        out.write_all(node.text().unwrap_or("").as_bytes())?;
                        out.write_all(b"-->")
                    })?;
                }
            }
            NodeType::PI => {
                if self.is_visible(node)? {
                    if let Some(pi) = node.pi() {
                        self.around_document_element(node, out, |out| {
                            out.write_all(b"<?")?;
                            out.write_all(pi.target.as_bytes())?;
                            if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                                out.write_all(b" ")?;
                                escape::write_pi(out, value)?;
                            }
                            out.write_all(b"?>")
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Comments and PIs that are children of the root get a line break
    /// between them and the document element.
    fn around_document_element(
        &self,
        node: Node<'a, 'a>,
        out: &mut dyn Write,
        body: impl FnOnce(&mut dyn Write) -> std::io::Result<()>,
    ) -> Result<(), Error> {
        let top_level = node
            .parent()
            .is_some_and(|p| p.node_type() == NodeType::Root);
        if top_level && node.prev_siblings().any(|s| s.is_element()) {
            out.write_all(b"\n")?;
        }
        body(out)?;
        if top_level && node.next_siblings().any(|s| s.is_element()) {
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn process_element(
        &self,
        node: Node<'a, 'a>,
        out: &mut dyn Write,
        inherited_ns: &NsMap<'a>,
        parent_visible: bool,
    ) -> Result<(), Error> {
        if !self.is_visible(node)? {
            // Children of an invisible element still render if selected,
            // against the namespace context of the nearest visible ancestor.
            for child in node.children() {
                self.process_node(child, out, inherited_ns, false)?;
            }
            return Ok(());
        }

        let in_scope = in_scope_namespaces(node);

        let mut ns_decls: Vec<NsDecl> = in_scope
            .iter()
            .filter(|(prefix, uri)| inherited_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl {
                prefix: *prefix,
                uri: *uri,
            })
            .collect();
        if !in_scope.contains_key("") && inherited_ns.get("").is_some_and(|u| !u.is_empty()) {
            ns_decls.push(NsDecl { prefix: "", uri: "" });
        }
        ns_decls.sort();

        let mut attrs: Vec<Attr> = node
            .attributes()
            .map(|attr| {
                let ns_uri = attr.namespace().unwrap_or("");
                let qualified_name = match attribute_prefix(node, ns_uri) {
                    Some(prefix) if !ns_uri.is_empty() => format!("{prefix}:{}", attr.name()),
                    _ => attr.name().to_owned(),
                };
                Attr {
                    ns_uri,
                    local_name: attr.name(),
                    qualified_name,
                    value: attr.value(),
                }
            })
            .collect();
        if !parent_visible {
            let inherited = self.inherited_xml_attrs(node, &attrs);
            attrs.extend(inherited);
        }
        attrs.sort();

        let name = qualified_name(node);
        out.write_all(b"<")?;
        out.write_all(name.as_bytes())?;
        for decl in &ns_decls {
            decl.write_to(out)?;
        }
        for attr in &attrs {
            attr.write_to(out)?;
        }
        out.write_all(b">")?;

        for child in node.children() {
            self.process_node(child, out, &in_scope, true)?;
        }

        out.write_all(b"</")?;
        out.write_all(name.as_bytes())?;
        out.write_all(b">")?;
        Ok(())
    }

    /// `xml:*` attributes of ancestors, nearest first, that the element does
    /// not carry itself. Canonical XML 1.1 only inherits `xml:lang` and
    /// `xml:space`.
    fn inherited_xml_attrs(&self, node: Node<'a, 'a>, existing: &[Attr<'a>]) -> Vec<Attr<'a>> {
        let mut inherited: BTreeMap<&'a str, &'a str> = BTreeMap::new();
        for ancestor in node.ancestors().skip(1).filter(|a| a.is_element()) {
            for attr in ancestor.attributes() {
                if attr.namespace() != Some(ns::XML) {
                    continue;
                }
                if self.version == C14nVersion::V11 && !matches!(attr.name(), "lang" | "space") {
                    continue;
                }
                inherited.entry(attr.name()).or_insert(attr.value());
            }
        }
        inherited
            .into_iter()
            .filter(|(name, _)| {
                !existing
                    .iter()
                    .any(|a| a.ns_uri == ns::XML && a.local_name == *name)
            })
            .map(|(name, value)| Attr {
                ns_uri: ns::XML,
                local_name: name,
                qualified_name: format!("xml:{name}"),
                value,
            })
            .collect()
    }
}

/// In-scope namespace bindings of an element, excluding the `xml` prefix
/// and empty default-namespace undeclarations.
fn in_scope_namespaces<'a>(node: Node<'a, 'a>) -> NsMap<'a> {
    let mut map = NsMap::new();
    for decl in node.namespaces() {
        let prefix = decl.name().unwrap_or("");
        if prefix == "xml" || decl.uri().is_empty() {
            continue;
        }
        map.entry(prefix).or_insert(decl.uri());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekeby_xml::{NodeFilter, SignatureInput};

    fn c14n(version: C14nVersion, comments: bool, input: &SignatureInput<'_>) -> String {
        let mut out = Vec::new();
        InclusiveCanonicalizer::new(version, comments)
            .canonicalize_nodes(input.node_set().unwrap(), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn whole(xml: &str, comments: bool) -> String {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let input = SignatureInput::from_document(&doc, false);
        c14n(C14nVersion::V10, comments, &input)
    }

    struct SkipNamed(&'static str);

    impl<'a> NodeFilter<'a> for SkipNamed {
        fn include(&self, node: Node<'a, 'a>) -> Result<bool, Error> {
            Ok(!node
                .ancestors()
                .any(|a| a.is_element() && a.tag_name().name() == self.0))
        }
    }

    #[test]
    fn test_attribute_sorting_and_empty_elements() {
        let out = whole(r#"<root><a b="1" a="2"/></root>"#, false);
        assert_eq!(out, r#"<root><a a="2" b="1"></a></root>"#);
    }

    #[test]
    fn test_namespace_declarations_once() {
        let out = whole(
            r#"<root xmlns:b="http://b" xmlns:a="http://a"><a:child xmlns:a="http://a"/></root>"#,
            false,
        );
        assert_eq!(
            out,
            r#"<root xmlns:a="http://a" xmlns:b="http://b"><a:child></a:child></root>"#
        );
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let out = whole(r#"<a xmlns="urn:x"><b xmlns=""/></a>"#, false);
        assert_eq!(out, r#"<a xmlns="urn:x"><b xmlns=""></b></a>"#);
    }

    #[test]
    fn test_comments_and_top_level_breaks() {
        let xml = "<!--pre--><a>x<!--in--></a><!--post-->";
        assert_eq!(whole(xml, true), "<!--pre-->\n<a>x<!--in--></a>\n<!--post-->");
        assert_eq!(whole(xml, false), "<a>x</a>");
    }

    #[test]
    fn test_c14n11_with_comments_keeps_comments() {
        let xml = r#"<r xml:lang="sv"><!--top--><s><!--in-->t</s></r>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let apex = doc.descendants().find(|n| n.has_tag_name("s")).unwrap();
        let input = SignatureInput::from_subtree(&doc, apex, false);

        assert_eq!(
            c14n(C14nVersion::V11, true, &input),
            r#"<s xml:lang="sv"><!--in-->t</s>"#
        );
        assert_eq!(
            c14n(C14nVersion::V11, false, &input),
            r#"<s xml:lang="sv">t</s>"#
        );
        assert_eq!(
            InclusiveCanonicalizer::new(C14nVersion::V11, true).uri(),
            algorithm::C14N11_WITH_COMMENTS
        );
    }

    #[test]
    fn test_input_comment_exclusion_wins_over_with_comments() {
        let doc = roxmltree::Document::parse("<a><!--c-->t</a>").unwrap();
        let input = SignatureInput::from_document(&doc, true);
        assert_eq!(c14n(C14nVersion::V10, true, &input), "<a>t</a>");
    }

    #[test]
    fn test_subtree_carries_context() {
        let xml = r#"<r xmlns="urn:d" xmlns:p="urn:p" xml:lang="sv" xml:base="http://x/"><p:s Id="s"><t/></p:s></r>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let apex = doc.descendants().find(|n| n.has_tag_name(("urn:p", "s"))).unwrap();
        let input = SignatureInput::from_subtree(&doc, apex, true);

        assert_eq!(
            c14n(C14nVersion::V10, false, &input),
            r#"<p:s xmlns="urn:d" xmlns:p="urn:p" Id="s" xml:base="http://x/" xml:lang="sv"><t></t></p:s>"#
        );
        assert_eq!(
            c14n(C14nVersion::V11, false, &input),
            r#"<p:s xmlns="urn:d" xmlns:p="urn:p" Id="s" xml:lang="sv"><t></t></p:s>"#
        );
    }

    #[test]
    fn test_lazy_and_expanded_agree() {
        let xml = r#"<doc><keep>1</keep><drop><inner>2</inner></drop><keep>3</keep></doc>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();

        let mut lazy = SignatureInput::from_document(&doc, true);
        lazy.node_set_mut().unwrap().add_filter(Box::new(SkipNamed("drop")));

        let mut eager = SignatureInput::from_document(&doc, true);
        let data = eager.node_set_mut().unwrap();
        data.add_filter(Box::new(SkipNamed("drop")));
        data.set_needs_expansion(true);

        let expected = "<doc><keep>1</keep><keep>3</keep></doc>";
        assert_eq!(c14n(C14nVersion::V10, false, &lazy), expected);
        assert_eq!(c14n(C14nVersion::V10, false, &eager), expected);
    }

    #[test]
    fn test_octets_are_parsed_whole() {
        let mut out = Vec::new();
        InclusiveCanonicalizer::new(C14nVersion::V11, false)
            .canonicalize_octets(b"<a   z='1' y=\"2\"/>", &mut out)
            .unwrap();
        assert_eq!(out, br#"<a y="2" z="1"></a>"#);
    }
}
