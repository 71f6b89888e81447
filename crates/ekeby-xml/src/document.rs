#![forbid(unsafe_code)]

//! Identifier lookup and element helpers over `roxmltree` documents.

use ekeby_core::ns;
use roxmltree::{Node, NodeType};

/// The set of attribute names that declare an element identifier.
///
/// `Id`, `ID` and `id` (in no namespace) are always registered; callers may
/// add more, optionally namespace-qualified (e.g. `wsu:Id`).
#[derive(Debug, Clone)]
pub struct IdAttributes {
    names: Vec<(Option<String>, String)>,
}

impl IdAttributes {
    pub fn new() -> Self {
        Self {
            names: vec![
                (None, "Id".to_owned()),
                (None, "ID".to_owned()),
                (None, "id".to_owned()),
            ],
        }
    }

    /// Register an additional identifier attribute in no namespace.
    pub fn push(&mut self, local_name: &str) {
        self.names.push((None, local_name.to_owned()));
    }

    /// Register an additional namespace-qualified identifier attribute.
    pub fn push_ns(&mut self, namespace: &str, local_name: &str) {
        self.names
            .push((Some(namespace.to_owned()), local_name.to_owned()));
    }

    /// True if `node` is an element declaring `id` through any registered attribute.
    pub fn declares(&self, node: Node<'_, '_>, id: &str) -> bool {
        if !node.is_element() {
            return false;
        }
        node.attributes().any(|attr| {
            attr.value() == id
                && self.names.iter().any(|(ns, local)| {
                    attr.name() == local && attr.namespace() == ns.as_deref()
                })
        })
    }

    /// Every element at or below `start` that declares `id`, in document order.
    pub fn elements_with_id<'a>(&self, start: Node<'a, 'a>, id: &str) -> Vec<Node<'a, 'a>> {
        start
            .descendants()
            .filter(|n| self.declares(*n, id))
            .collect()
    }
}

impl Default for IdAttributes {
    fn default() -> Self {
        Self::new()
    }
}

/// True if `node` is an element with the given namespace and local name.
pub fn is_element(node: Node<'_, '_>, namespace: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == namespace
}

/// Find the first child element with the given namespace and local name.
pub fn find_child_element<'a>(
    node: Node<'a, 'a>,
    namespace: &str,
    local_name: &str,
) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|c| is_element(*c, namespace, local_name))
}

/// All child elements with the given namespace and local name.
pub fn child_elements<'a>(
    node: Node<'a, 'a>,
    namespace: &str,
    local_name: &str,
) -> Vec<Node<'a, 'a>> {
    node.children()
        .filter(|c| is_element(*c, namespace, local_name))
        .collect()
}

/// Find the first descendant element with the given namespace and local name.
pub fn find_element<'a>(
    node: Node<'a, 'a>,
    namespace: &str,
    local_name: &str,
) -> Option<Node<'a, 'a>> {
    node.descendants()
        .find(|n| is_element(*n, namespace, local_name))
}

/// Concatenated text content of an element's text children.
pub fn element_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect()
}

/// The element's name as written in the source (`prefix:local` or `local`).
pub fn qualified_name(node: Node<'_, '_>) -> String {
    let local = node.tag_name().name();
    let doc = node.document();
    if let Some(raw) = doc.input_text().get(node.range()) {
        if let Some(rest) = raw.strip_prefix('<') {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
                .unwrap_or(rest.len());
            let written = &rest[..end];
            if written == local || written.strip_suffix(local).is_some_and(|p| p.ends_with(':')) {
                return written.to_owned();
            }
        }
    }
    match node
        .tag_name()
        .namespace()
        .and_then(|uri| node.lookup_prefix(uri))
    {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_owned(),
    }
}

/// The prefix bound to `namespace` that an attribute in that namespace uses.
pub fn attribute_prefix<'a>(node: Node<'a, 'a>, namespace: &str) -> Option<&'a str> {
    if namespace == ns::XML {
        return Some("xml");
    }
    node.namespaces()
        .filter(|n| n.uri() == namespace)
        .find_map(|n| n.name())
}

/// Short description of a node for error reports.
pub fn describe_node(node: Node<'_, '_>) -> String {
    match node.node_type() {
        NodeType::Root => "document root".to_owned(),
        NodeType::Element => format!("element <{}>", qualified_name(node)),
        NodeType::Text => {
            let text = node.text().unwrap_or("");
            let mut short: String = text.chars().take(32).collect();
            if short.len() < text.len() {
                short.push_str("...");
            }
            format!("text {short:?}")
        }
        NodeType::Comment => "comment".to_owned(),
        NodeType::PI => match node.pi() {
            Some(pi) => format!("processing instruction <?{}?>", pi.target),
            None => "processing instruction".to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<r xmlns:w="urn:wsu"><a Id="x1"/><b id="x2"><c w:Id="x3"/></b><d ID="x1"/></r>"#;

    #[test]
    fn test_elements_with_id_in_document_order() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let ids = IdAttributes::new();
        let found = ids.elements_with_id(doc.root_element(), "x1");
        let names: Vec<_> = found.iter().map(|n| n.tag_name().name()).collect();
        assert_eq!(names, ["a", "d"]);
    }

    #[test]
    fn test_namespaced_id_needs_registration() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let mut ids = IdAttributes::new();
        assert!(ids.elements_with_id(doc.root_element(), "x3").is_empty());
        ids.push_ns("urn:wsu", "Id");
        assert_eq!(ids.elements_with_id(doc.root_element(), "x3").len(), 1);
    }

    #[test]
    fn test_qualified_name_keeps_prefix() {
        let doc = roxmltree::Document::parse(r#"<p:a xmlns:p="urn:p"><p:b/><c/></p:a>"#).unwrap();
        let root = doc.root_element();
        assert_eq!(qualified_name(root), "p:a");
        let names: Vec<_> = root.children().map(qualified_name).collect();
        assert_eq!(names, ["p:b", "c"]);
    }

    #[test]
    fn test_describe_text_is_truncated() {
        let long = "y".repeat(50);
        let xml = format!("<a>{long}</a>");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let text = doc.root_element().first_child().unwrap();
        assert!(describe_node(text).ends_with("...\""));
    }
}
