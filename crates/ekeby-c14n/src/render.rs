#![forbid(unsafe_code)]

//! Namespace declarations and attributes in canonical order.

use crate::escape;
use std::cmp::Ordering;
use std::io::{self, Write};

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl<'a> {
    /// "" for the default namespace.
    pub prefix: &'a str,
    pub uri: &'a str,
}

impl NsDecl<'_> {
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.prefix.is_empty() {
            out.write_all(b" xmlns=\"")?;
        } else {
            out.write_all(b" xmlns:")?;
            out.write_all(self.prefix.as_bytes())?;
            out.write_all(b"=\"")?;
        }
        escape::write_attr(out, self.uri)?;
        out.write_all(b"\"")
    }
}

impl Ord for NsDecl<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // The default namespace has the empty prefix and so sorts first.
        self.prefix.cmp(other.prefix)
    }
}

impl PartialOrd for NsDecl<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr<'a> {
    /// "" for no namespace.
    pub ns_uri: &'a str,
    pub local_name: &'a str,
    pub qualified_name: String,
    pub value: &'a str,
}

impl Attr<'_> {
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(b" ")?;
        out.write_all(self.qualified_name.as_bytes())?;
        out.write_all(b"=\"")?;
        escape::write_attr(out, self.value)?;
        out.write_all(b"\"")
    }
}

impl Ord for Attr<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Unqualified attributes first, then by (namespace URI, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self
                .ns_uri
                .cmp(other.ns_uri)
                .then(self.local_name.cmp(other.local_name)),
        }
    }
}

impl PartialOrd for Attr<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_order() {
        let mk = |ns: &'static str, local: &'static str| Attr {
            ns_uri: ns,
            local_name: local,
            qualified_name: local.to_owned(),
            value: "",
        };
        let mut attrs = vec![mk("urn:b", "a"), mk("", "z"), mk("urn:a", "z"), mk("", "b")];
        attrs.sort();
        let order: Vec<_> = attrs.iter().map(|a| (a.ns_uri, a.local_name)).collect();
        assert_eq!(order, [("", "b"), ("", "z"), ("urn:a", "z"), ("urn:b", "a")]);
    }

    #[test]
    fn test_ns_decl_render() {
        let mut out = Vec::new();
        NsDecl { prefix: "", uri: "urn:x" }.write_to(&mut out).unwrap();
        NsDecl { prefix: "p", uri: "urn:y" }.write_to(&mut out).unwrap();
        assert_eq!(out, b" xmlns=\"urn:x\" xmlns:p=\"urn:y\"");
    }
}
