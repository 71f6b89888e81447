#![forbid(unsafe_code)]

//! Same-document references: `""` and bare names `#id`.
//!
//! Both forms exclude comments from the node-set.

use crate::{ResolveRequest, ResourceResolver};
use ekeby_core::{ns, Error};
use ekeby_xml::xpath::parse_same_document_ref;
use ekeby_xml::SignatureInput;

#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentResolver;

impl ResourceResolver for FragmentResolver {
    fn name(&self) -> &str {
        "fragment"
    }

    fn can_resolve(&self, request: &ResolveRequest<'_>) -> bool {
        request.uri.is_empty()
            || (request.uri.starts_with('#') && !request.uri.starts_with("#xpointer("))
    }

    fn resolve<'a>(&self, request: &ResolveRequest<'a>) -> Result<SignatureInput<'a>, Error> {
        let input = match parse_same_document_ref(request.uri) {
            None => SignatureInput::from_document(request.document, true),
            Some(id) => {
                let element = request.element_by_id(id)?;
                SignatureInput::from_subtree(request.document, element, true)
            }
        };
        Ok(input
            .with_mime_type(ns::MIME_TEXT_XML)
            .with_source_uri(request.source_uri()))
    }
}
