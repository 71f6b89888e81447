#![forbid(unsafe_code)]

//! Resolver for the bare-name XPointer forms `#xpointer(/)` and
//! `#xpointer(id('ID'))`.

use crate::{ResolveRequest, ResourceResolver};
use ekeby_core::{ns, Error};
use ekeby_xml::{SignatureInput, XPointer};

/// XPointer strategy. Comments are kept in the resulting node-set.
#[derive(Debug, Clone, Copy, Default)]
pub struct XPointerResolver;

impl ResourceResolver for XPointerResolver {
    fn name(&self) -> &str {
        "xpointer"
    }

    fn can_resolve(&self, request: &ResolveRequest<'_>) -> bool {
        XPointer::parse(request.uri).is_some()
    }

    fn resolve<'a>(&self, request: &ResolveRequest<'a>) -> Result<SignatureInput<'a>, Error> {
        let input = match XPointer::parse(request.uri) {
            Some(XPointer::Root) => SignatureInput::from_document(request.document, false),
            Some(XPointer::Id(id)) => {
                let element = request.element_by_id(id)?;
                SignatureInput::from_subtree(request.document, element, false)
            }
            None => {
                return Err(Error::NoResolverAvailable {
                    uri: request.uri.to_owned(),
                })
            }
        };
        Ok(input
            .with_mime_type(ns::MIME_TEXT_XML)
            .with_source_uri(request.source_uri()))
    }
}
