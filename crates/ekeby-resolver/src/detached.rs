#![forbid(unsafe_code)]

//! Detached content supplied by the caller, keyed by exact URI.

use crate::{ResolveRequest, ResourceResolver};
use ekeby_core::Error;
use ekeby_xml::SignatureInput;
use std::collections::HashMap;

/// Serves in-memory octets for URIs that point outside the document.
#[derive(Debug, Clone, Default)]
pub struct DetachedContentResolver {
    entries: HashMap<String, Vec<u8>>,
}

impl DetachedContentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` for references whose URI is exactly `uri`.
    pub fn insert(&mut self, uri: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(uri.into(), data);
    }
}

impl ResourceResolver for DetachedContentResolver {
    fn name(&self) -> &str {
        "detached"
    }

    fn can_resolve(&self, request: &ResolveRequest<'_>) -> bool {
        self.entries.contains_key(request.uri)
    }

    fn resolve<'a>(&self, request: &ResolveRequest<'a>) -> Result<SignatureInput<'a>, Error> {
        let data = self
            .entries
            .get(request.uri)
            .ok_or_else(|| Error::NoResolverAvailable {
                uri: request.uri.to_owned(),
            })?;
        Ok(SignatureInput::from_octets(data.clone()).with_source_uri(request.source_uri()))
    }
}
