#![forbid(unsafe_code)]

//! Signature-wrapping protection for identifier lookups.

use ekeby_core::Error;
use ekeby_xml::IdAttributes;
use roxmltree::Node;

/// Rejects identifiers declared by more than one element.
///
/// Holds no state between lookups: every check rescans the tree.
#[derive(Debug, Clone, Copy)]
pub struct AntiWrappingGuard<'i> {
    id_attrs: &'i IdAttributes,
}

impl<'i> AntiWrappingGuard<'i> {
    pub fn new(id_attrs: &'i IdAttributes) -> Self {
        Self { id_attrs }
    }

    /// Fail with [`Error::SignatureWrapping`] if more than one element at or
    /// below `start` declares `id`.
    pub fn check(&self, start: Node<'_, '_>, id: &str) -> Result<(), Error> {
        let declarations = start
            .descendants()
            .filter(|n| self.id_attrs.declares(*n, id))
            .take(2)
            .count();
        if declarations > 1 {
            tracing::warn!(id, "identifier declared more than once, rejecting reference");
            return Err(Error::SignatureWrapping { id: id.to_owned() });
        }
        Ok(())
    }
}
