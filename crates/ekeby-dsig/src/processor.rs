#![forbid(unsafe_code)]

//! Per-reference processing: resolve → transform → digest → compare/produce.

use crate::context::DsigContext;
use crate::reference::Reference;
use ekeby_core::{algorithm, ns, Error};
use ekeby_crypto::digest::DigestWriter;
use ekeby_resolver::ResolveRequest;
use ekeby_transforms::TransformPipeline;
use ekeby_xml::{Content, SignatureInput};
use roxmltree::Document;
use std::io::Write;

/// Runs references against one [`DsigContext`].
///
/// Holds nothing but a shared borrow of the context, so one processor per
/// task is free.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceProcessor<'c> {
    context: &'c DsigContext,
}

impl<'c> ReferenceProcessor<'c> {
    pub fn new(context: &'c DsigContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &'c DsigContext {
        self.context
    }

    /// Dereference a reference URI in `document` through the resolver chain.
    pub fn dereference<'a>(
        &self,
        document: &'a Document<'a>,
        uri: &'a str,
    ) -> Result<SignatureInput<'a>, Error>
    where
        'c: 'a,
    {
        let ctx: &'a DsigContext = self.context;
        let request = ResolveRequest {
            uri,
            base_uri: ctx.base_uri.as_deref(),
            document,
            secure_validation: ctx.secure_validation,
            id_attrs: &ctx.id_attrs,
        };
        ctx.resolvers.resolve(&request)
    }

    /// Compute the digest of a reference: dereference its URI, run its
    /// transforms and hash the result with its digest method.
    pub fn digest<'d>(
        &self,
        document: &'d Document<'d>,
        reference: &Reference<'d>,
    ) -> Result<Vec<u8>, Error> {
        let uri = reference
            .uri
            .as_deref()
            .ok_or_else(|| Error::NoResolverAvailable {
                uri: "(absent)".into(),
            })?;
        let mut writer = DigestWriter::new(&reference.digest_method)?;
        self.write_transformed(document, uri, &reference.transforms, &mut writer)?;
        tracing::trace!(uri, bytes = writer.written(), "reference digested");
        Ok(writer.finalize())
    }

    /// Recompute a reference's digest and compare it with the expected one.
    pub fn verify<'d>(
        &self,
        document: &'d Document<'d>,
        reference: &Reference<'d>,
    ) -> Result<bool, Error> {
        let expected = reference
            .digest_value
            .as_deref()
            .ok_or_else(|| Error::MissingElement(ns::node::DIGEST_VALUE.into()))?;
        let actual = self.digest(document, reference)?;
        let matches = actual == expected;
        tracing::debug!(
            uri = reference.uri.as_deref().unwrap_or_default(),
            matches,
            "reference digest comparison"
        );
        if !matches {
            tracing::debug!(
                expected = %hex(expected),
                actual = %hex(&actual),
                "digest mismatch"
            );
        }
        Ok(matches)
    }

    /// Compute and store a reference's digest value.
    pub fn produce<'d>(
        &self,
        document: &'d Document<'d>,
        reference: &mut Reference<'d>,
    ) -> Result<(), Error> {
        reference.digest_value = Some(self.digest(document, reference)?);
        Ok(())
    }

    fn write_transformed<'d, 'a>(
        &self,
        document: &'a Document<'a>,
        uri: &'a str,
        transforms: &TransformPipeline<'d>,
        sink: &'a mut dyn Write,
    ) -> Result<(), Error>
    where
        'c: 'a,
        'd: 'a,
    {
        let input = self.dereference(document, uri)?;
        let mut output = transforms.apply_streaming(input, sink)?;
        let sink = output.take_sink();
        let (content, _, _) = output.into_parts();
        match (content, sink) {
            (Content::Streamed, _) => Ok(()),
            (Content::Octets(data), Some(sink)) => Ok(sink.write_all(&data)?),
            // Leftover node-sets are digested in canonical XML 1.0 form.
            (Content::NodeSet(nodes), Some(sink)) => self
                .context
                .transforms
                .canonicalizers()
                .get(algorithm::C14N)?
                .canonicalize_nodes(&nodes, sink),
            (_, None) => Err(Error::transformation(
                "signature.Transform.Streamed",
                "the digest sink was consumed before the output was written",
            )),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
