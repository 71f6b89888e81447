#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use ekeby_c14n::Canonicalizer;
use ekeby_core::Error;
use ekeby_xml::{Content, SignatureInput};
use std::io::Write;
use std::sync::Arc;

/// One step of a reference's transform chain.
///
/// `'d` is the lifetime of the signature document the transform was
/// described in; filters a transform installs may borrow from it.
pub trait Transform<'d> {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Turn one input into the next.
    fn apply<'a>(&self, input: SignatureInput<'a>) -> Result<SignatureInput<'a>, Error>
    where
        'd: 'a;

    /// True if the output is canonical octets that may be streamed.
    fn is_canonicalization(&self) -> bool {
        false
    }
}

/// An ordered sequence of transforms applied left to right.
#[derive(Default)]
pub struct TransformPipeline<'d> {
    transforms: Vec<Box<dyn Transform<'d> + 'd>>,
}

impl<'d> TransformPipeline<'d> {
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    pub fn push(&mut self, transform: Box<dyn Transform<'d> + 'd>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn uris(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.uri()).collect()
    }

    /// Apply every transform in order, stopping at the first failure.
    pub fn apply<'a>(&self, input: SignatureInput<'a>) -> Result<SignatureInput<'a>, Error>
    where
        'd: 'a,
    {
        self.transforms
            .iter()
            .try_fold(input, |data, transform| run(transform.as_ref(), data))
    }

    /// Apply every transform, streaming canonical output into `sink`.
    ///
    /// The sink is attached just before the last transform when that
    /// transform canonicalizes, so its bytes never get buffered. Otherwise
    /// the sink rides along on the returned input and the caller finishes
    /// writing it.
    pub fn apply_streaming<'a>(
        &self,
        input: SignatureInput<'a>,
        sink: &'a mut dyn Write,
    ) -> Result<SignatureInput<'a>, Error>
    where
        'd: 'a,
    {
        let Some((last, init)) = self.transforms.split_last() else {
            let mut output = input;
            output.attach_sink(sink);
            return Ok(output);
        };
        let mut data = init
            .iter()
            .try_fold(input, |data, transform| run(transform.as_ref(), data))?;
        if last.is_canonicalization() {
            data.attach_sink(sink);
            run(last.as_ref(), data)
        } else {
            let mut output = run(last.as_ref(), data)?;
            output.attach_sink(sink);
            Ok(output)
        }
    }
}

fn run<'d, 'a>(
    transform: &(dyn Transform<'d> + 'd),
    input: SignatureInput<'a>,
) -> Result<SignatureInput<'a>, Error>
where
    'd: 'a,
{
    tracing::debug!(uri = transform.uri(), ?input, "applying transform");
    transform.apply(input).map_err(|e| {
        tracing::debug!(uri = transform.uri(), error = %e, "transform failed");
        e
    })
}

// ── Canonicalization ─────────────────────────────────────────────────

/// Canonicalize node-set or octet input; the output is always octets.
pub struct CanonicalizationTransform {
    canonicalizer: Arc<dyn Canonicalizer>,
}

impl CanonicalizationTransform {
    pub fn new(canonicalizer: Arc<dyn Canonicalizer>) -> Self {
        Self { canonicalizer }
    }

    fn write(&self, content: &Content<'_>, out: &mut dyn Write) -> Result<(), Error> {
        match content {
            Content::NodeSet(nodes) => self.canonicalizer.canonicalize_nodes(nodes, out),
            Content::Octets(data) => self.canonicalizer.canonicalize_octets(data, out),
            Content::Streamed => Err(Error::transformation(
                "signature.Transform.Streamed",
                "input was already streamed to a sink",
            )),
        }
    }
}

impl<'d> Transform<'d> for CanonicalizationTransform {
    fn uri(&self) -> &str {
        self.canonicalizer.uri()
    }

    fn apply<'a>(&self, mut input: SignatureInput<'a>) -> Result<SignatureInput<'a>, Error>
    where
        'd: 'a,
    {
        let sink = input.take_sink();
        let (content, _, source_uri) = input.into_parts();
        let output = match sink {
            Some(sink) => {
                self.write(&content, sink)?;
                SignatureInput::streamed()
            }
            None => {
                let mut buf = Vec::new();
                self.write(&content, &mut buf)?;
                SignatureInput::from_octets(buf)
            }
        };
        Ok(match source_uri {
            Some(uri) => output.with_source_uri(uri),
            None => output,
        })
    }

    fn is_canonicalization(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekeby_c14n::{C14nVersion, InclusiveCanonicalizer};
    use std::cell::Cell;

    struct Fails;

    impl<'d> Transform<'d> for Fails {
        fn uri(&self) -> &str {
            "urn:test:fails"
        }

        fn apply<'a>(&self, _input: SignatureInput<'a>) -> Result<SignatureInput<'a>, Error>
        where
            'd: 'a,
        {
            Err(Error::transformation("test.Fails", "first transform failed"))
        }
    }

    struct Counts<'c>(&'c Cell<usize>);

    impl<'d> Transform<'d> for Counts<'_> {
        fn uri(&self) -> &str {
            "urn:test:counts"
        }

        fn apply<'a>(&self, input: SignatureInput<'a>) -> Result<SignatureInput<'a>, Error>
        where
            'd: 'a,
        {
            self.0.set(self.0.get() + 1);
            Ok(input)
        }
    }

    fn c14n() -> Box<CanonicalizationTransform> {
        Box::new(CanonicalizationTransform::new(Arc::new(
            InclusiveCanonicalizer::new(C14nVersion::V10, false),
        )))
    }

    #[test]
    fn test_first_failure_short_circuits() {
        let calls = Cell::new(0);
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Fails));
        pipeline.push(Box::new(Counts(&calls)));

        let err = pipeline
            .apply(SignatureInput::from_octets(b"x".to_vec()))
            .unwrap_err();
        assert_eq!(err.message_key(), "test.Fails");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_transforms_run_in_order() {
        let calls = Cell::new(0);
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Counts(&calls)));
        pipeline.push(Box::new(Counts(&calls)));
        let out = pipeline
            .apply(SignatureInput::from_octets(b"x".to_vec()))
            .unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(out.octets(), Some(&b"x"[..]));
    }

    #[test]
    fn test_canonicalization_streams_into_sink() {
        let doc = roxmltree::Document::parse("<a b='1'/>").unwrap();
        let mut pipeline = TransformPipeline::new();
        pipeline.push(c14n());

        let mut sink = Vec::new();
        let out = pipeline
            .apply_streaming(SignatureInput::from_document(&doc, false), &mut sink)
            .unwrap();
        assert!(out.is_streamed());
        assert!(!out.has_sink());
        drop(out);
        assert_eq!(sink, br#"<a b="1"></a>"#);
    }

    #[test]
    fn test_sink_rides_along_without_final_canonicalization() {
        let calls = Cell::new(0);
        let mut pipeline = TransformPipeline::new();
        pipeline.push(c14n());
        pipeline.push(Box::new(Counts(&calls)));

        let doc = roxmltree::Document::parse("<a/>").unwrap();
        let mut sink = Vec::new();
        let mut out = pipeline
            .apply_streaming(SignatureInput::from_document(&doc, false), &mut sink)
            .unwrap();
        assert_eq!(out.octets(), Some(&b"<a></a>"[..]));
        assert!(out.take_sink().is_some());
    }
}
