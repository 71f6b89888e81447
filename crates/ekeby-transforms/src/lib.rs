#![forbid(unsafe_code)]

//! Transform pipeline engine for the Ekeby XML signature core.
//!
//! Each reference carries an ordered list of transforms that turn the
//! dereferenced [`ekeby_xml::SignatureInput`] into the bytes that get
//! digested. Transforms are created from their `Algorithm` URI through a
//! [`TransformRegistry`].

pub mod base64_transform;
pub mod enveloped;
pub mod pipeline;
pub mod registry;
pub mod xpath_filter;

pub use pipeline::{CanonicalizationTransform, Transform, TransformPipeline};
pub use registry::{TransformFactory, TransformRegistry};
