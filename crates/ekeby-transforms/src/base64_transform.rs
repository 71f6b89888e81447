#![forbid(unsafe_code)]

//! Base64 decode transform.

use crate::pipeline::Transform;
use base64::Engine;
use ekeby_core::{algorithm, Error};
use ekeby_xml::{Content, SignatureInput};

/// Decodes Base64 content; node-set input contributes its selected text.
pub struct Base64DecodeTransform;

impl<'d> Transform<'d> for Base64DecodeTransform {
    fn uri(&self) -> &str {
        algorithm::BASE64
    }

    fn apply<'a>(&self, input: SignatureInput<'a>) -> Result<SignatureInput<'a>, Error>
    where
        'd: 'a,
    {
        let text = match input.content() {
            Content::Octets(data) => std::str::from_utf8(data)
                .map_err(|e| Error::Base64(format!("base64 input not UTF-8: {e}")))?
                .to_owned(),
            Content::NodeSet(nodes) => {
                let mut text = String::new();
                for node in nodes.apex().descendants().filter(|n| n.is_text()) {
                    if nodes.is_selected(node)? {
                        text.push_str(node.text().unwrap_or(""));
                    }
                }
                text
            }
            Content::Streamed => {
                return Err(Error::transformation(
                    "signature.Transform.Streamed",
                    "input was already streamed to a sink",
                ))
            }
        };

        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&cleaned)
            .map_err(|e| Error::Base64(format!("decode error: {e}")))?;

        Ok(SignatureInput::from_octets(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_octets_with_whitespace() {
        let out = Base64DecodeTransform
            .apply(SignatureInput::from_octets(b"aGVs\n bG8=".to_vec()))
            .unwrap();
        assert_eq!(out.octets(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_decode_element_text() {
        let doc = roxmltree::Document::parse("<v>aGVs<!--x-->bG8=</v>").unwrap();
        let input = SignatureInput::from_subtree(&doc, doc.root_element(), true);
        let out = Base64DecodeTransform.apply(input).unwrap();
        assert_eq!(out.octets(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_invalid_base64() {
        let err = Base64DecodeTransform
            .apply(SignatureInput::from_octets(b"%%%".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::Base64(_)));
    }
}
