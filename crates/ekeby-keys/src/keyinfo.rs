#![forbid(unsafe_code)]

//! KeyInfo XML processing: reads the children of `<ds:KeyInfo>` into
//! [`KeyInfoContent`] values.

use crate::key::PublicKey;
use crate::x509::X509Certificate;
use base64::Engine;
use ekeby_core::{ns, Error};
use ekeby_xml::document::{child_elements, element_text, find_child_element, is_element};
use roxmltree::Node;

/// One child of a `<KeyInfo>` element.
#[derive(Debug, Clone)]
pub enum KeyInfoContent {
    KeyName(String),
    KeyValue(KeyValue),
    X509Data(X509Data),
    RetrievalMethod(RetrievalMethod),
    /// Any element this parser does not model, by local name.
    Other(String),
}

impl KeyInfoContent {
    /// Parse one `<KeyInfo>` child element.
    pub fn parse(element: Node<'_, '_>) -> Result<Self, Error> {
        let local = element.tag_name().name();
        if element.tag_name().namespace() != Some(ns::DSIG) {
            return Ok(Self::Other(local.to_owned()));
        }
        match local {
            ns::node::KEY_NAME => Ok(Self::KeyName(element_text(element).trim().to_owned())),
            ns::node::KEY_VALUE => KeyValue::parse(element).map(Self::KeyValue),
            ns::node::X509_DATA => X509Data::parse(element).map(Self::X509Data),
            ns::node::RETRIEVAL_METHOD => RetrievalMethod::parse(element).map(Self::RetrievalMethod),
            _ => Ok(Self::Other(local.to_owned())),
        }
    }
}

/// Parse every element child of a `<KeyInfo>` element, in document order.
pub fn parse_key_info(key_info: Node<'_, '_>) -> Result<Vec<KeyInfoContent>, Error> {
    key_info
        .children()
        .filter(Node::is_element)
        .map(KeyInfoContent::parse)
        .collect()
}

// ── X509Data ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerSerial {
    pub issuer_name: String,
    /// Decimal serial number as written in the document.
    pub serial_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct X509Data {
    pub issuer_serials: Vec<IssuerSerial>,
    /// DER encodings of the embedded `<X509Certificate>` elements.
    pub certificates: Vec<Vec<u8>>,
    pub subject_names: Vec<String>,
    pub skis: Vec<Vec<u8>>,
}

impl X509Data {
    /// Parse a `<ds:X509Data>` element. Any other element is an error.
    pub fn parse(element: Node<'_, '_>) -> Result<Self, Error> {
        if !is_element(element, ns::DSIG, ns::node::X509_DATA) {
            return Err(Error::MissingElement(ns::node::X509_DATA.into()));
        }
        let mut data = Self::default();
        for child in element.children().filter(|c| c.tag_name().namespace() == Some(ns::DSIG)) {
            match child.tag_name().name() {
                ns::node::X509_ISSUER_SERIAL => {
                    let issuer_name = required_text(child, ns::node::X509_ISSUER_NAME)?;
                    let serial_number = required_text(child, ns::node::X509_SERIAL_NUMBER)?;
                    data.issuer_serials.push(IssuerSerial {
                        issuer_name,
                        serial_number,
                    });
                }
                ns::node::X509_CERTIFICATE => {
                    data.certificates.push(decode_base64(child, ns::node::X509_CERTIFICATE)?);
                }
                ns::node::X509_SUBJECT_NAME => {
                    data.subject_names.push(element_text(child).trim().to_owned());
                }
                ns::node::X509_SKI => data.skis.push(decode_base64(child, ns::node::X509_SKI)?),
                _ => {}
            }
        }
        Ok(data)
    }

    pub fn contains_issuer_serial(&self) -> bool {
        !self.issuer_serials.is_empty()
    }

    /// Parse the embedded certificates.
    pub fn parsed_certificates(&self) -> Result<Vec<X509Certificate>, Error> {
        self.certificates
            .iter()
            .map(|der| X509Certificate::from_der(der))
            .collect()
    }
}

fn required_text(parent: Node<'_, '_>, local: &str) -> Result<String, Error> {
    find_child_element(parent, ns::DSIG, local)
        .map(|n| element_text(n).trim().to_owned())
        .ok_or_else(|| Error::MissingElement(local.into()))
}

fn decode_base64(element: Node<'_, '_>, what: &str) -> Result<Vec<u8>, Error> {
    let clean: String = element_text(element)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

// ── KeyValue ─────────────────────────────────────────────────────────

/// Inline public key parameters, as big-endian unsigned integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    Rsa { modulus: Vec<u8>, exponent: Vec<u8> },
    Dsa { p: Vec<u8>, q: Vec<u8>, g: Vec<u8>, y: Vec<u8> },
}

impl KeyValue {
    /// Parse `<ds:KeyValue>` or one of its `<RSAKeyValue>` / `<DSAKeyValue>`
    /// children directly.
    pub fn parse(element: Node<'_, '_>) -> Result<Self, Error> {
        let inner = if is_element(element, ns::DSIG, ns::node::KEY_VALUE) {
            element
                .children()
                .find(|c| {
                    is_element(*c, ns::DSIG, ns::node::RSA_KEY_VALUE)
                        || is_element(*c, ns::DSIG, ns::node::DSA_KEY_VALUE)
                })
                .ok_or_else(|| Error::MissingElement("RSAKeyValue or DSAKeyValue".into()))?
        } else {
            element
        };

        if is_element(inner, ns::DSIG, ns::node::RSA_KEY_VALUE) {
            Ok(Self::Rsa {
                modulus: crypto_binary(inner, ns::node::RSA_MODULUS)?,
                exponent: crypto_binary(inner, ns::node::RSA_EXPONENT)?,
            })
        } else if is_element(inner, ns::DSIG, ns::node::DSA_KEY_VALUE) {
            Ok(Self::Dsa {
                p: crypto_binary(inner, ns::node::DSA_P)?,
                q: crypto_binary(inner, ns::node::DSA_Q)?,
                g: crypto_binary(inner, ns::node::DSA_G)?,
                y: crypto_binary(inner, ns::node::DSA_Y)?,
            })
        } else {
            Err(Error::MissingElement("RSAKeyValue or DSAKeyValue".into()))
        }
    }

    pub fn to_public_key(&self) -> Result<PublicKey, Error> {
        match self {
            Self::Rsa { modulus, exponent } => {
                let n = rsa::BigUint::from_bytes_be(modulus);
                let e = rsa::BigUint::from_bytes_be(exponent);
                rsa::RsaPublicKey::new(n, e)
                    .map(PublicKey::Rsa)
                    .map_err(|err| Error::Key(format!("invalid RSA public key: {err}")))
            }
            Self::Dsa { p, q, g, y } => {
                let components = dsa::Components::from_components(
                    dsa::BigUint::from_bytes_be(p),
                    dsa::BigUint::from_bytes_be(q),
                    dsa::BigUint::from_bytes_be(g),
                )
                .map_err(|e| Error::Key(format!("invalid DSA components: {e}")))?;
                dsa::VerifyingKey::from_components(components, dsa::BigUint::from_bytes_be(y))
                    .map(PublicKey::Dsa)
                    .map_err(|e| Error::Key(format!("invalid DSA public key: {e}")))
            }
        }
    }
}

/// Decode a `CryptoBinary` child. Some interop vectors carry hex instead of
/// base64, so hex is accepted when base64 fails.
fn crypto_binary(parent: Node<'_, '_>, local: &str) -> Result<Vec<u8>, Error> {
    let text = find_child_element(parent, ns::DSIG, local)
        .map(element_text)
        .ok_or_else(|| Error::MissingElement(local.into()))?;
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if clean.is_empty() {
        return Err(Error::Base64(format!("{local}: empty value")));
    }
    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(&clean) {
        return Ok(bytes);
    }
    if clean.len() % 2 == 0 && clean.bytes().all(|b| b.is_ascii_hexdigit()) {
        let bytes: Result<Vec<u8>, _> = (0..clean.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&clean[i..i + 2], 16))
            .collect();
        if let Ok(bytes) = bytes {
            return Ok(bytes);
        }
    }
    Err(Error::Base64(format!("{local}: not base64 or hex")))
}

// ── RetrievalMethod ──────────────────────────────────────────────────

/// A pointer to key material stored elsewhere. Parsed only; nothing here
/// dereferences it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalMethod {
    pub uri: String,
    pub ref_type: Option<String>,
    /// Algorithm URIs of the `<Transforms>`, in order.
    pub transforms: Vec<String>,
}

impl RetrievalMethod {
    pub fn parse(element: Node<'_, '_>) -> Result<Self, Error> {
        let uri = element
            .attribute(ns::attr::URI)
            .ok_or_else(|| Error::MissingAttribute(format!("{} on RetrievalMethod", ns::attr::URI)))?;
        let transforms = match find_child_element(element, ns::DSIG, ns::node::TRANSFORMS) {
            Some(t) => child_elements(t, ns::DSIG, ns::node::TRANSFORM)
                .into_iter()
                .map(|t| {
                    t.attribute(ns::attr::ALGORITHM)
                        .map(str::to_owned)
                        .ok_or_else(|| Error::MissingAttribute(ns::attr::ALGORITHM.into()))
                })
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            uri: uri.to_owned(),
            ref_type: element.attribute(ns::attr::TYPE).map(str::to_owned),
            transforms,
        })
    }
}
