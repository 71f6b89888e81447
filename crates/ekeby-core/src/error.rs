#![forbid(unsafe_code)]

/// Why a signature encoding was rejected by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecFault {
    /// Tag or length bytes do not describe a `SEQUENCE { INTEGER, INTEGER }`.
    Structure(String),
    /// An integer is wider than the component width once sign padding is removed.
    IntegerTooLong {
        component: &'static str,
        length: usize,
        width: usize,
    },
    /// A fixed-width `r‖s` buffer has the wrong size.
    FixedLength { expected: usize, actual: usize },
}

impl std::fmt::Display for CodecFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structure(reason) => write!(f, "{reason}"),
            Self::IntegerTooLong {
                component,
                length,
                width,
            } => write!(
                f,
                "integer {component} is {length} bytes, component width is {width}"
            ),
            Self::FixedLength { expected, actual } => {
                write!(f, "expected {expected} bytes, got {actual}")
            }
        }
    }
}

/// Errors produced by the Ekeby XML signature core.
///
/// Every variant maps to a stable message key (see [`Error::message_key`])
/// so that an outer layer can localize it; the `Display` output is meant for
/// logs only.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid signature encoding: {0}")]
    InvalidEncoding(CodecFault),

    #[error("transformation failed: {message}")]
    Transformation {
        key: &'static str,
        message: String,
        /// Description of the node being processed when the failure happened.
        node: Option<String>,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("XPath evaluation error: {0}")]
    XPath(String),

    #[error("reference target not found: {id}")]
    ReferenceNotFound { id: String },

    #[error("no resource resolver can dereference {uri:?}")]
    NoResolverAvailable { uri: String },

    #[error("signature wrapping detected: identifier {id:?} is declared more than once")]
    SignatureWrapping { id: String },

    #[error("a storage resolver is required to resolve {element}")]
    StorageResolverRequired { element: String },

    #[error("key resolver {resolver} failed: {message}")]
    KeyResolution {
        resolver: &'static str,
        message: String,
    },

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a transformation error with no node context.
    pub fn transformation(key: &'static str, message: impl Into<String>) -> Self {
        Self::Transformation {
            key,
            message: message.into(),
            node: None,
            source: None,
        }
    }

    /// Stable message key for localization.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::XmlParse(_) => "xml.ParseError",
            Self::MissingElement(_) => "xml.WrongContent",
            Self::MissingAttribute(_) => "xml.MissingAttribute",
            Self::UnsupportedAlgorithm(_) => "algorithms.NoSuchAlgorithm",
            Self::InvalidEncoding(CodecFault::FixedLength { .. }) => {
                "algorithms.InvalidXMLDSIGFormat"
            }
            Self::InvalidEncoding(_) => "algorithms.InvalidASN1Format",
            Self::Transformation { key, .. } => key,
            Self::XPath(_) => "xpath.EvaluationError",
            Self::ReferenceNotFound { .. } => "signature.Verification.MissingID",
            Self::NoResolverAvailable { .. } => "utils.resolver.noClass",
            Self::SignatureWrapping { .. } => "signature.Verification.MultipleIDs",
            Self::StorageResolverRequired { .. } => "KeyResolver.needStorageResolver",
            Self::KeyResolution { .. } => "KeyResolver.error",
            Self::Crypto(_) => "algorithms.CryptoError",
            Self::Key(_) => "algorithms.WrongKeyForThisOperation",
            Self::Certificate(_) => "certificate.error",
            Self::Base64(_) => "decoding.base64",
            Self::Io(_) => "generic.IOError",
        }
    }

    /// Positional arguments that accompany [`Error::message_key`].
    pub fn message_args(&self) -> Vec<String> {
        match self {
            Self::XmlParse(s)
            | Self::MissingElement(s)
            | Self::MissingAttribute(s)
            | Self::UnsupportedAlgorithm(s)
            | Self::XPath(s)
            | Self::Crypto(s)
            | Self::Key(s)
            | Self::Certificate(s)
            | Self::Base64(s) => vec![s.clone()],
            Self::InvalidEncoding(fault) => vec![fault.to_string()],
            Self::Transformation { message, node, .. } => {
                let mut args = vec![message.clone()];
                args.extend(node.iter().cloned());
                args
            }
            Self::ReferenceNotFound { id } | Self::SignatureWrapping { id } => vec![id.clone()],
            Self::NoResolverAvailable { uri } => vec![uri.clone()],
            Self::StorageResolverRequired { element } => vec![element.clone()],
            Self::KeyResolution { resolver, message } => {
                vec![(*resolver).to_owned(), message.clone()]
            }
            Self::Io(e) => vec![e.to_string()],
        }
    }

    /// True for rejections that indicate an attack on the signature rather
    /// than a merely malformed document.
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::SignatureWrapping { .. }
                | Self::InvalidEncoding(CodecFault::IntegerTooLong { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_is_security_violation() {
        let err = Error::SignatureWrapping { id: "dup1".into() };
        assert!(err.is_security_violation());
        assert_eq!(err.message_key(), "signature.Verification.MultipleIDs");
        assert_eq!(err.message_args(), vec!["dup1".to_string()]);
    }

    #[test]
    fn test_oversized_integer_is_distinct_from_structure() {
        let too_long = Error::InvalidEncoding(CodecFault::IntegerTooLong {
            component: "r",
            length: 21,
            width: 20,
        });
        let malformed = Error::InvalidEncoding(CodecFault::Structure("bad tag".into()));
        assert!(too_long.is_security_violation());
        assert!(!malformed.is_security_violation());
    }

    #[test]
    fn test_transformation_args_include_node() {
        let err = Error::Transformation {
            key: "signature.Transform.node",
            message: "boom".into(),
            node: Some("element {urn:x}a".into()),
            source: None,
        };
        assert_eq!(err.message_args(), vec!["boom", "element {urn:x}a"]);
    }
}
