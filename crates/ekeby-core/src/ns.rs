#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// MIME type attached to every same-document resolution result.
pub const MIME_TEXT_XML: &str = "text/xml";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // DSig elements
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const XPATH: &str = "XPath";

    // KeyInfo elements
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";
    pub const KEY_VALUE: &str = "KeyValue";
    pub const RETRIEVAL_METHOD: &str = "RetrievalMethod";

    // RSA elements
    pub const RSA_KEY_VALUE: &str = "RSAKeyValue";
    pub const RSA_MODULUS: &str = "Modulus";
    pub const RSA_EXPONENT: &str = "Exponent";

    // DSA elements
    pub const DSA_KEY_VALUE: &str = "DSAKeyValue";
    pub const DSA_P: &str = "P";
    pub const DSA_Q: &str = "Q";
    pub const DSA_G: &str = "G";
    pub const DSA_Y: &str = "Y";

    // X509 elements
    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
    pub const X509_SUBJECT_NAME: &str = "X509SubjectName";
    pub const X509_ISSUER_SERIAL: &str = "X509IssuerSerial";
    pub const X509_ISSUER_NAME: &str = "X509IssuerName";
    pub const X509_SERIAL_NUMBER: &str = "X509SerialNumber";
    pub const X509_SKI: &str = "X509SKI";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const ALGORITHM: &str = "Algorithm";
}
