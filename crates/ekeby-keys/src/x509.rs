#![forbid(unsafe_code)]

//! Parsed X.509 certificates and issuer/serial comparison.

use crate::key::PublicKey;
use base64::Engine;
use der::{Decode, Encode};
use ekeby_core::Error;

/// A certificate together with the fields key resolution looks at.
#[derive(Clone)]
pub struct X509Certificate {
    der: Vec<u8>,
    issuer: String,
    subject: String,
    serial: String,
    spki_der: Vec<u8>,
}

impl X509Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let cert = x509_cert::Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        let tbs = &cert.tbs_certificate;
        let spki_der = tbs
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
        Ok(Self {
            der: der.to_vec(),
            issuer: tbs.issuer.to_string(),
            subject: tbs.subject.to_string(),
            serial: serial_to_decimal(tbs.serial_number.as_bytes()),
            spki_der,
        })
    }

    /// Parse the base64 text of an `<X509Certificate>` element.
    pub fn from_base64(text: &str) -> Result<Self, Error> {
        let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let der = base64::engine::general_purpose::STANDARD
            .decode(clean)
            .map_err(|e| Error::Base64(format!("X509Certificate: {e}")))?;
        Self::from_der(&der)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Issuer distinguished name in RFC 4514 form.
    pub fn issuer_name(&self) -> &str {
        &self.issuer
    }

    pub fn subject_name(&self) -> &str {
        &self.subject
    }

    /// Serial number as an unsigned decimal string.
    pub fn serial_number(&self) -> &str {
        &self.serial
    }

    pub fn public_key(&self) -> Result<PublicKey, Error> {
        PublicKey::from_spki_der(&self.spki_der)
    }

    /// Exact issuer and serial equality after normalization. Never a
    /// substring or prefix match.
    pub fn matches_issuer_serial(&self, issuer_name: &str, serial_number: &str) -> bool {
        serials_equal(&self.serial, serial_number)
            && normalize_dn(&self.issuer) == normalize_dn(issuer_name)
    }
}

impl std::fmt::Debug for X509Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X509Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &self.serial)
            .finish()
    }
}

/// Normalize an RFC 2253/4514 distinguished name for comparison: attribute
/// types are upper-cased and whitespace around separators is dropped.
/// Escaped separators are kept as they are.
pub fn normalize_dn(dn: &str) -> String {
    let mut out = String::with_capacity(dn.len());
    let mut component = String::new();
    let mut chars = dn.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                component.push(c);
                if let Some(next) = chars.next() {
                    component.push(next);
                }
            }
            ',' | ';' | '+' => {
                push_component(&mut out, &component);
                out.push(if c == '+' { '+' } else { ',' });
                component.clear();
            }
            _ => component.push(c),
        }
    }
    push_component(&mut out, &component);
    out
}

fn push_component(out: &mut String, component: &str) {
    match component.split_once('=') {
        Some((kind, value)) => {
            out.push_str(&kind.trim().to_ascii_uppercase());
            out.push('=');
            out.push_str(value.trim());
        }
        None => out.push_str(component.trim()),
    }
}

/// Compare two decimal serial numbers as integers.
pub fn serials_equal(a: &str, b: &str) -> bool {
    fn digits(s: &str) -> Option<&str> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let stripped = s.trim_start_matches('0');
        Some(if stripped.is_empty() { "0" } else { stripped })
    }
    match (digits(a), digits(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Convert a big-endian ASN.1 INTEGER body to an unsigned decimal string.
pub(crate) fn serial_to_decimal(bytes: &[u8]) -> String {
    // Little-endian base-10 digits.
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            let value = u32::from(*digit) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    while digits.len() > 1 && digits.last() == Some(&0) {
        digits.pop();
    }
    digits.iter().rev().map(|d| char::from(b'0' + d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_to_decimal() {
        assert_eq!(serial_to_decimal(&[]), "0");
        assert_eq!(serial_to_decimal(&[0x00, 0x07]), "7");
        assert_eq!(serial_to_decimal(&[0x01, 0x00]), "256");
        assert_eq!(
            serial_to_decimal(&[0xff; 8]),
            u64::MAX.to_string()
        );
    }

    #[test]
    fn test_serials_compare_as_integers() {
        assert!(serials_equal("7", "007"));
        assert!(!serials_equal("7", "70"));
        assert!(!serials_equal("17", "7"));
        assert!(!serials_equal("7", "0x7"));
    }

    #[test]
    fn test_normalize_dn() {
        assert_eq!(normalize_dn("cn = I2 , o=Ekeby"), "CN=I2,O=Ekeby");
        assert_eq!(normalize_dn("CN=a\\,b;O=x"), "CN=a\\,b,O=x");
        assert_ne!(normalize_dn("CN=I2"), normalize_dn("CN=I22"));
    }
}
