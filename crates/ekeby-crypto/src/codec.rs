#![forbid(unsafe_code)]

//! Conversion between DER `SEQUENCE { INTEGER r, INTEGER s }` and the
//! XML-DSig fixed-width `r‖s` signature value.
//!
//! Each component of the fixed form is left-padded with zero bytes to the
//! component width `w` of the algorithm (20 for DSA with SHA-1, 32 for
//! P-256, and so on).

use ekeby_core::error::CodecFault;
use ekeby_core::Error;

const SEQUENCE: u8 = 0x30;
const INTEGER: u8 = 0x02;
const LONG_FORM_1: u8 = 0x81;

/// Largest component width whose DER encoding still fits a one-byte length.
pub const MAX_WIDTH: usize = 124;

fn structure(reason: impl Into<String>) -> Error {
    Error::InvalidEncoding(CodecFault::Structure(reason.into()))
}

fn check_width(w: usize) -> Result<(), Error> {
    if w == 0 || w > MAX_WIDTH {
        return Err(structure(format!("unsupported component width {w}")));
    }
    Ok(())
}

/// Convert a DER signature into the fixed `2w`-byte form.
///
/// Fails without partial output on a wrong tag, a length that disagrees
/// with the buffer, or an integer wider than `w` once its sign padding is
/// removed.
pub fn decode_asn1_to_fixed(asn1: &[u8], w: usize) -> Result<Vec<u8>, Error> {
    check_width(w)?;
    if asn1.len() < 2 || asn1[0] != SEQUENCE {
        return Err(structure("expected SEQUENCE tag 0x30"));
    }
    let (content_len, mut pos) = match asn1[1] {
        len if len < 0x80 => (usize::from(len), 2),
        LONG_FORM_1 => {
            let len = *asn1
                .get(2)
                .ok_or_else(|| structure("truncated length"))?;
            if len < 0x80 {
                return Err(structure("non-minimal length encoding"));
            }
            (usize::from(len), 3)
        }
        _ => return Err(structure("unsupported length encoding")),
    };
    if pos + content_len != asn1.len() {
        return Err(structure(format!(
            "SEQUENCE length {content_len} disagrees with {} byte buffer",
            asn1.len()
        )));
    }

    let r = read_integer(asn1, &mut pos, "r")?;
    let s = read_integer(asn1, &mut pos, "s")?;
    if pos != asn1.len() {
        return Err(structure("trailing bytes after s"));
    }

    let mut fixed = vec![0u8; 2 * w];
    place(&mut fixed[..w], r, "r")?;
    place(&mut fixed[w..], s, "s")?;
    Ok(fixed)
}

fn read_integer<'b>(
    buf: &'b [u8],
    pos: &mut usize,
    component: &'static str,
) -> Result<&'b [u8], Error> {
    match buf.get(*pos) {
        Some(&INTEGER) => {}
        _ => return Err(structure(format!("expected INTEGER tag for {component}"))),
    }
    let truncated = || structure(format!("truncated {component}"));
    let (len, start) = match *buf.get(*pos + 1).ok_or_else(truncated)? {
        0 => return Err(structure(format!("empty {component}"))),
        len if len < 0x80 => (usize::from(len), *pos + 2),
        LONG_FORM_1 => {
            let len = *buf.get(*pos + 2).ok_or_else(truncated)?;
            if len < 0x80 {
                return Err(structure(format!("non-minimal length for {component}")));
            }
            (usize::from(len), *pos + 3)
        }
        other => return Err(structure(format!("bad length byte {other:#04x} for {component}"))),
    };
    let value = buf
        .get(start..start + len)
        .ok_or_else(truncated)?;
    *pos = start + len;
    Ok(value)
}

fn place(slot: &mut [u8], integer: &[u8], component: &'static str) -> Result<(), Error> {
    let first = integer
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(integer.len());
    let digits = &integer[first..];
    let width = slot.len();
    if digits.len() > width {
        return Err(Error::InvalidEncoding(CodecFault::IntegerTooLong {
            component,
            length: digits.len(),
            width,
        }));
    }
    slot[width - digits.len()..].copy_from_slice(digits);
    Ok(())
}

/// Convert the fixed `2w`-byte form into a DER signature.
pub fn encode_fixed_to_asn1(fixed: &[u8], w: usize) -> Result<Vec<u8>, Error> {
    check_width(w)?;
    if fixed.len() != 2 * w {
        return Err(Error::InvalidEncoding(CodecFault::FixedLength {
            expected: 2 * w,
            actual: fixed.len(),
        }));
    }
    let r = minimal_integer(&fixed[..w]);
    let s = minimal_integer(&fixed[w..]);
    let content_len = 4 + r.len() + s.len();

    let mut out = Vec::with_capacity(content_len + 3);
    out.push(SEQUENCE);
    if content_len >= 0x80 {
        out.push(LONG_FORM_1);
    }
    out.push(content_len as u8);
    for integer in [&r, &s] {
        out.push(INTEGER);
        out.push(integer.len() as u8);
        out.extend_from_slice(integer);
    }
    Ok(out)
}

/// Strip leading zeros (keeping one byte) and add a sign byte if needed.
fn minimal_integer(component: &[u8]) -> Vec<u8> {
    let first = component
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(component.len().saturating_sub(1));
    let digits = &component[first..];
    let mut out = Vec::with_capacity(digits.len() + 1);
    if digits.first().is_some_and(|b| b & 0x80 != 0) {
        out.push(0);
    }
    out.extend_from_slice(digits);
    out
}

/// A codec bound to one component width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureCodec {
    width: usize,
}

impl SignatureCodec {
    pub const DSA_SHA1: Self = Self { width: 20 };
    pub const DSA_SHA256: Self = Self { width: 32 };
    pub const ECDSA_P256: Self = Self { width: 32 };
    pub const ECDSA_P384: Self = Self { width: 48 };
    pub const ECDSA_P521: Self = Self { width: 66 };

    pub fn new(width: usize) -> Result<Self, Error> {
        check_width(width)?;
        Ok(Self { width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// DER to `r‖s`.
    pub fn to_fixed(&self, asn1: &[u8]) -> Result<Vec<u8>, Error> {
        decode_asn1_to_fixed(asn1, self.width)
    }

    /// `r‖s` to DER.
    pub fn to_asn1(&self, fixed: &[u8]) -> Result<Vec<u8>, Error> {
        encode_fixed_to_asn1(fixed, self.width)
    }
}
