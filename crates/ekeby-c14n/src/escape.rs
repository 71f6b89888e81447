#![forbid(unsafe_code)]

//! Entity escaping for C14N output.
//!
//! - Text nodes: `&` → `&amp;`, `<` → `&lt;`, `>` → `&gt;`, `\r` → `&#xD;`
//! - Attribute values: `&`, `<`, `"`, `\t`, `\n`, `\r`
//! - PI data: `\r` → `&#xD;`

use std::io::{self, Write};

fn write_escaped(
    out: &mut dyn Write,
    s: &str,
    replace: impl Fn(u8) -> Option<&'static str>,
) -> io::Result<()> {
    let bytes = s.as_bytes();
    let mut start = 0;
    for (i, b) in bytes.iter().enumerate() {
        if let Some(entity) = replace(*b) {
            out.write_all(&bytes[start..i])?;
            out.write_all(entity.as_bytes())?;
            start = i + 1;
        }
    }
    out.write_all(&bytes[start..])
}

/// Write text node content.
pub fn write_text(out: &mut dyn Write, s: &str) -> io::Result<()> {
    write_escaped(out, s, |b| match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'\r' => Some("&#xD;"),
        _ => None,
    })
}

/// Write an attribute or namespace value.
pub fn write_attr(out: &mut dyn Write, s: &str) -> io::Result<()> {
    write_escaped(out, s, |b| match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'"' => Some("&quot;"),
        b'\t' => Some("&#x9;"),
        b'\n' => Some("&#xA;"),
        b'\r' => Some("&#xD;"),
        _ => None,
    })
}

/// Write processing instruction data.
pub fn write_pi(out: &mut dyn Write, s: &str) -> io::Result<()> {
    write_escaped(out, s, |b| (b == b'\r').then_some("&#xD;"))
}
