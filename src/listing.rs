//! C header listings of byte arrays.
//!
//! Bitmap converters emit frames as `const uint8_t name[] = { 0x.., ... };`
//! declarations. This module extracts them in declaration order and writes
//! converted arrays back out in the same shape.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use crate::schema::NamedBuffers;

static ARRAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?:static\s+)?const\s+(?:uint8_t|unsigned\s+char)\s+(\w+)\s*\[\s*\d*\s*\]\s*(?:PROGMEM\s*)?=\s*\{([^}]*)\}",
    )
    .expect("array pattern is valid")
});

static COMMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)//[^\n]*|/\*.*?\*/").expect("comment pattern is valid"));

/// Bytes written per line by [`write_column_header`].
const BYTES_PER_LINE: usize = 16;

/// Parse one element of an array initializer.
fn parse_value(token: &str) -> Option<u8> {
    match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => token.parse().ok(),
    }
}

/// Extract every byte array of a listing, in declaration order.
///
/// Arrays without a single usable value are declared without data. A repeated
/// name keeps its first definition.
pub fn parse_listing(text: &str) -> NamedBuffers {
    let mut buffers = NamedBuffers::new();

    for caps in ARRAY_PATTERN.captures_iter(text) {
        let name = &caps[1];
        let body = COMMENT_PATTERN.replace_all(&caps[2], "");

        let mut values = Vec::new();
        for token in body.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match parse_value(token) {
                Some(v) => values.push(v),
                None => warn!("Array {name}: cannot parse value {token:?} as a byte"),
            }
        }

        if values.is_empty() {
            warn!("Array {name}: no byte values found");
            buffers.declare(name);
            continue;
        }

        debug!("Array {name}: {} bytes", values.len());
        if !buffers.insert(name, values) {
            warn!("Array {name}: duplicate definition ignored");
        }
    }

    buffers
}

/// Read and parse a listing file.
pub fn read_listing<P: AsRef<Path>>(path: P) -> io::Result<NamedBuffers> {
    Ok(parse_listing(&fs::read_to_string(path)?))
}

/// Write converted arrays as a C header, each renamed `<name>_column`.
pub fn write_column_header<W: Write>(
    w: &mut W,
    source: &str,
    arrays: &[(String, Vec<u8>)],
) -> io::Result<()> {
    writeln!(w, "// Column-major image data converted from a row-major listing")?;
    writeln!(w, "// Source: {source}")?;
    writeln!(w, "#ifndef CONVERTED_IMAGES_H")?;
    writeln!(w, "#define CONVERTED_IMAGES_H")?;
    writeln!(w)?;
    writeln!(w, "#include <avr/pgmspace.h>")?;
    writeln!(w)?;

    for (name, data) in arrays {
        writeln!(w, "// Converted from: {name} (column-major)")?;
        writeln!(w, "const uint8_t {name}_column[] PROGMEM = {{")?;
        for line in data.chunks(BYTES_PER_LINE) {
            let hex: Vec<String> = line.iter().map(|b| format!("0x{b:02X}")).collect();
            writeln!(w, "  {},", hex.join(", "))?;
        }
        writeln!(w, "}};")?;
        writeln!(w)?;
    }

    writeln!(w, "#endif // CONVERTED_IMAGES_H")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
#include <stdint.h>

// frame one
const uint8_t frame_b[] PROGMEM = {
    0x00, 0xFF, // first row
    0x0f, 12,
};

static const unsigned char frame_a[] = { /* block */ 0x01, 0X02 };
const unsigned char frame_c[4] = {0x10,0x20,0x30,0x40};
const uint8_t empty_frame[] = { };
const uint8_t frame_b[] = { 0xAA };
"#;

    #[test]
    fn test_parse_listing_order() {
        let buffers = parse_listing(LISTING);
        assert_eq!(
            buffers.names(),
            &["frame_b", "frame_a", "frame_c", "empty_frame"]
        );
        assert_eq!(buffers.get("frame_b"), Some(&[0x00, 0xFF, 0x0F, 12][..]));
        assert_eq!(buffers.get("frame_a"), Some(&[0x01, 0x02][..]));
        assert_eq!(buffers.get("frame_c"), Some(&[0x10, 0x20, 0x30, 0x40][..]));
        assert_eq!(buffers.get("empty_frame"), None);
    }

    #[test]
    fn test_invalid_tokens_skipped() {
        let buffers = parse_listing("const uint8_t f[] = { 0x01, 300, abc, 0x1FF, 7 };");
        assert_eq!(buffers.get("f"), Some(&[0x01, 7][..]));
    }

    #[test]
    fn test_no_arrays() {
        let buffers = parse_listing("int main(void) { return 0; }");
        assert!(buffers.is_empty());
    }

    #[test]
    fn test_column_header_reparses() {
        let data: Vec<u8> = (0..20).collect();
        let arrays = vec![("logo".to_string(), data.clone()), ("x".to_string(), vec![0xAB])];

        let mut out = Vec::new();
        write_column_header(&mut out, "logo.h", &arrays).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("#ifndef CONVERTED_IMAGES_H"));
        assert!(text.contains("// Source: logo.h"));
        assert!(text.contains(
            "  0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,\n  0x10, 0x11, 0x12, 0x13,\n"
        ));

        let parsed = parse_listing(&text);
        assert_eq!(parsed.names(), &["logo_column", "x_column"]);
        assert_eq!(parsed.get("logo_column"), Some(&data[..]));
        assert_eq!(parsed.get("x_column"), Some(&[0xAB][..]));
    }

    #[test]
    fn test_read_listing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.h");
        fs::write(&path, LISTING).unwrap();
        assert_eq!(read_listing(&path).unwrap().len(), 4);
        assert!(read_listing(dir.path().join("missing.h")).is_err());
    }
}
