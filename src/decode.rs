// src/decode.rs
//! Document bytes -> text.
//!
//! Encoding is chosen in this order: byte-order mark, transport charset
//! (`Content-Type`), `<meta charset>` / `http-equiv` in the first KiB, then
//! UTF-8 if the bytes are valid UTF-8, else windows-1252.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252, X_USER_DEFINED};

use crate::error::ExtractError;

/// How many leading bytes are inspected for a meta charset and for NULs.
const PRESCAN_LEN: usize = 1024;

#[derive(Debug)]
pub struct DecodedHtml<'a> {
    pub text: Cow<'a, str>,
    pub encoding: &'static Encoding,
}

/// Decode `body` as an HTML document.
///
/// Fails only when no encoding was declared by a BOM or an ASCII-incompatible
/// charset and the head contains NUL bytes (images, PDFs and the like).
pub fn decode_html<'a>(
    body: &'a [u8],
    transport_charset: Option<&str>,
) -> Result<DecodedHtml<'a>, ExtractError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(body) {
        let (text, _) = encoding.decode_without_bom_handling(&body[bom_len..]);
        return Ok(DecodedHtml { text, encoding });
    }

    let head = &body[..body.len().min(PRESCAN_LEN)];
    let declared = transport_charset
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .or_else(|| prescan_meta_charset(head));

    if let Some(encoding) = declared {
        if !encoding.is_ascii_compatible() {
            let (text, _) = encoding.decode_without_bom_handling(body);
            return Ok(DecodedHtml { text, encoding });
        }
    }

    if head.contains(&0u8) {
        return Err(ExtractError::Parse(
            "response body is binary, not an HTML document".into(),
        ));
    }

    let encoding = match declared {
        Some(encoding) => encoding,
        None if std::str::from_utf8(body).is_ok() => UTF_8,
        None => WINDOWS_1252,
    };
    let (text, _) = encoding.decode_without_bom_handling(body);
    Ok(DecodedHtml { text, encoding })
}

/// `charset` parameter of a `Content-Type` header value, lower-cased.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    let at = lower.find("charset")?;
    let value = charset_value(&lower.as_bytes()[at + "charset".len()..])?;
    Some(String::from_utf8_lossy(value).into_owned())
}

/// First `<meta>` in `head` that names a known charset, either directly or
/// through `content="text/html; charset=..."`.
fn prescan_meta_charset(head: &[u8]) -> Option<&'static Encoding> {
    let lower = head.to_ascii_lowercase();
    let mut rest: &[u8] = &lower;
    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start + "<meta".len()..];
        let end = tag.iter().position(|&b| b == b'>').unwrap_or(tag.len());
        let attrs = &tag[..end];
        let label =
            find(attrs, b"charset").and_then(|i| charset_value(&attrs[i + "charset".len()..]));
        if let Some(encoding) = label.and_then(Encoding::for_label) {
            return Some(meta_override(encoding));
        }
        rest = &tag[end..];
    }
    None
}

// A document that can carry an ASCII meta tag is not UTF-16.
fn meta_override(encoding: &'static Encoding) -> &'static Encoding {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        UTF_8
    } else if encoding == X_USER_DEFINED {
        WINDOWS_1252
    } else {
        encoding
    }
}

/// Label following `charset`: `= "utf-8"`, `=utf-8;`, `='latin1'` ...
fn charset_value(after: &[u8]) -> Option<&[u8]> {
    let skip = after.iter().position(|b| !b.is_ascii_whitespace())?;
    let after = match after[skip..].split_first() {
        Some((b'=', rest)) => rest,
        _ => return None,
    };
    let skip = after
        .iter()
        .position(|&b| !b.is_ascii_whitespace() && b != b'"' && b != b'\'')?;
    let after = &after[skip..];
    let len = after
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace())
        .unwrap_or(after.len());
    (len > 0).then(|| &after[..len])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
