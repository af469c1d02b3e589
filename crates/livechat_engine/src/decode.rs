use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

use crate::{FailureKind, FetchError};

/// Decodes a page body to UTF-8.
///
/// Order: byte order mark, then the `Content-Type` charset, then detection.
/// Bodies that are already valid UTF-8 skip detection.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Result<String, FetchError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_as(&bytes[bom_len..], encoding);
    }

    if let Some(encoding) = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_as(bytes, encoding);
    }

    if std::str::from_utf8(bytes).is_ok() {
        return decode_as(bytes, UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_as(bytes, detector.guess(None, true))
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

fn decode_as(bytes: &[u8], encoding: &'static Encoding) -> Result<String, FetchError> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(FetchError::new(
            FailureKind::Decode,
            format!("body is not valid {}", encoding.name()),
        ));
    }
    Ok(text.into_owned())
}
