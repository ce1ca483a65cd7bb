//! Small quick-xml helpers shared by the part decoders.

use quick_xml::events::{BytesStart, BytesText};

/// Value of the attribute whose local name is `key`, unescaped.
///
/// Namespace prefixes are ignored, so `b"id"` matches `r:id`.
pub(crate) fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// Boolean flag element value (`<b/>`, `<b val="0"/>`, `<b val="true"/>`).
pub(crate) fn flag(e: &BytesStart) -> bool {
    match attr(e, b"val") {
        Some(v) => !matches!(v.as_str(), "0" | "false"),
        None => true,
    }
}

/// Unescaped text content, falling back to lossy UTF-8.
pub(crate) fn text(e: &BytesText) -> String {
    match e.unescape() {
        Ok(t) => t.into_owned(),
        Err(_) => String::from_utf8_lossy(e).into_owned(),
    }
}

/// Decode Excel's `_xHHHH_` escape sequences.
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("Line1_x000a_Line2"), "Line1\nLine2");
        assert_eq!(decode_excel_escapes("a_x0009_b_x000D_"), "a\tb\r");
        assert_eq!(decode_excel_escapes("_x005f_x0041_"), "_x0041_");
        assert_eq!(decode_excel_escapes("no escapes"), "no escapes");
        assert_eq!(decode_excel_escapes("_x12_"), "_x12_");
        assert_eq!(decode_excel_escapes("tail_x"), "tail_x");
    }

    #[test]
    fn test_attr_ignores_prefix() {
        let xml = r#"<drawing xmlns:r="urn:r" r:id="rId4" name="a &amp; b"/>"#;
        let mut reader = quick_xml::Reader::from_str(xml);
        match reader.read_event().unwrap() {
            quick_xml::events::Event::Empty(e) => {
                assert_eq!(attr(&e, b"id").as_deref(), Some("rId4"));
                assert_eq!(attr(&e, b"name").as_deref(), Some("a & b"));
                assert_eq!(attr(&e, b"missing"), None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
