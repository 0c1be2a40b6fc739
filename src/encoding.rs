// Bridge between the editor's EUC-JP pages and the UTF-8 files kept locally.
//
// Responses are decoded with `to_local` before anything looks at them.
// Outgoing form values go through `to_remote` and then `percent_encode`,
// which escapes the EUC-JP bytes themselves rather than the code points.
// A character only counts as mappable when it decodes back to itself.

use std::borrow::Cow;

use encoding_rs::EUC_JP;
use tracing::warn;

use crate::error::{Result, SyncError};

/// What to do with characters EUC-JP cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmappablePolicy {
    /// Fail with [`SyncError::Encoding`] naming the first offending character.
    #[default]
    Reject,
    /// Replace each offending character with an HTML numeric reference (`&#128512;`).
    NumericReference,
}

/// Decode an EUC-JP response body. Malformed sequences become U+FFFD.
pub fn to_local(bytes: &[u8]) -> String {
    let (text, had_errors) = EUC_JP.decode_without_bom_handling(bytes);
    if had_errors {
        warn!("response body contained malformed EUC-JP sequences; replaced with U+FFFD");
    }
    text.into_owned()
}

/// Encode text as EUC-JP. `origin` names the content in error messages.
///
/// Characters the encoder folds onto a different character (`¥` to 0x5C,
/// `‾` to 0x7E, `−` to 0xA1DD) are treated as unmappable, so whatever is
/// uploaded decodes back to exactly `text`.
pub fn to_remote<'a>(text: &'a str, policy: UnmappablePolicy, origin: &str) -> Result<Cow<'a, [u8]>> {
    let (bytes, _, had_errors) = EUC_JP.encode(text);
    if !had_errors && EUC_JP.decode_without_bom_handling(&bytes).0 == text {
        return Ok(bytes);
    }
    match policy {
        UnmappablePolicy::NumericReference => {
            warn!("{}: unmappable characters replaced with numeric references", origin);
            let mut out = Vec::with_capacity(bytes.len());
            let mut buf = [0u8; 4];
            for ch in text.chars() {
                match encode_char(ch, &mut buf) {
                    Some(encoded) => out.extend_from_slice(&encoded),
                    None => out.extend_from_slice(format!("&#{};", ch as u32).as_bytes()),
                }
            }
            Ok(Cow::Owned(out))
        }
        UnmappablePolicy::Reject => Err(first_unmappable(text, origin)),
    }
}

/// EUC-JP bytes for `ch`, or `None` when it does not survive a round trip.
fn encode_char(ch: char, buf: &mut [u8; 4]) -> Option<Vec<u8>> {
    let s = ch.encode_utf8(buf);
    let (bytes, _, bad) = EUC_JP.encode(s);
    if bad || EUC_JP.decode_without_bom_handling(&bytes).0 != *s {
        return None;
    }
    Some(bytes.into_owned())
}

/// Form-percent-encode raw legacy bytes.
pub fn percent_encode(bytes: &[u8]) -> String {
    url::form_urlencoded::byte_serialize(bytes).collect()
}

/// `to_remote` followed by `percent_encode`.
pub fn encode_form_value(text: &str, policy: UnmappablePolicy, origin: &str) -> Result<String> {
    let bytes = to_remote(text, policy, origin)?;
    Ok(percent_encode(&bytes))
}

fn first_unmappable(text: &str, origin: &str) -> SyncError {
    let mut buf = [0u8; 4];
    let mut line = 1;
    let mut column = 0;
    for ch in text.chars() {
        if ch == '\n' {
            line += 1;
            column = 0;
            continue;
        }
        column += 1;
        if encode_char(ch, &mut buf).is_none() {
            return SyncError::Encoding {
                origin: origin.to_string(),
                character: ch,
                code: ch as u32,
                line,
                column,
            };
        }
    }
    // only reached if the whole-text check and the per-character check disagree
    SyncError::Config(format!("{}: EUC-JP encoding did not round-trip", origin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_japanese_markup() {
        let text = "<div class=\"title\">こんにちは、世界！ｶﾀｶﾅ</div>\n.a { color: #fff; }";
        let bytes = to_remote(text, UnmappablePolicy::Reject, "test").unwrap();
        assert_eq!(to_local(&bytes), text);
    }

    #[test]
    fn encodes_to_euc_jp_bytes() {
        let bytes = to_remote("あ", UnmappablePolicy::Reject, "test").unwrap();
        assert_eq!(&*bytes, &[0xA4, 0xA2]);
    }

    #[test]
    fn percent_encodes_legacy_bytes_not_code_points() {
        let bytes = to_remote("あ", UnmappablePolicy::Reject, "test").unwrap();
        assert_eq!(percent_encode(&bytes), "%A4%A2");
        assert_eq!(percent_encode(b"<new>"), "%3Cnew%3E");
        assert_eq!(percent_encode(b"a b&c=d"), "a+b%26c%3Dd");
    }

    #[test]
    fn rejects_unmappable_characters_with_position() {
        let err = to_remote("ok\nab😀", UnmappablePolicy::Reject, "0_common.html").unwrap_err();
        match err {
            SyncError::Encoding {
                origin,
                character,
                line,
                column,
                ..
            } => {
                assert_eq!(origin, "0_common.html");
                assert_eq!(character, '😀');
                assert_eq!(line, 2);
                assert_eq!(column, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn numeric_reference_policy_substitutes() {
        let bytes = to_remote("a😀", UnmappablePolicy::NumericReference, "test").unwrap();
        assert_eq!(to_local(&bytes), "a&#128512;");
    }

    #[test]
    fn characters_folded_by_the_encoder_are_rejected() {
        for (text, ch) in [("price ¥100", '¥'), ("a‾b", '‾'), ("1 − 2", '−')] {
            match to_remote(text, UnmappablePolicy::Reject, "test") {
                Err(SyncError::Encoding { character, code, .. }) => {
                    assert_eq!(character, ch);
                    assert_eq!(code, ch as u32);
                }
                other => panic!("{text}: unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn folded_characters_become_numeric_references() {
        let bytes = to_remote("¥100 ‾ 1−2 円", UnmappablePolicy::NumericReference, "test").unwrap();
        assert_eq!(to_local(&bytes), "&#165;100 &#8254; 1&#8722;2 円");
        assert_eq!(
            encode_form_value("¥", UnmappablePolicy::NumericReference, "test").unwrap(),
            "%26%23165%3B"
        );
    }

    #[test]
    fn backslash_and_tilde_still_pass_through() {
        let bytes = to_remote("a\\b~c", UnmappablePolicy::Reject, "test").unwrap();
        assert_eq!(&*bytes, b"a\\b~c");
    }

    #[test]
    fn malformed_input_decodes_with_replacement() {
        assert_eq!(to_local(&[b'a', 0xA4]), "a\u{FFFD}");
    }
}
