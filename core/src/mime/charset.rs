/*
 * charset.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of msgmta, a Microsoft Graph mail relay.
 *
 * msgmta is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * msgmta is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with msgmta.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Charset decoding for header values and text bodies.

use encoding_rs::Encoding;
use tracing::warn;

/// Raw header bytes to text: UTF-8 when valid, otherwise ISO-8859-1.
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => decode_latin1(bytes),
    }
}

/// Decode body bytes in the named charset. Missing charset means UTF-8 (which
/// also covers US-ASCII). Labels are resolved with the WHATWG label table;
/// unknown labels fall back to lossy UTF-8.
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let label = charset.map(|c| c.trim().trim_matches('"').to_ascii_lowercase());
    match label.as_deref() {
        None | Some("") | Some("utf-8") | Some("utf8") | Some("us-ascii") | Some("ascii") => {
            String::from_utf8_lossy(bytes).into_owned()
        }
        // WHATWG folds these into windows-1252; keep them byte-to-code-point.
        Some("iso-8859-1") | Some("iso8859-1") | Some("latin1") | Some("latin-1") | Some("l1") => {
            decode_latin1(bytes)
        }
        Some(other) => match Encoding::for_label(other.as_bytes()) {
            Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
            None => {
                warn!("unsupported charset {}, decoding as UTF-8", other);
                String::from_utf8_lossy(bytes).into_owned()
            }
        },
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bytes_fall_back_to_latin1() {
        assert_eq!(decode_header_bytes("Grüße".as_bytes()), "Grüße");
        assert_eq!(decode_header_bytes(b"Gr\xfc\xdfe"), "Grüße");
    }

    #[test]
    fn body_charsets() {
        assert_eq!(decode_charset(b"caf\xe9", Some("ISO-8859-1")), "café");
        assert_eq!(decode_charset(b"\x93quoted\x94 \x80", Some("windows-1252")), "\u{201C}quoted\u{201D} €");
        assert_eq!(decode_charset("naïve".as_bytes(), None), "naïve");
        assert_eq!(decode_charset(b"plain", Some("x-unknown")), "plain");
    }

    #[test]
    fn non_latin_charsets() {
        assert_eq!(decode_charset(b"\xb1\xe6", Some("iso-8859-2")), "ąć");
        assert_eq!(decode_charset(b"price 5\xa4", Some("ISO-8859-15")), "price 5€");
        assert_eq!(decode_charset(b"\xf0\xd2\xc9\xd7\xc5\xd4", Some("koi8-r")), "Привет");
        assert_eq!(
            decode_charset(b"\x82\xb1\x82\xf1\x82\xc9\x82\xbf\x82\xcd", Some("shift_jis")),
            "こんにちは"
        );
        assert_eq!(decode_charset(b"\x1b$BF|K\\8l\x1b(B", Some("iso-2022-jp")), "日本語");
    }
}
