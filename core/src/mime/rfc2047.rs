/*
 * rfc2047.rs
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

//! RFC 2047 encoded-word decoding (e.g. =?charset?q?text?=) for unstructured
//! header values such as Subject.

use base64::Engine;

use crate::mime::charset::decode_charset;
use crate::mime::quoted_printable;
use crate::mime::transfer::LENIENT_BASE64;

/// Expand encoded-words in the string. Linear whitespace between two adjacent
/// encoded-words is dropped; anything that fails to decode is kept literally.
pub fn decode_encoded_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    // Previous token was an encoded-word.
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (literal, candidate) = rest.split_at(start);
        match decode_one(candidate) {
            Some((decoded, consumed)) => {
                let only_space = literal.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'));
                if !(after_word && only_space) {
                    out.push_str(literal);
                }
                out.push_str(&decoded);
                rest = &candidate[consumed..];
                after_word = true;
            }
            None => {
                out.push_str(literal);
                out.push_str("=?");
                rest = &candidate[2..];
                after_word = false;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode one encoded-word at the start of s. Returns (text, bytes consumed).
fn decode_one(s: &str) -> Option<(String, usize)> {
    let body = s.strip_prefix("=?")?;
    let q1 = body.find('?')?;
    let charset = &body[..q1];
    let after_charset = &body[q1 + 1..];
    let q2 = after_charset.find('?')?;
    let encoding = &after_charset[..q2];
    let payload_and_rest = &after_charset[q2 + 1..];
    let end = payload_and_rest.find("?=")?;
    let payload = &payload_and_rest[..end];
    if charset.is_empty() || payload.contains(' ') {
        return None;
    }
    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = if encoding.eq_ignore_ascii_case("b") {
        LENIENT_BASE64.decode(payload.as_bytes()).ok()?
    } else if encoding.eq_ignore_ascii_case("q") {
        let unscored: Vec<u8> = payload
            .bytes()
            .map(|b| if b == b'_' { b' ' } else { b })
            .collect();
        quoted_printable::decode(&unscored)
    } else {
        return None;
    };
    let consumed = 2 + q1 + 1 + q2 + 1 + end + 2;
    Some((decode_charset(&bytes, Some(charset)), consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q_and_b_words() {
        assert_eq!(decode_encoded_words("=?UTF-8?Q?Caf=C3=A9_au_lait?="), "Café au lait");
        assert_eq!(decode_encoded_words("=?utf-8?B?SGVsbG8gV29ybGQ=?="), "Hello World");
        assert_eq!(decode_encoded_words("Re: =?ISO-8859-1?Q?r=E9sum=E9?= attached"), "Re: résumé attached");
    }

    #[test]
    fn words_in_other_charsets() {
        assert_eq!(decode_encoded_words("=?koi8-r?B?8NLJ18XU?="), "Привет");
        assert_eq!(decode_encoded_words("=?ISO-2022-JP?B?GyRCRnxLXDhsGyhC?="), "日本語");
        assert_eq!(decode_encoded_words("=?iso-8859-2?Q?=B1=E6?="), "ąć");
    }

    #[test]
    fn adjacent_words_join_without_space() {
        assert_eq!(decode_encoded_words("=?utf-8?q?ab?= \r\n =?utf-8?q?cd?="), "abcd");
    }

    #[test]
    fn broken_words_are_literal() {
        assert_eq!(decode_encoded_words("price =? 5"), "price =? 5");
        assert_eq!(decode_encoded_words("=?utf-8?x?abc?="), "=?utf-8?x?abc?=");
        assert_eq!(decode_encoded_words("plain subject"), "plain subject");
    }
}
