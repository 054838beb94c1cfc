/*
 * transfer.rs
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

//! Content-Transfer-Encoding decoding (RFC 2045 §6).

use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine};
use tracing::warn;

use crate::mime::quoted_printable;

/// Standard alphabet, padding optional, trailing bits tolerated.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a body according to its Content-Transfer-Encoding. 7bit, 8bit,
/// binary, a missing header and unknown encodings are the identity.
pub fn decode_transfer_encoding(encoding: Option<&str>, raw: &[u8]) -> Vec<u8> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("base64") => decode_base64(raw),
        Some("quoted-printable") => quoted_printable::decode(raw),
        None | Some("7bit") | Some("8bit") | Some("binary") | Some("") => raw.to_vec(),
        Some(other) => {
            warn!("unknown content-transfer-encoding {}, using body as is", other);
            raw.to_vec()
        }
    }
}

fn decode_base64(raw: &[u8]) -> Vec<u8> {
    let compact: Vec<u8> = raw.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
    match LENIENT_BASE64.decode(&compact) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("undecodable base64 body ({}), using raw bytes", e);
            raw.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_with_line_breaks_and_missing_padding() {
        assert_eq!(decode_transfer_encoding(Some("Base64"), b"SGVsbG8s\r\nIHdvcmxk"), b"Hello, world".to_vec());
        assert_eq!(decode_transfer_encoding(Some("base64"), b"SGk"), b"Hi".to_vec());
    }

    #[test]
    fn bad_base64_falls_back_to_raw() {
        assert_eq!(decode_transfer_encoding(Some("base64"), b"not*base64!"), b"not*base64!".to_vec());
    }

    #[test]
    fn identity_and_qp() {
        assert_eq!(decode_transfer_encoding(None, b"as is"), b"as is".to_vec());
        assert_eq!(decode_transfer_encoding(Some("8bit"), b"as is"), b"as is".to_vec());
        assert_eq!(decode_transfer_encoding(Some("quoted-printable"), b"a=3Db"), b"a=b".to_vec());
    }
}
