/*
 * mod.rs
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

//! Event-driven MIME message parsing (push/handler model, non-blocking buffer contract)
//! and the decoders needed to turn a text part into a string.

mod address;
mod charset;
mod content_type;
mod handler;
mod parser;
mod quoted_printable;
mod rfc2047;
mod transfer;
mod utils;

pub use address::{address_tokens, parse_address_list};
pub use charset::{decode_charset, decode_header_bytes};
pub use content_type::{parse_content_type, parse_parameter_list, ContentType};
pub use handler::{MimeHandler, MimeLocator, MimeParseError};
pub use parser::{parse_bytes, MimeParser};
pub use rfc2047::decode_encoded_words;
pub use transfer::decode_transfer_encoding;
pub use utils::{is_token, is_token_char, is_valid_boundary};
