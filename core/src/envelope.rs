/*
 * envelope.rs
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

//! Envelope: the parsed routing and content of one message.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::MtaError;
use crate::mime::{
    address_tokens, decode_charset, decode_encoded_words, decode_transfer_encoding,
    parse_bytes, parse_content_type, ContentType, MimeHandler, MimeParseError,
};

/// Only plain text is ever extracted, so this is the only content type reported.
pub const TEXT_PLAIN: &str = "text/plain";

/// One recipient, serialised in the Graph shape `{"emailAddress":{"address":...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    #[serde(rename = "emailAddress")]
    pub email_address: EmailAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub address: String,
}

impl Recipient {
    /// Recipient with surrounding whitespace removed from the address.
    pub fn new(address: &str) -> Self {
        Self {
            email_address: EmailAddress {
                address: address.trim().to_string(),
            },
        }
    }

    pub fn address(&self) -> &str {
        &self.email_address.address
    }
}

/// Map raw address strings to recipients: trimmed, order kept, no deduplication.
pub fn format_recipients<S: AsRef<str>>(addresses: &[S]) -> Vec<Recipient> {
    addresses.iter().map(|a| Recipient::new(a.as_ref())).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub subject: String,
    pub to: Vec<Recipient>,
    pub cc: Vec<Recipient>,
    pub bcc: Vec<Recipient>,
    pub content_type: String,
    pub content: String,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            subject: String::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            content_type: TEXT_PLAIN.to_string(),
            content: String::new(),
        }
    }
}

/// Parse a raw RFC 2822 message into an Envelope.
///
/// Fails with `UnsupportedAddressing` when the top-level headers carry any
/// Bcc address. The body is the first text/plain part of a multipart message
/// (empty if there is none), or the whole body of a single-part message,
/// transfer-decoded and converted from its declared charset.
pub fn parse_message(raw: &[u8]) -> Result<Envelope, MtaError> {
    let collector = parse_bytes(raw, EnvelopeCollector::default())?;
    if !collector.bcc.is_empty() {
        return Err(MtaError::UnsupportedAddressing {
            addresses: collector.bcc,
        });
    }
    let envelope = Envelope {
        subject: collector.subject.unwrap_or_default(),
        to: format_recipients(&collector.to),
        cc: format_recipients(&collector.cc),
        bcc: Vec::new(),
        content_type: TEXT_PLAIN.to_string(),
        content: collector.content.unwrap_or_default(),
    };
    debug!(
        "parsed message: subject {:?}, {} to, {} cc, {} bytes of text",
        envelope.subject,
        envelope.to.len(),
        envelope.cc.len(),
        envelope.content.len()
    );
    Ok(envelope)
}

/// State of one open MIME entity.
struct Part {
    content_type: ContentType,
    transfer_encoding: Option<String>,
    body: Vec<u8>,
    has_children: bool,
}

impl Part {
    fn new() -> Self {
        Self {
            content_type: ContentType::text_plain(),
            transfer_encoding: None,
            body: Vec::new(),
            has_children: false,
        }
    }

    fn decoded_bytes(&self) -> Vec<u8> {
        decode_transfer_encoding(self.transfer_encoding.as_deref(), &self.body)
    }

    fn decode(&self) -> String {
        decode_charset(&self.decoded_bytes(), self.content_type.charset())
    }
}

#[derive(Default)]
struct EnvelopeCollector {
    /// Collecting inside an encapsulated message: only text/plain leaves count.
    nested: bool,
    stack: Vec<Part>,
    subject: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    content: Option<String>,
}

impl MimeHandler for EnvelopeCollector {
    fn start_entity(&mut self, _boundary: Option<&str>) -> Result<(), MimeParseError> {
        if let Some(parent) = self.stack.last_mut() {
            parent.has_children = true;
        }
        self.stack.push(Part::new());
        Ok(())
    }

    fn content_type(&mut self, value: &str) -> Result<(), MimeParseError> {
        if let (Some(part), Some(ct)) = (self.stack.last_mut(), parse_content_type(value)) {
            part.content_type = ct;
        }
        Ok(())
    }

    fn content_transfer_encoding(&mut self, value: &str) -> Result<(), MimeParseError> {
        if let Some(part) = self.stack.last_mut() {
            part.transfer_encoding = Some(value.to_string());
        }
        Ok(())
    }

    fn header(&mut self, name: &str, value: &str) -> Result<(), MimeParseError> {
        if self.stack.len() != 1 {
            return Ok(());
        }
        match name.to_ascii_lowercase().as_str() {
            "to" => self.to.extend(address_tokens(value)),
            "cc" => self.cc.extend(address_tokens(value)),
            "bcc" => self.bcc.extend(address_tokens(value)),
            "subject" if self.subject.is_none() => {
                self.subject = Some(decode_encoded_words(value).trim().to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn body_content(&mut self, data: &[u8]) -> Result<(), MimeParseError> {
        if let Some(part) = self.stack.last_mut() {
            part.body.extend_from_slice(data);
        }
        Ok(())
    }

    fn end_entity(&mut self, _boundary: Option<&str>) -> Result<(), MimeParseError> {
        let part = match self.stack.pop() {
            Some(p) => p,
            None => return Ok(()),
        };
        if part.has_children || self.content.is_some() {
            return Ok(());
        }
        if part.content_type.is_mime_type("message", "rfc822") {
            self.content = encapsulated_text(&part.decoded_bytes());
            return Ok(());
        }
        let is_root = self.stack.is_empty() && !self.nested;
        if is_root || part.content_type.is_mime_type("text", "plain") {
            self.content = Some(part.decode());
        }
        Ok(())
    }
}

/// First text/plain leaf of a forwarded message. Its headers are not routing
/// information and are ignored.
fn encapsulated_text(raw: &[u8]) -> Option<String> {
    let collector = EnvelopeCollector {
        nested: true,
        ..EnvelopeCollector::default()
    };
    match parse_bytes(raw, collector) {
        Ok(inner) => inner.content,
        Err(e) => {
            warn!("skipping unparseable message/rfc822 part: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(list: &[Recipient]) -> Vec<&str> {
        list.iter().map(Recipient::address).collect()
    }

    #[test]
    fn format_trims_and_keeps_order_and_duplicates() {
        let r = format_recipients(&["  a@b.com ", "c@d.com", "c@d.com"]);
        assert_eq!(addresses(&r), vec!["a@b.com", "c@d.com", "c@d.com"]);
        assert_eq!(
            serde_json::to_value(&r[0]).unwrap(),
            serde_json::json!({"emailAddress": {"address": "a@b.com"}})
        );
        assert!(format_recipients::<&str>(&[]).is_empty());
        let again: Vec<&str> = r.iter().map(Recipient::address).collect();
        assert_eq!(format_recipients(again.as_slice()), r);
    }

    #[test]
    fn simple_message() {
        let env = parse_message(b"To: a@x.com\nSubject: Hi\n\nHello").unwrap();
        assert_eq!(env.subject, "Hi");
        assert_eq!(addresses(&env.to), vec!["a@x.com"]);
        assert!(env.cc.is_empty());
        assert_eq!(env.content_type, "text/plain");
        assert_eq!(env.content, "Hello");
    }

    #[test]
    fn repeated_headers_collected_in_order() {
        let env = parse_message(
            b"To: \"A\" <a@x.com>, b@x.com\r\nCc: c@x.com\r\nTo: d@x.com\r\nCc:\r\n\r\nbody\r\n",
        )
        .unwrap();
        assert_eq!(addresses(&env.to), vec!["a@x.com", "b@x.com", "d@x.com"]);
        assert_eq!(addresses(&env.cc), vec!["c@x.com"]);
        assert_eq!(env.subject, "");
        assert_eq!(env.content, "body\r\n");
    }

    #[test]
    fn bcc_is_rejected() {
        match parse_message(b"To: a@x.com\nBcc: secret@x.com\n\nHello") {
            Err(MtaError::UnsupportedAddressing { addresses }) => {
                assert_eq!(addresses, vec!["secret@x.com"]);
            }
            other => panic!("expected UnsupportedAddressing, got {:?}", other),
        }
    }

    #[test]
    fn blank_bcc_is_tolerated() {
        let env = parse_message(b"To: a@x.com\nBcc: \n\nHello").unwrap();
        assert!(env.bcc.is_empty());
    }

    #[test]
    fn first_plain_text_part_wins() {
        let msg = b"To: a@x.com\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=inner\r\n\r\n\
--inner\r\n\
Content-Type: text/html\r\n\r\n\
<p>html</p>\r\n\
--inner\r\n\
Content-Type: text/plain; charset=iso-8859-1\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\r\n\
caf=E9\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: text/plain\r\n\r\n\
second\r\n\
--outer--\r\n";
        let env = parse_message(msg).unwrap();
        assert_eq!(env.content, "café");
    }

    #[test]
    fn multipart_without_plain_text_is_empty() {
        let msg = b"Content-Type: multipart/alternative; boundary=b\r\n\r\n\
--b\r\n\
Content-Type: text/html\r\n\r\n\
<p>only html</p>\r\n\
--b--\r\n";
        assert_eq!(parse_message(msg).unwrap().content, "");
    }

    #[test]
    fn untyped_part_defaults_to_plain_text() {
        let msg = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\n\
Content-Type: application/octet-stream\r\n\r\n\
xxx\r\n\
--b\r\n\
\r\n\
untyped\r\n\
--b--\r\n";
        assert_eq!(parse_message(msg).unwrap().content, "untyped");
    }

    #[test]
    fn single_part_base64_body_and_encoded_subject() {
        let msg = b"Subject: =?UTF-8?B?R3LDvMOfZQ==?=\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: base64\r\n\r\n\
SGVsbG8s\r\nIHdvcmxk\r\n";
        let env = parse_message(msg).unwrap();
        assert_eq!(env.subject, "Grüße");
        assert_eq!(env.content, "Hello, world");
    }

    #[test]
    fn part_headers_do_not_leak_into_envelope() {
        let msg = b"To: a@x.com\r\nContent-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\n\
Bcc: hidden@x.com\r\n\
Subject: inner\r\n\r\n\
text\r\n\
--b--\r\n";
        let env = parse_message(msg).unwrap();
        assert_eq!(env.subject, "");
        assert_eq!(env.content, "text");
    }

    #[test]
    fn forwarded_message_text_is_used() {
        let msg = b"To: a@x.com\r\n\
Subject: Fwd: report\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\n\
Content-Type: text/html\r\n\r\n\
<p>see attached</p>\r\n\
--b\r\n\
Content-Type: message/rfc822\r\n\r\n\
To: inner@x.com\r\n\
Bcc: hidden@x.com\r\n\
Subject: report\r\n\
Content-Type: text/plain\r\n\r\n\
forwarded text\r\n\
--b--\r\n";
        let env = parse_message(msg).unwrap();
        assert_eq!(env.content, "forwarded text");
        assert_eq!(env.subject, "Fwd: report");
        assert_eq!(addresses(&env.to), ["a@x.com"]);
        assert!(env.cc.is_empty());
    }

    #[test]
    fn forwarded_html_only_message_has_no_text() {
        let msg = b"To: a@x.com\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\n\
Content-Type: message/rfc822\r\n\r\n\
Content-Type: text/html\r\n\r\n\
<p>html</p>\r\n\
--b\r\n\
Content-Type: text/plain\r\n\r\n\
after\r\n\
--b--\r\n";
        assert_eq!(parse_message(msg).unwrap().content, "after");
    }

    #[test]
    fn body_in_central_european_charset() {
        let msg = b"To: a@x.com\r\n\
Content-Type: text/plain; charset=iso-8859-2\r\n\r\n\
\xb1\xe6";
        assert_eq!(parse_message(msg).unwrap().content, "ąć");
    }
}
