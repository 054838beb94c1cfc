/*
 * requests.rs
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

//! JSON request bodies and paths for Microsoft Graph API calls.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::envelope::{Envelope, Recipient};

/// Path segment encoding for a mailbox address: '@', '.', '-' and '_' stay literal.
const USER_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_');

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailRequest<'a> {
    message: Message<'a>,
    save_to_sent_items: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Message<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    to_recipients: &'a [Recipient],
    cc_recipients: &'a [Recipient],
    from: Recipient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

/// Build the JSON body for `POST /users/{sender}/sendMail`. The body is always
/// sent as plain text and a copy is saved to the sender's Sent Items.
pub fn build_send_mail_body(envelope: &Envelope, sender: &str) -> Result<Vec<u8>, serde_json::Error> {
    let request = SendMailRequest {
        message: Message {
            subject: &envelope.subject,
            body: ItemBody {
                content_type: "Text",
                content: &envelope.content,
            },
            to_recipients: &envelope.to,
            cc_recipients: &envelope.cc,
            from: Recipient::new(sender),
        },
        save_to_sent_items: true,
    };
    serde_json::to_vec(&request)
}

/// `{graph_endpoint}/users/{sender}/sendMail` with the sender percent-encoded.
pub fn send_mail_url(graph_endpoint: &str, sender: &str) -> String {
    format!(
        "{}/users/{}/sendMail",
        graph_endpoint.trim_end_matches('/'),
        utf8_percent_encode(sender, USER_SEGMENT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::format_recipients;
    use serde_json::json;

    #[test]
    fn send_mail_payload_shape() {
        let envelope = Envelope {
            subject: "Hi".into(),
            to: format_recipients(&["a@x.com"]),
            cc: format_recipients(&["c@x.com"]),
            content: "Hello".into(),
            ..Envelope::default()
        };
        let body = build_send_mail_body(&envelope, "relay@example.com").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "message": {
                    "subject": "Hi",
                    "body": {"contentType": "Text", "content": "Hello"},
                    "toRecipients": [{"emailAddress": {"address": "a@x.com"}}],
                    "ccRecipients": [{"emailAddress": {"address": "c@x.com"}}],
                    "from": {"emailAddress": {"address": "relay@example.com"}}
                },
                "saveToSentItems": true
            })
        );
    }

    #[test]
    fn sender_is_encoded_in_path() {
        assert_eq!(
            send_mail_url("https://graph.microsoft.com/v1.0/", "relay.bot@example.com"),
            "https://graph.microsoft.com/v1.0/users/relay.bot@example.com/sendMail"
        );
        assert_eq!(
            send_mail_url("http://127.0.0.1:1/v1.0", "a b/c@x.com"),
            "http://127.0.0.1:1/v1.0/users/a%20b%2Fc@x.com/sendMail"
        );
    }
}
