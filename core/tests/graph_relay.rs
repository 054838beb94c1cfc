/*
 * graph_relay.rs
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

//! Whole relay against mock identity and Graph endpoints.

use msgmta_core::{
    relay, ClientCredentialsAuthenticator, GraphMailer, MtaError, RelayOptions, SenderIdentity,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";
const SEND_PATH: &str = "/v1.0/users/relay@example.com/sendMail";

fn identity(server: &MockServer) -> SenderIdentity {
    let mut id = SenderIdentity::new("tenant-1", "app-1", "s3cret", "relay@example.com");
    id.authority_host = server.uri();
    id.graph_endpoint = format!("{}/v1.0", server.uri());
    id
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app-1"))
        .and(body_string_contains("client_secret=s3cret"))
        .and(body_string_contains(
            "scope=https%3A%2F%2Fgraph.microsoft.com%2F.default",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "tok-abc"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn run(server: &MockServer, raw: &[u8], options: &RelayOptions) -> Result<(), MtaError> {
    let id = identity(server);
    let tokens = ClientCredentialsAuthenticator::new(&id);
    let mailer = GraphMailer::for_identity(&id);
    relay(raw, options, &tokens, &mailer).await.map(|_| ())
}

#[tokio::test]
async fn message_is_sent_as_the_profile_sender() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", "Bearer tok-abc"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "message": {
                "subject": "Hi",
                "body": { "contentType": "Text", "content": "Hello" },
                "toRecipients": [ { "emailAddress": { "address": "a@x.com" } } ],
                "ccRecipients": [],
                "from": { "emailAddress": { "address": "relay@example.com" } }
            },
            "saveToSentItems": true
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    run(&server, b"To: a@x.com\nSubject: Hi\n\nHello", &RelayOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn command_line_fills_in_recipients_and_subject() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_json(json!({
            "message": {
                "subject": "fallback",
                "body": { "contentType": "Text", "content": "body" },
                "toRecipients": [ { "emailAddress": { "address": "z@y.com" } } ],
                "ccRecipients": [],
                "from": { "emailAddress": { "address": "relay@example.com" } }
            },
            "saveToSentItems": true
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let options = RelayOptions {
        subject: "fallback".into(),
        recipients: vec!["z@y.com".into()],
        debug_dir: None,
    };
    run(&server, b"To:\nCc:\n\nbody", &options).await.unwrap();
}

#[tokio::test]
async fn bcc_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = run(
        &server,
        b"To: a@x.com\nBcc: b@x.com\n\nsecret",
        &RelayOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MtaError::UnsupportedAddressing { .. }));
    assert_eq!(err.exit_code(), 65);
}

#[tokio::test]
async fn token_without_access_token_stops_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token_type": "Bearer" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let err = run(&server, b"To: a@x.com\n\nbody", &RelayOptions::default())
        .await
        .unwrap_err();
    match &err {
        MtaError::Authentication { detail } => assert!(detail.contains("token_type")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(err.exit_code(), 77);
}

#[tokio::test]
async fn rejected_credentials_carry_the_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_client" })),
        )
        .mount(&server)
        .await;

    let err = run(&server, b"To: a@x.com\n\nbody", &RelayOptions::default())
        .await
        .unwrap_err();
    match err {
        MtaError::Authentication { detail } => {
            assert!(detail.contains("401"));
            assert!(detail.contains("invalid_client"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn delivery_status_maps_to_exit_code() {
    for (status, code) in [(400u16, 69u8), (403, 69), (429, 75), (503, 75)] {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "error": { "code": "ErrorSendAsDenied" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = run(&server, b"To: a@x.com\n\nbody", &RelayOptions::default())
            .await
            .unwrap_err();
        match &err {
            MtaError::Delivery { status: got, body } => {
                assert_eq!(*got, status);
                assert!(body.contains("ErrorSendAsDenied"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.exit_code(), code);
    }
}
