/*
 * flow.rs
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

//! OAuth2 client-credentials grant (RFC 6749 §4.4).
//!
//! The application authenticates with its own id and secret; no user is
//! involved. HTTP calls use the in-tree `HttpClient`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::MtaError;
use crate::protocol::http::{HttpClient, HttpUrl};

use super::provider::OAuthProvider;
use super::token::AccessToken;

/// application/x-www-form-urlencoded leaves unreserved characters alone.
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Form body for the client-credentials token request.
pub fn build_token_request_body(provider: &dyn OAuthProvider) -> String {
    let scope = provider.scopes().join(" ");
    [
        ("grant_type", "client_credentials"),
        ("client_id", provider.client_id()),
        ("client_secret", provider.client_secret().expose_secret().as_str()),
        ("scope", scope.as_str()),
    ]
    .iter()
    .map(|(k, v)| format!("{}={}", k, percent_encode(v)))
    .collect::<Vec<_>>()
    .join("&")
}

/// Exchange the provider's client credentials for an access token. Exactly one
/// request is made; there is no retry.
pub async fn request_client_credentials_token(
    provider: &dyn OAuthProvider,
) -> Result<AccessToken, MtaError> {
    let token_url = provider.token_url();
    let url = HttpUrl::parse(&token_url).map_err(|e| MtaError::transport(e.to_string()))?;
    debug!("requesting {} token from {}", provider.provider_id(), token_url);

    let body = build_token_request_body(provider).into_bytes();
    let response = HttpClient::post(
        &url,
        &[
            ("Content-Type", "application/x-www-form-urlencoded"),
            ("Accept", "application/json"),
        ],
        body,
    )
    .await
    .map_err(|e| MtaError::transport(format!("token request to {} failed: {}", url.host, e)))?;

    let text = response.body_text();
    if !response.is_success() {
        warn!("token endpoint returned HTTP {}", response.status);
        return Err(MtaError::Authentication {
            detail: format!("HTTP {}: {}", response.status, text),
        });
    }
    parse_token_response(&text)
}

/// Pull the access token out of a successful token response body. Anything
/// without a non-empty `access_token` is an authentication failure carrying the raw body.
pub fn parse_token_response(text: &str) -> Result<AccessToken, MtaError> {
    let failed = || MtaError::Authentication {
        detail: text.to_string(),
    };
    let parsed: TokenResponse = serde_json::from_str(text).map_err(|_| failed())?;
    match parsed.access_token {
        Some(token) if !token.is_empty() => {
            debug!("access token received (expires in {:?}s)", parsed.expires_in);
            Ok(AccessToken::new(token, parsed.expires_in))
        }
        _ => Err(failed()),
    }
}

fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, FORM).to_string()
}
