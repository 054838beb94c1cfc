/*
 * token.rs
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

//! Access tokens and the seam the relay uses to obtain one.

use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::SenderIdentity;
use crate::error::MtaError;

use super::flow::request_client_credentials_token;
use super::provider::MicrosoftOAuthProvider;

/// Opaque bearer token. Not cached: one is acquired per invocation.
#[derive(Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_in: Option<u64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: Option<u64>) -> Self {
        Self {
            secret: SecretString::new(token.into()),
            expires_in,
        }
    }

    /// The raw token, for the Authorization header.
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Lifetime in seconds as reported by the issuer.
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Something that can produce a bearer token for the mail API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, MtaError>;
}

/// Client-credentials grant against the Microsoft identity platform for one sender identity.
pub struct ClientCredentialsAuthenticator {
    provider: MicrosoftOAuthProvider,
}

impl ClientCredentialsAuthenticator {
    pub fn new(identity: &SenderIdentity) -> Self {
        Self {
            provider: MicrosoftOAuthProvider::new(
                identity.authority_host.clone(),
                identity.tenant_id.clone(),
                identity.client_id.clone(),
                identity.client_secret.clone(),
            ),
        }
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsAuthenticator {
    async fn access_token(&self) -> Result<AccessToken, MtaError> {
        request_client_credentials_token(&self.provider).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_the_token() {
        let token = AccessToken::new("eyJhbGciOi", Some(60));
        let shown = format!("{:?}", token);
        assert!(!shown.contains("eyJhbGciOi"));
        assert!(shown.contains("60"));
        assert_eq!(token.secret(), "eyJhbGciOi");
    }
}
