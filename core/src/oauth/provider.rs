/*
 * provider.rs
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

//! OAuth2 provider abstraction. The concrete provider is the Microsoft identity platform.

use secrecy::SecretString;

/// Scope granting an application every Graph permission it has been consented for.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Trait describing an OAuth2 provider for the client-credentials grant
/// (token endpoint, client_id, client_secret, scopes).
pub trait OAuthProvider: Send + Sync {
    /// Short identifier, e.g. "microsoft".
    fn provider_id(&self) -> &str;
    /// Token endpoint URL.
    fn token_url(&self) -> String;
    /// Scopes to request (space-joined in the form body).
    fn scopes(&self) -> &[&str];
    fn client_id(&self) -> &str;
    /// OAuth2 client_secret. Confidential clients always have one.
    fn client_secret(&self) -> &SecretString;
}

/// Microsoft identity platform (Entra ID), tenant-scoped v2.0 endpoint.
///
/// Token: `{authority_host}/{tenant_id}/oauth2/v2.0/token`
/// Scope: `https://graph.microsoft.com/.default`
pub struct MicrosoftOAuthProvider {
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
}

impl MicrosoftOAuthProvider {
    pub fn new(
        authority_host: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            authority_host: authority_host.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
        }
    }
}

impl OAuthProvider for MicrosoftOAuthProvider {
    fn provider_id(&self) -> &str {
        "microsoft"
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    fn scopes(&self) -> &[&str] {
        &[GRAPH_DEFAULT_SCOPE]
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_token_url() {
        let p = MicrosoftOAuthProvider::new(
            "https://login.microsoftonline.com/",
            "contoso",
            "app",
            SecretString::new("s".to_string()),
        );
        assert_eq!(p.token_url(), "https://login.microsoftonline.com/contoso/oauth2/v2.0/token");
        assert_eq!(p.scopes(), &["https://graph.microsoft.com/.default"]);
    }
}
