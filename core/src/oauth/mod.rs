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

//! OAuth2 for the relay: client-credentials token acquisition.

pub mod flow;
pub mod provider;
pub mod token;

pub use flow::{build_token_request_body, parse_token_response, request_client_credentials_token};
pub use provider::{MicrosoftOAuthProvider, OAuthProvider, GRAPH_DEFAULT_SCOPE};
pub use token::{AccessToken, ClientCredentialsAuthenticator, TokenSource};
