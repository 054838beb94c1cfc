/*
 * lib.rs
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

//! msgmta core: turns one RFC 2822 message into a Microsoft Graph `sendMail`
//! call, authenticated with the OAuth2 client-credentials grant.

pub mod config;
pub mod debug_capture;
pub mod envelope;
pub mod error;
pub mod graph;
pub mod mime;
pub mod net;
pub mod oauth;
pub mod protocol;
pub mod relay;

pub use config::SenderIdentity;
pub use envelope::{format_recipients, parse_message, Envelope, Recipient};
pub use error::{ConfigError, MtaError};
pub use graph::{GraphMailer, MailSender};
pub use oauth::{AccessToken, ClientCredentialsAuthenticator, TokenSource};
pub use relay::{merge, relay, RelayOptions};
