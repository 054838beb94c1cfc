/*
 * mailer.rs
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

//! Delivery through Microsoft Graph `sendMail`.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SenderIdentity;
use crate::envelope::{Envelope, Recipient};
use crate::error::MtaError;
use crate::oauth::AccessToken;
use crate::protocol::http::{HttpClient, HttpUrl};

use super::requests::{build_send_mail_body, send_mail_url};

/// Something that can deliver an envelope with a bearer token, exactly once.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, token: &AccessToken, envelope: &Envelope) -> Result<(), MtaError>;
}

/// Sends as one mailbox via `POST {graph_endpoint}/users/{sender}/sendMail`.
pub struct GraphMailer {
    graph_endpoint: String,
    sender: String,
}

impl GraphMailer {
    pub fn new(graph_endpoint: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            graph_endpoint: graph_endpoint.into(),
            sender: sender.into(),
        }
    }

    pub fn for_identity(identity: &SenderIdentity) -> Self {
        Self::new(identity.graph_endpoint.clone(), identity.from_address.clone())
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }
}

#[async_trait]
impl MailSender for GraphMailer {
    async fn send(&self, token: &AccessToken, envelope: &Envelope) -> Result<(), MtaError> {
        if !envelope.bcc.is_empty() {
            return Err(MtaError::UnsupportedAddressing {
                addresses: envelope.bcc.iter().map(|r| r.address().to_string()).collect(),
            });
        }
        if envelope.to.is_empty() {
            return Err(MtaError::NoRecipients);
        }

        let url = HttpUrl::parse(&send_mail_url(&self.graph_endpoint, &self.sender))
            .map_err(|e| MtaError::transport(e.to_string()))?;
        let body = build_send_mail_body(envelope, &self.sender)
            .map_err(|e| MtaError::transport(format!("cannot encode sendMail body: {}", e)))?;
        let authorization = format!("Bearer {}", token.secret());
        let response = HttpClient::post(
            &url,
            &[
                ("Authorization", authorization.as_str()),
                ("Content-Type", "application/json"),
                ("Accept", "application/json"),
            ],
            body,
        )
        .await
        .map_err(|e| MtaError::transport(format!("sendMail to {} failed: {}", url.host, e)))?;

        if !response.is_success() {
            warn!("sendMail returned HTTP {}", response.status);
            return Err(MtaError::Delivery {
                status: response.status,
                body: response.body_text(),
            });
        }
        info!(
            "message from {} accepted for {} (HTTP {})",
            self.sender,
            recipient_list(envelope),
            response.status
        );
        Ok(())
    }
}

fn recipient_list(envelope: &Envelope) -> String {
    envelope
        .to
        .iter()
        .chain(envelope.cc.iter())
        .map(Recipient::address)
        .collect::<Vec<_>>()
        .join(", ")
}
