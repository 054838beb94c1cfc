/*
 * error.rs
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

//! Relay errors and their process exit status.

use std::path::PathBuf;

use thiserror::Error;

use crate::mime::MimeParseError;

/// sysexits.h values used by the relay.
pub mod exit {
    pub const OK: u8 = 0;
    pub const DATAERR: u8 = 65;
    pub const NOUSER: u8 = 67;
    pub const UNAVAILABLE: u8 = 69;
    pub const IOERR: u8 = 74;
    pub const TEMPFAIL: u8 = 75;
    pub const NOPERM: u8 = 77;
    pub const CONFIG: u8 = 78;
}

/// Every way a relay invocation can fail.
#[derive(Debug, Error)]
pub enum MtaError {
    /// The message names Bcc recipients, which this relay cannot forward.
    #[error("Bcc recipients are not supported: {}", .addresses.join(", "))]
    UnsupportedAddressing { addresses: Vec<String> },

    /// Token exchange did not yield a usable token. `detail` is the provider's raw response.
    #[error("authentication failed: {detail}")]
    Authentication { detail: String },

    #[error("no recipients")]
    NoRecipients,

    /// Non-2xx response from the sendMail call.
    #[error("delivery failed with HTTP {status}: {body}")]
    Delivery { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed message: {0}")]
    MalformedMessage(#[from] MimeParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot read message: {0}")]
    Input(#[source] std::io::Error),
}

impl MtaError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Exit status for the invoking mail queue: 75 asks it to retry later,
    /// everything else is permanent.
    pub fn exit_code(&self) -> u8 {
        match self {
            MtaError::UnsupportedAddressing { .. } | MtaError::MalformedMessage(_) => exit::DATAERR,
            MtaError::NoRecipients => exit::NOUSER,
            MtaError::Authentication { .. } => exit::NOPERM,
            MtaError::Delivery { status, .. } if *status == 429 || *status >= 500 => exit::TEMPFAIL,
            MtaError::Delivery { .. } => exit::UNAVAILABLE,
            MtaError::Transport(_) => exit::TEMPFAIL,
            MtaError::Config(_) => exit::CONFIG,
            MtaError::Input(_) => exit::IOERR,
        }
    }
}

impl From<std::io::Error> for MtaError {
    fn from(e: std::io::Error) -> Self {
        MtaError::Transport(e.to_string())
    }
}

/// Sender profile could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file given and no home directory to look in")]
    NoDefaultPath,

    #[error("configuration file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read configuration file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("profile {profile:?} not found in {}", .path.display())]
    MissingProfile { profile: String, path: PathBuf },

    #[error("profile {profile:?}: {field} must not be empty")]
    EmptyField { profile: String, field: &'static str },

    #[error("profile {profile:?}: {field} is not an http(s) URL: {value}")]
    InvalidEndpoint {
        profile: String,
        field: &'static str,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_failure_classes() {
        let bcc = MtaError::UnsupportedAddressing {
            addresses: vec!["a@x.com".into()],
        };
        assert_eq!(bcc.exit_code(), 65);
        assert_eq!(bcc.to_string(), "Bcc recipients are not supported: a@x.com");
        assert_eq!(MtaError::NoRecipients.exit_code(), 67);
        assert_eq!(MtaError::Authentication { detail: "{}".into() }.exit_code(), 77);
        assert_eq!(MtaError::Delivery { status: 400, body: String::new() }.exit_code(), 69);
        assert_eq!(MtaError::Delivery { status: 429, body: String::new() }.exit_code(), 75);
        assert_eq!(MtaError::Delivery { status: 503, body: String::new() }.exit_code(), 75);
        assert_eq!(MtaError::transport("connection refused").exit_code(), 75);
        assert_eq!(MtaError::from(ConfigError::NoDefaultPath).exit_code(), 78);
        assert_eq!(
            MtaError::Input(std::io::Error::new(std::io::ErrorKind::Other, "closed")).exit_code(),
            74
        );
    }
}
