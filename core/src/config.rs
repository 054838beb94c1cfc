/*
 * config.rs
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

//! Sender profiles: one JSON file, top-level object keyed by profile name.
//!
//! ```json
//! { "default": { "tenant_id": "...", "application_id": "...",
//!                "secret_value": "...", "sender": "relay@example.com" } }
//! ```
//!
//! `authority_host` and `graph_endpoint` may be set per profile for national
//! clouds or test servers.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::protocol::http::HttpUrl;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MSGMTA_CONFIG";
pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// Credentials and mailbox used to send. The secret is never printed by Debug.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub from_address: String,
    pub authority_host: String,
    pub graph_endpoint: String,
}

impl SenderIdentity {
    /// Identity against the public Microsoft cloud.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            from_address: from_address.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            graph_endpoint: DEFAULT_GRAPH_ENDPOINT.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ProfileRecord {
    tenant_id: String,
    application_id: String,
    secret_value: SecretString,
    sender: String,
    #[serde(default)]
    authority_host: Option<String>,
    #[serde(default)]
    graph_endpoint: Option<String>,
}

/// ~/.config/msgmta.json
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config").join("msgmta.json"))
}

/// Explicit path if given, else the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_path().ok_or(ConfigError::NoDefaultPath),
    }
}

/// Read the file at `path` and return the named profile.
pub fn load_sender_identity(path: &Path, profile: &str) -> Result<SenderIdentity, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    warn_if_exposed(path);
    let identity = parse_sender_identity(&text, path, profile)?;
    debug!(
        "loaded profile {:?} from {} (sender {})",
        profile,
        path.display(),
        identity.from_address
    );
    Ok(identity)
}

/// Parse profile file contents. `path` is only used in error messages.
pub fn parse_sender_identity(
    text: &str,
    path: &Path,
    profile: &str,
) -> Result<SenderIdentity, ConfigError> {
    let mut profiles: HashMap<String, ProfileRecord> =
        serde_json::from_str(text).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;
    let record = profiles
        .remove(profile)
        .ok_or_else(|| ConfigError::MissingProfile {
            profile: profile.to_string(),
            path: path.to_path_buf(),
        })?;
    let require = |field: &'static str, value: &str| {
        if value.trim().is_empty() {
            Err(ConfigError::EmptyField {
                profile: profile.to_string(),
                field,
            })
        } else {
            Ok(())
        }
    };
    require("tenant_id", &record.tenant_id)?;
    require("application_id", &record.application_id)?;
    require("sender", &record.sender)?;
    require("secret_value", record.secret_value.expose_secret())?;
    let endpoint = |field: &'static str, value: Option<String>, default: &str| {
        let value = trim_base(value, default);
        match HttpUrl::parse(&value) {
            Ok(_) => Ok(value),
            Err(_) => Err(ConfigError::InvalidEndpoint {
                profile: profile.to_string(),
                field,
                value,
            }),
        }
    };
    Ok(SenderIdentity {
        tenant_id: record.tenant_id.trim().to_string(),
        client_id: record.application_id.trim().to_string(),
        authority_host: endpoint("authority_host", record.authority_host, DEFAULT_AUTHORITY_HOST)?,
        graph_endpoint: endpoint("graph_endpoint", record.graph_endpoint, DEFAULT_GRAPH_ENDPOINT)?,
        client_secret: record.secret_value,
        from_address: record.sender.trim().to_string(),
    })
}

fn trim_base(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(unix)]
fn warn_if_exposed(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mode = meta.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                "{} holds a client secret but is accessible by other users (mode {:o})",
                path.display(),
                mode & 0o777
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_if_exposed(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PROFILES: &str = r#"{
        "default": {
            "tenant_id": "t-1", "application_id": "app-1",
            "secret_value": "s3cret", "sender": "relay@example.com"
        },
        "test": {
            "tenant_id": "t-2", "application_id": "app-2",
            "secret_value": "other", "sender": "qa@example.com",
            "authority_host": "http://127.0.0.1:9000/",
            "graph_endpoint": "http://127.0.0.1:9001/v1.0"
        }
    }"#;

    #[test]
    fn default_profile_uses_public_cloud() {
        let id = parse_sender_identity(PROFILES, Path::new("p.json"), "default").unwrap();
        assert_eq!(id.tenant_id, "t-1");
        assert_eq!(id.client_id, "app-1");
        assert_eq!(id.client_secret.expose_secret(), "s3cret");
        assert_eq!(id.from_address, "relay@example.com");
        assert_eq!(id.authority_host, DEFAULT_AUTHORITY_HOST);
        assert_eq!(id.graph_endpoint, DEFAULT_GRAPH_ENDPOINT);
        assert!(!format!("{:?}", id).contains("s3cret"));
    }

    #[test]
    fn endpoint_overrides_lose_trailing_slash() {
        let id = parse_sender_identity(PROFILES, Path::new("p.json"), "test").unwrap();
        assert_eq!(id.authority_host, "http://127.0.0.1:9000");
        assert_eq!(id.graph_endpoint, "http://127.0.0.1:9001/v1.0");
    }

    #[test]
    fn missing_profile_and_fields() {
        assert!(matches!(
            parse_sender_identity(PROFILES, Path::new("p.json"), "nope"),
            Err(ConfigError::MissingProfile { .. })
        ));
        assert!(matches!(
            parse_sender_identity(r#"{"default":{"tenant_id":"t"}}"#, Path::new("p.json"), "default"),
            Err(ConfigError::Malformed { .. })
        ));
        let blank = r#"{"default":{"tenant_id":" ","application_id":"a","secret_value":"s","sender":"x@y"}}"#;
        assert!(matches!(
            parse_sender_identity(blank, Path::new("p.json"), "default"),
            Err(ConfigError::EmptyField { field: "tenant_id", .. })
        ));
        let bad_url = r#"{"default":{"tenant_id":"t","application_id":"a","secret_value":"s","sender":"x@y","graph_endpoint":"graph.local"}}"#;
        assert!(matches!(
            parse_sender_identity(bad_url, Path::new("p.json"), "default"),
            Err(ConfigError::InvalidEndpoint { field: "graph_endpoint", .. })
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msgmta.json");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(PROFILES.as_bytes()).unwrap();
        let id = load_sender_identity(&path, "test").unwrap();
        assert_eq!(id.from_address, "qa@example.com");
        assert!(matches!(
            load_sender_identity(&dir.path().join("absent.json"), "default"),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn explicit_path_wins() {
        assert_eq!(
            resolve_config_path(Some(Path::new("/etc/msgmta.json"))).unwrap(),
            PathBuf::from("/etc/msgmta.json")
        );
    }
}
