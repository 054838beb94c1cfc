/*
 * url.rs
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

//! http/https URL parsing for the client.

use std::io;

/// An absolute http or https URL split into the parts a connection needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUrl {
    pub secure: bool,
    pub host: String,
    pub port: u16,
    /// Path and query, always starting with '/'.
    pub path: String,
}

impl HttpUrl {
    /// Parse `http://host[:port][/path]` or `https://...`. Bracketed IPv6 hosts are accepted.
    pub fn parse(url: &str) -> io::Result<Self> {
        let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidInput, format!("{}: {}", msg, url));
        let (secure, rest) = if let Some(rest) = strip_prefix_ignore_case(url, "https://") {
            (true, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(url, "http://") {
            (false, rest)
        } else {
            return Err(invalid("unsupported URL scheme"));
        };
        let split = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, path) = rest.split_at(split);
        let path = match path {
            "" => "/".to_string(),
            p if p.starts_with('?') => format!("/{}", p),
            p => p.to_string(),
        };
        let default_port = if secure { 443 } else { 80 };
        let (host, port) = if let Some(v6) = authority.strip_prefix('[') {
            let close = v6.find(']').ok_or_else(|| invalid("unterminated IPv6 host"))?;
            let port = match v6[close + 1..].strip_prefix(':') {
                Some(p) => p.parse().map_err(|_| invalid("invalid port"))?,
                None => default_port,
            };
            (v6[..close].to_string(), port)
        } else {
            match authority.rsplit_once(':') {
                Some((h, p)) => (h.to_string(), p.parse().map_err(|_| invalid("invalid port"))?),
                None => (authority.to_string(), default_port),
            }
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        Ok(Self {
            secure,
            host,
            port,
            path,
        })
    }

    /// Host header value: the port is included only when it is not the scheme default.
    pub fn authority(&self) -> String {
        let default_port = if self.secure { 443 } else { 80 };
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == default_port {
            host
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes()) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_defaults() {
        let u = HttpUrl::parse("https://login.microsoftonline.com/tenant/oauth2/v2.0/token").unwrap();
        assert!(u.secure);
        assert_eq!(u.host, "login.microsoftonline.com");
        assert_eq!(u.port, 443);
        assert_eq!(u.path, "/tenant/oauth2/v2.0/token");
        assert_eq!(u.authority(), "login.microsoftonline.com");
    }

    #[test]
    fn http_with_port_and_query() {
        let u = HttpUrl::parse("http://127.0.0.1:8080?x=1").unwrap();
        assert!(!u.secure);
        assert_eq!(u.port, 8080);
        assert_eq!(u.path, "/?x=1");
        assert_eq!(u.authority(), "127.0.0.1:8080");
        let v6 = HttpUrl::parse("http://[::1]:9000/a").unwrap();
        assert_eq!(v6.host, "::1");
        assert_eq!(v6.authority(), "[::1]:9000");
    }

    #[test]
    fn rejects_other_schemes_and_bad_ports() {
        assert!(HttpUrl::parse("ftp://example.com/").is_err());
        assert!(HttpUrl::parse("https://example.com:http/").is_err());
        assert!(HttpUrl::parse("https:///path").is_err());
    }
}
