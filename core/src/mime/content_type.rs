/*
 * content_type.rs
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

//! Content-Type header (RFC 2045).

use std::collections::HashMap;

use super::utils::is_token;

#[derive(Debug, Clone)]
pub struct ContentType {
    primary_type: String,
    sub_type: String,
    parameter_map: HashMap<String, String>,
}

impl ContentType {
    pub fn new(
        primary_type: impl Into<String>,
        sub_type: impl Into<String>,
        parameters: Vec<(String, String)>,
    ) -> Self {
        Self {
            primary_type: primary_type.into(),
            sub_type: sub_type.into(),
            parameter_map: parameters
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
        }
    }

    /// RFC 2045 default for entities without a (valid) Content-Type.
    pub fn text_plain() -> Self {
        Self::new("text", "plain", Vec::new())
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    pub fn is_primary_type(&self, t: &str) -> bool {
        self.primary_type.eq_ignore_ascii_case(t)
    }

    pub fn is_mime_type(&self, primary: &str, sub: &str) -> bool {
        self.is_primary_type(primary) && self.sub_type.eq_ignore_ascii_case(sub)
    }

    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameter_map
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Declared charset, if any.
    pub fn charset(&self) -> Option<&str> {
        self.get_parameter("charset").filter(|c| !c.is_empty())
    }
}

/// Parse Content-Type header value. Returns None when the type/subtype is malformed.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (type_part, params_part) = match value.find(';') {
        Some(i) => (value[..i].trim(), value[i + 1..].trim()),
        None => (value, ""),
    };
    let slash = type_part.find('/')?;
    let primary = type_part[..slash].trim();
    let sub = type_part[slash + 1..].trim();
    if !is_token(primary) || !is_token(sub) {
        return None;
    }
    Some(ContentType::new(primary, sub, parse_parameter_list(params_part)))
}

/// Parse semicolon-separated parameter list (name=value; name="value").
/// Malformed parameters are skipped.
pub fn parse_parameter_list(params_part: &str) -> Vec<(String, String)> {
    let mut parameters = Vec::new();
    let bytes = params_part.as_bytes();
    let len = bytes.len();
    let mut pos = 0;

    while pos < len {
        while pos < len && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= len {
            break;
        }
        let eq = match bytes[pos..].iter().position(|&b| b == b'=' || b == b';') {
            Some(i) if bytes[pos + i] == b'=' => pos + i,
            Some(i) => {
                pos += i;
                continue;
            }
            None => break,
        };
        let name = String::from_utf8_lossy(&bytes[pos..eq]).trim().to_string();
        pos = eq + 1;
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut v = Vec::new();
            while pos < len {
                let c = bytes[pos];
                if c == b'\\' && pos + 1 < len {
                    v.push(bytes[pos + 1]);
                    pos += 2;
                } else if c == b'"' {
                    pos += 1;
                    break;
                } else {
                    v.push(c);
                    pos += 1;
                }
            }
            Some(String::from_utf8_lossy(&v).into_owned())
        } else {
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b';')
                .map(|i| pos + i)
                .unwrap_or(len);
            let v = String::from_utf8_lossy(&bytes[pos..end]).trim().to_string();
            pos = end;
            Some(v).filter(|v| is_token(v))
        };
        if let Some(value) = value {
            if is_token(&name) {
                parameters.push((name, value));
            }
        }
        // Skip anything left before the next separator (e.g. junk after a quoted string).
        while pos < len && bytes[pos] != b';' {
            pos += 1;
        }
    }
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_charset() {
        let ct = parse_content_type("Text/Plain; charset=ISO-8859-1").unwrap();
        assert!(ct.is_mime_type("text", "plain"));
        assert_eq!(ct.charset(), Some("ISO-8859-1"));
    }

    #[test]
    fn parse_quoted_boundary() {
        let ct = parse_content_type("multipart/alternative;\tboundary=\"=_a b?c\"; foo=bar").unwrap();
        assert!(ct.is_primary_type("multipart"));
        assert_eq!(ct.get_parameter("BOUNDARY"), Some("=_a b?c"));
        assert_eq!(ct.get_parameter("foo"), Some("bar"));
    }

    #[test]
    fn malformed_type_is_rejected() {
        assert!(parse_content_type("textplain").is_none());
        assert!(parse_content_type("text/").is_none());
        assert!(parse_content_type("").is_none());
    }

    #[test]
    fn broken_parameters_are_skipped() {
        let ct = parse_content_type("text/plain; nonsense; charset=utf-8").unwrap();
        assert_eq!(ct.charset(), Some("utf-8"));
    }
}
