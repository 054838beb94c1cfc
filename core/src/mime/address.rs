/*
 * address.rs
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

//! RFC 5322 address list parsing for To/Cc/Bcc header values.

/// Parse a comma-separated list of mailboxes and return their addresses
/// (local@domain), display names and angle brackets dropped.
/// Supports "Display Name" <local@domain>, Name <local@domain>, bare
/// local@domain, parenthesised comments and groups (`Team: a@x, b@y;`),
/// whose members are flattened into the list. Returns None if any element is
/// not a mailbox.
pub fn parse_address_list(value: &str) -> Option<Vec<String>> {
    let bytes = value.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut pos = 0;
    let mut in_group = false;

    while pos < len {
        skip_cfws(bytes, len, &mut pos);
        if pos >= len {
            break;
        }
        match bytes[pos] {
            // empty list element (obs-addr-list)
            b',' => {
                pos += 1;
                continue;
            }
            b';' if in_group => {
                in_group = false;
                pos += 1;
                continue;
            }
            _ => {}
        }
        if !in_group {
            if let Some(after) = group_start(bytes, len, pos) {
                in_group = true;
                pos = after;
                continue;
            }
        }
        out.push(parse_one_address(bytes, len, &mut pos)?);
        skip_cfws(bytes, len, &mut pos);
        if pos < len {
            match bytes[pos] {
                b',' => pos += 1,
                b';' if in_group => {}
                _ => return None,
            }
        }
    }
    Some(out)
}

/// If a group's `display-name:` starts at `pos`, the offset just past the colon.
fn group_start(bytes: &[u8], len: usize, pos: usize) -> Option<usize> {
    let mut i = pos;
    while i < len {
        match bytes[i] {
            b'"' => skip_quoted(bytes, len, &mut i)?,
            b'(' => skip_comment(bytes, len, &mut i),
            b':' => return Some(i + 1),
            b',' | b';' | b'<' | b'@' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Addresses of one header occurrence. A value that is not an address list
/// passes through as a single trimmed token; a blank value yields nothing.
pub fn address_tokens(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match parse_address_list(trimmed) {
        Some(list) => list,
        None => vec![trimmed.to_string()],
    }
}

fn skip_cfws(bytes: &[u8], len: usize, pos: &mut usize) {
    loop {
        while *pos < len && matches!(bytes[*pos], b' ' | b'\t' | b'\r' | b'\n') {
            *pos += 1;
        }
        if *pos < len && bytes[*pos] == b'(' {
            skip_comment(bytes, len, pos);
        } else {
            return;
        }
    }
}

fn skip_comment(bytes: &[u8], len: usize, pos: &mut usize) {
    let mut depth = 0usize;
    while *pos < len {
        match bytes[*pos] {
            b'\\' => *pos += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    *pos += 1;
                    return;
                }
            }
            _ => {}
        }
        *pos += 1;
    }
}

fn skip_quoted(bytes: &[u8], len: usize, pos: &mut usize) -> Option<()> {
    *pos += 1;
    while *pos < len {
        match bytes[*pos] {
            b'\\' => *pos += 2,
            b'"' => {
                *pos += 1;
                return Some(());
            }
            _ => *pos += 1,
        }
    }
    None
}

fn parse_one_address(bytes: &[u8], len: usize, pos: &mut usize) -> Option<String> {
    let start = *pos;
    // Scan the phrase or addr-spec up to ',', ';' or '<', honouring quotes and comments.
    let mut scanned = Vec::new();
    while *pos < len && !matches!(bytes[*pos], b',' | b';' | b'<') {
        match bytes[*pos] {
            b'"' => {
                let q = *pos;
                skip_quoted(bytes, len, pos)?;
                scanned.extend_from_slice(&bytes[q..*pos]);
            }
            b'(' => skip_comment(bytes, len, pos),
            b => {
                scanned.push(b);
                *pos += 1;
            }
        }
    }
    if *pos < len && bytes[*pos] == b'<' {
        *pos += 1;
        let inner_start = *pos;
        while *pos < len && bytes[*pos] != b'>' {
            *pos += 1;
        }
        if *pos >= len {
            return None;
        }
        let inner = std::str::from_utf8(&bytes[inner_start..*pos]).ok()?.trim();
        *pos += 1;
        return addr_spec(inner);
    }
    if *pos == start {
        return None;
    }
    addr_spec(std::str::from_utf8(&scanned).ok()?.trim())
}

fn addr_spec(s: &str) -> Option<String> {
    // Source route (obs-route): @a,@b:local@domain
    let s = match s.rfind(':') {
        Some(i) if s.starts_with('@') => &s[i + 1..],
        _ => s,
    };
    let at = s.rfind('@')?;
    let (local, domain) = (s[..at].trim(), s[at + 1..].trim());
    if local.is_empty() || domain.is_empty() || domain.contains(char::is_whitespace) {
        return None;
    }
    if !local.starts_with('"') && local.contains(char::is_whitespace) {
        return None;
    }
    Some(format!("{}@{}", local, domain))
}
