/*
 * parser.rs
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

//! MIME parser: receive(buffer) contract, consume complete lines only, keep the remainder for the next call.

use crate::mime::charset::decode_header_bytes;
use crate::mime::content_type::parse_content_type;
use crate::mime::handler::{MimeHandler, MimeLocator, MimeParseError};
use crate::mime::utils::is_valid_boundary;

/// Event-driven MIME parser. Feed data via receive(); handler gets callbacks.
///
/// Multipart entities are tracked on a stack, so nested multiparts produce
/// properly nested `start_entity`/`end_entity` pairs. Body bytes are passed
/// through still transfer-encoded; decoding is left to the handler.
pub struct MimeParser<H> {
    handler: H,
    state: ParserState,
    /// Incomplete line carried over from previous receive()
    line_buffer: Vec<u8>,
    /// Header line waiting for possible folded continuation lines
    pending_header: Vec<u8>,
    /// Open entities, outermost (the message itself) first
    frames: Vec<Frame>,
    /// Line terminator of the last body line. Held back because the line break
    /// before a boundary delimiter belongs to the delimiter.
    pending_eol: Vec<u8>,
    locator: MimeLocator,
    closed: bool,
}

struct Frame {
    /// Delimiter that opened this entity (None for the top-level message).
    opened_by: Option<String>,
    /// Boundary from this entity's Content-Type, seen while reading its headers.
    declared_boundary: Option<String>,
    /// Active boundary once the headers are done: this entity is a multipart container.
    boundary: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ParserState {
    #[default]
    Init,
    Header,
    /// Body of the innermost (leaf) entity.
    Body,
    /// Between a container's headers and its first delimiter.
    Preamble,
    /// After a container's close-delimiter.
    Epilogue,
}

impl<H: MimeHandler> MimeParser<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            state: ParserState::Init,
            line_buffer: Vec::new(),
            pending_header: Vec::new(),
            frames: Vec::new(),
            pending_eol: Vec::new(),
            locator: MimeLocator {
                offset: 0,
                line: 1,
            },
            closed: false,
        }
    }

    /// Process as much as possible from buf. Complete lines are parsed; an
    /// incomplete tail is kept until the next call or close().
    /// Returns number of bytes consumed from buf (always all of it).
    pub fn receive(&mut self, buf: &[u8]) -> Result<usize, MimeParseError> {
        if self.closed {
            return Err(MimeParseError::at("receive after close", self.locator.clone()));
        }
        let mut line_start = 0;
        for (i, &b) in buf.iter().enumerate() {
            if b == b'\n' {
                let line = if self.line_buffer.is_empty() {
                    buf[line_start..=i].to_vec()
                } else {
                    let mut joined = std::mem::take(&mut self.line_buffer);
                    joined.extend_from_slice(&buf[line_start..=i]);
                    joined
                };
                self.locator.offset += line.len() as u64;
                self.process_line(&line)?;
                self.locator.line += 1;
                line_start = i + 1;
            }
        }
        self.line_buffer.extend_from_slice(&buf[line_start..]);
        Ok(buf.len())
    }

    /// End of input; flush any pending state and close every open entity.
    pub fn close(&mut self) -> Result<(), MimeParseError> {
        if self.closed {
            return Ok(());
        }
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            self.locator.offset += line.len() as u64;
            self.process_line(&line)?;
        }
        self.closed = true;
        self.handler.set_locator(self.locator.clone());
        match self.state {
            ParserState::Init => {
                self.open_entity(None)?;
                self.handler.end_headers()?;
            }
            ParserState::Header => {
                self.flush_header()?;
                self.handler.end_headers()?;
            }
            ParserState::Body => {
                if !self.pending_eol.is_empty() {
                    let eol = std::mem::take(&mut self.pending_eol);
                    self.handler.body_content(&eol)?;
                }
            }
            ParserState::Preamble | ParserState::Epilogue => {}
        }
        while !self.frames.is_empty() {
            self.end_top_entity()?;
        }
        Ok(())
    }

    /// Return the handler (e.g. after close) for inspection.
    pub fn into_inner(self) -> H {
        self.handler
    }

    fn process_line(&mut self, raw: &[u8]) -> Result<(), MimeParseError> {
        let line = trim_trailing_crlf(raw);
        let eol = &raw[line.len()..];
        match self.state {
            ParserState::Init => {
                self.open_entity(None)?;
                self.state = ParserState::Header;
                self.header_line(line)?;
            }
            ParserState::Header => {
                if let Some((index, closing)) = self.match_delimiter(line) {
                    // Part headers cut short by a delimiter: treat as an empty body.
                    self.flush_header()?;
                    self.handler.end_headers()?;
                    self.delimiter(index, closing)?;
                } else {
                    self.header_line(line)?;
                }
            }
            ParserState::Body | ParserState::Preamble | ParserState::Epilogue => {
                if let Some((index, closing)) = self.match_delimiter(line) {
                    self.delimiter(index, closing)?;
                } else if self.state == ParserState::Body {
                    self.body_line(line, eol)?;
                } else {
                    self.handler.unexpected_content(line)?;
                }
            }
        }
        Ok(())
    }

    fn header_line(&mut self, line: &[u8]) -> Result<(), MimeParseError> {
        if line.is_empty() {
            self.flush_header()?;
            return self.end_headers();
        }
        if matches!(line[0], b' ' | b'\t') && !self.pending_header.is_empty() {
            self.pending_header.extend_from_slice(line);
            return Ok(());
        }
        self.flush_header()?;
        self.pending_header.extend_from_slice(line);
        Ok(())
    }

    fn flush_header(&mut self) -> Result<(), MimeParseError> {
        if self.pending_header.is_empty() {
            return Ok(());
        }
        let header = std::mem::take(&mut self.pending_header);
        let (name, value) = match split_header(&header) {
            Some(p) => p,
            None => return Ok(()),
        };
        let name = String::from_utf8_lossy(name).trim().to_string();
        let value = decode_header_bytes(value);
        let value = value.trim();
        match name.to_ascii_lowercase().as_str() {
            "content-type" => {
                if let Some(ct) = parse_content_type(value) {
                    if ct.is_primary_type("multipart") {
                        if let Some(b) = ct.get_parameter("boundary") {
                            if is_valid_boundary(b) {
                                if let Some(frame) = self.frames.last_mut() {
                                    frame.declared_boundary = Some(b.to_string());
                                }
                            }
                        }
                    }
                }
                self.handler.content_type(value)?;
            }
            "content-transfer-encoding" => {
                self.handler.content_transfer_encoding(value)?;
            }
            _ => {
                self.handler.header(&name, value)?;
            }
        }
        Ok(())
    }

    fn end_headers(&mut self) -> Result<(), MimeParseError> {
        self.handler.end_headers()?;
        let boundary = self.frames.last_mut().and_then(|f| {
            f.boundary = f.declared_boundary.take();
            f.boundary.clone()
        });
        self.pending_eol.clear();
        self.state = if boundary.is_some() {
            ParserState::Preamble
        } else {
            ParserState::Body
        };
        Ok(())
    }

    fn body_line(&mut self, line: &[u8], eol: &[u8]) -> Result<(), MimeParseError> {
        if !self.pending_eol.is_empty() {
            let held = std::mem::take(&mut self.pending_eol);
            self.handler.body_content(&held)?;
        }
        if !line.is_empty() {
            self.handler.body_content(line)?;
        }
        self.pending_eol.extend_from_slice(eol);
        Ok(())
    }

    /// Find the innermost open container whose boundary this line delimits.
    /// Returns (frame index, is close-delimiter).
    fn match_delimiter(&self, line: &[u8]) -> Option<(usize, bool)> {
        if !line.starts_with(b"--") {
            return None;
        }
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, frame)| {
                let boundary = frame.boundary.as_deref()?;
                delimiter_kind(line, boundary).map(|closing| (i, closing))
            })
    }

    fn delimiter(&mut self, index: usize, closing: bool) -> Result<(), MimeParseError> {
        self.pending_eol.clear();
        while self.frames.len() > index + 1 {
            self.end_top_entity()?;
        }
        if closing {
            self.state = ParserState::Epilogue;
        } else {
            let boundary = self.frames[index].boundary.clone();
            self.open_entity(boundary)?;
            self.state = ParserState::Header;
        }
        Ok(())
    }

    fn open_entity(&mut self, opened_by: Option<String>) -> Result<(), MimeParseError> {
        self.handler.set_locator(self.locator.clone());
        self.handler.start_entity(opened_by.as_deref())?;
        self.frames.push(Frame {
            opened_by,
            declared_boundary: None,
            boundary: None,
        });
        Ok(())
    }

    fn end_top_entity(&mut self) -> Result<(), MimeParseError> {
        if let Some(frame) = self.frames.pop() {
            self.handler.end_entity(frame.opened_by.as_deref())?;
        }
        Ok(())
    }
}

/// Parse a complete message held in memory and return the handler.
pub fn parse_bytes<H: MimeHandler>(raw: &[u8], handler: H) -> Result<H, MimeParseError> {
    let mut parser = MimeParser::new(handler);
    parser.receive(raw)?;
    parser.close()?;
    Ok(parser.into_inner())
}

fn trim_trailing_crlf(s: &[u8]) -> &[u8] {
    let mut end = s.len();
    if end >= 2 && s[end - 2] == b'\r' && s[end - 1] == b'\n' {
        end -= 2;
    } else if end >= 1 && (s[end - 1] == b'\n' || s[end - 1] == b'\r') {
        end -= 1;
    }
    &s[..end]
}

fn split_header(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = line.iter().position(|&b| b == b':')?;
    if colon == 0 {
        return None;
    }
    Some((&line[..colon], &line[colon + 1..]))
}

/// Some(false) for a delimiter line, Some(true) for a close-delimiter, None otherwise.
/// Trailing linear whitespace (transport padding) is allowed.
fn delimiter_kind(line: &[u8], boundary: &str) -> Option<bool> {
    let rest = line.strip_prefix(b"--")?.strip_prefix(boundary.as_bytes())?;
    let (closing, rest) = match rest.strip_prefix(b"--") {
        Some(r) => (true, r),
        None => (false, rest),
    };
    if rest.iter().all(|&b| b == b' ' || b == b'\t') {
        Some(closing)
    } else {
        None
    }
}
