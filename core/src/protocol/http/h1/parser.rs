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

//! HTTP/1.1 response push parser: status line, headers, body (Content-Length, chunked or until close).

use bytes::Buf;
use bytes::BytesMut;
use std::io;

/// Callback for HTTP/1.1 response events. Connection implements this and forwards to ResponseHandler.
pub trait H1ResponseHandler {
    fn status(&mut self, code: u16, reason: Option<&str>);
    fn header(&mut self, name: &str, value: &str);
    fn body_chunk(&mut self, data: &[u8]);
    fn end_body(&mut self);
    fn trailer(&mut self, name: &str, value: &str);
    fn complete(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    StatusLine,
    Headers,
    /// Headers done; connection must call set_body_mode() before feeding more data.
    HeadersComplete,
    Body,
    ChunkSize,
    ChunkData,
    ChunkTrailer,
}

/// Push parser for HTTP/1.1 response. Feed bytes via `receive`; handler is invoked as complete tokens are parsed.
pub struct ResponseParser {
    state: ParseState,
    /// Content-Length when known; None for read-until-close.
    content_length: Option<u64>,
    bytes_received: u64,
    /// Current chunk size (for chunked encoding).
    chunk_remaining: u64,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            content_length: None,
            bytes_received: 0,
            chunk_remaining: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = ParseState::StatusLine;
        self.content_length = None;
        self.bytes_received = 0;
        self.chunk_remaining = 0;
    }

    /// Offset of the first CRLF in buf, if any.
    fn find_crlf(buf: &[u8]) -> Option<usize> {
        buf.windows(2).position(|w| w == b"\r\n")
    }

    /// Consume and parse as much as possible from buf. Handler is called for each complete token.
    /// Partial data remains in buf. Stops at HeadersComplete so the connection can pick the body mode.
    pub fn receive<H: H1ResponseHandler>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), io::Error> {
        while !buf.is_empty() {
            match self.state {
                ParseState::StatusLine => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                    let line = buf.split_to(line_end + 2);
                    let line_str = std::str::from_utf8(&line[..line_end]).map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidData, "invalid status line UTF-8")
                    })?;
                    // HTTP/1.1 200 OK or HTTP/1.1 200
                    let mut parts = line_str.splitn(3, ' ');
                    let version = parts.next().unwrap_or("");
                    let code = parts.next().and_then(|s| s.parse::<u16>().ok());
                    let code = match code {
                        Some(c) if version.starts_with("HTTP/") && (100..1000).contains(&c) => c,
                        _ => {
                            return Err(io::Error::new(
                                io::ErrorKind::InvalidData,
                                format!("malformed status line: {}", line_str),
                            ))
                        }
                    };
                    let reason = parts.next().filter(|r| !r.is_empty());
                    handler.status(code, reason);
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                    if line_end == 0 {
                        buf.advance(2);
                        self.state = ParseState::HeadersComplete;
                        return Ok(());
                    }
                    let line = buf.split_to(line_end + 2);
                    let line_str = std::str::from_utf8(&line[..line_end]).map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidData, "invalid header UTF-8")
                    })?;
                    if let Some(colon) = line_str.find(':') {
                        handler.header(line_str[..colon].trim(), line_str[colon + 1..].trim());
                    }
                }
                ParseState::HeadersComplete | ParseState::Idle => return Ok(()),
                ParseState::Body => match self.content_length {
                    Some(length) => {
                        let remaining = (length - self.bytes_received) as usize;
                        let to_read = remaining.min(buf.len());
                        if to_read > 0 {
                            let chunk = buf.split_to(to_read);
                            handler.body_chunk(&chunk);
                            self.bytes_received += to_read as u64;
                        }
                        if self.bytes_received >= length {
                            handler.end_body();
                            handler.complete();
                            self.state = ParseState::Idle;
                        }
                    }
                    None => {
                        // Read until close; finish_at_eof() ends the body.
                        let chunk = buf.split_to(buf.len());
                        handler.body_chunk(&chunk);
                    }
                },
                ParseState::ChunkSize => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                    let line = buf.split_to(line_end + 2);
                    let line_str = std::str::from_utf8(&line[..line_end]).unwrap_or("");
                    let hex_part = line_str.split(';').next().unwrap_or("").trim();
                    self.chunk_remaining = u64::from_str_radix(hex_part, 16).map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidData, "invalid chunk size")
                    })?;
                    self.state = if self.chunk_remaining == 0 {
                        ParseState::ChunkTrailer
                    } else {
                        ParseState::ChunkData
                    };
                }
                ParseState::ChunkData => {
                    if self.chunk_remaining > 0 {
                        let to_read = (self.chunk_remaining as usize).min(buf.len());
                        let chunk = buf.split_to(to_read);
                        handler.body_chunk(&chunk);
                        self.chunk_remaining -= to_read as u64;
                    }
                    if self.chunk_remaining > 0 {
                        return Ok(());
                    }
                    // chunk-data is followed by CRLF
                    if buf.len() < 2 {
                        return Ok(());
                    }
                    buf.advance(2);
                    self.state = ParseState::ChunkSize;
                }
                ParseState::ChunkTrailer => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                    if line_end == 0 {
                        buf.advance(2);
                        handler.end_body();
                        handler.complete();
                        self.state = ParseState::Idle;
                    } else {
                        let line = buf.split_to(line_end + 2);
                        let line_str = String::from_utf8_lossy(&line[..line_end]);
                        if let Some(colon) = line_str.find(':') {
                            handler.trailer(line_str[..colon].trim(), line_str[colon + 1..].trim());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Called by the connection after headers are received (state HeadersComplete).
    /// Content-Length 0 goes straight to Idle; the connection reports completion.
    pub fn set_body_mode(&mut self, content_length: Option<u64>, chunked: bool) {
        if self.state != ParseState::HeadersComplete {
            return;
        }
        self.bytes_received = 0;
        if chunked {
            self.content_length = None;
            self.state = ParseState::ChunkSize;
        } else {
            self.content_length = content_length;
            self.state = match content_length {
                Some(0) => ParseState::Idle,
                _ => ParseState::Body,
            };
        }
    }

    /// The peer closed the connection. Returns true if that legitimately ends
    /// the response (a read-until-close body).
    pub fn finish_at_eof<H: H1ResponseHandler>(&mut self, handler: &mut H) -> bool {
        if self.state == ParseState::Body && self.content_length.is_none() {
            handler.end_body();
            handler.complete();
            self.state = ParseState::Idle;
            true
        } else {
            self.state == ParseState::Idle
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}
