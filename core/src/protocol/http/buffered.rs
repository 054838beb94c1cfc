/*
 * buffered.rs
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

//! ResponseHandler that collects a whole response in memory.

use crate::protocol::http::response::Response;
use crate::protocol::http::ResponseHandler;

/// Buffers status, headers and body. Suitable for small API responses.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub complete: bool,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn status_line(&mut self, response: Response) {
        self.status = response.code;
        self.reason = response.reason;
    }
}

impl ResponseHandler for BufferedResponse {
    fn ok(&mut self, response: Response) {
        self.status_line(response);
    }

    fn error(&mut self, response: Response) {
        self.status_line(response);
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn start_body(&mut self) {}

    fn body_chunk(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    fn end_body(&mut self) {}

    fn complete(&mut self) {
        self.complete = true;
    }

    fn failed(&mut self, _error: &std::io::Error) {
        self.complete = false;
    }
}
