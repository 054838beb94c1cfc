/*
 * connection.rs
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

//! HTTP connection: one TCP or TLS stream, drives the H1 parser, invokes ResponseHandler.

use bytes::BytesMut;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tracing::debug;

use crate::protocol::http::h1::{H1ResponseHandler, ParseState, ResponseParser};
use crate::protocol::http::request::{Method, RequestBuilder};
use crate::protocol::http::response::Response;
use crate::protocol::http::ResponseHandler;

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<TokioTlsStream<TcpStream>>),
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Bridges H1 parser callbacks to the connection state and user's ResponseHandler.
/// Status and headers are held until the head is complete; body events go straight through.
struct H1Driver<'a> {
    h1_status: &'a mut Option<(u16, Option<String>)>,
    h1_headers: &'a mut Vec<(String, String)>,
    handler: &'a mut (dyn ResponseHandler + Send),
}

impl H1ResponseHandler for H1Driver<'_> {
    fn status(&mut self, code: u16, reason: Option<&str>) {
        *self.h1_status = Some((code, reason.map(|s| s.to_string())));
    }

    fn header(&mut self, name: &str, value: &str) {
        self.h1_headers.push((name.to_string(), value.to_string()));
    }

    fn body_chunk(&mut self, data: &[u8]) {
        self.handler.body_chunk(data);
    }

    fn end_body(&mut self) {
        self.handler.end_body();
    }

    fn trailer(&mut self, name: &str, value: &str) {
        self.handler.header(name, value);
    }

    fn complete(&mut self) {
        self.handler.complete();
    }
}

/// HTTP/1.1 connection: holds the stream and drives the read loop. Call send() to issue a request.
pub struct HttpConnection {
    stream: HttpStream,
    host: String,
    port: u16,
    secure: bool,

    read_buf: BytesMut,
    h1_parser: ResponseParser,
    h1_status: Option<(u16, Option<String>)>,
    h1_headers: Vec<(String, String)>,
}

impl HttpConnection {
    /// Create from an already-connected stream. Used by HttpClient::connect().
    pub fn new(stream: HttpStream, host: String, port: u16, secure: bool) -> Self {
        Self {
            stream,
            host,
            port,
            secure,
            read_buf: BytesMut::with_capacity(8192),
            h1_parser: ResponseParser::new(),
            h1_status: None,
            h1_headers: Vec::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Build a request (method, path). Use send() to execute it with a handler.
    pub fn request(&mut self, method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, path.into())
    }

    /// Send the request and run the read loop until the response is complete.
    /// Handler is invoked as data arrives; on error it also receives `failed`.
    pub async fn send(
        &mut self,
        request: RequestBuilder,
        handler: &mut (dyn ResponseHandler + Send),
    ) -> io::Result<()> {
        let result = self.send_http1(&request, handler).await;
        if let Err(e) = &result {
            handler.failed(e);
        }
        result
    }

    async fn send_http1(
        &mut self,
        request: &RequestBuilder,
        handler: &mut (dyn ResponseHandler + Send),
    ) -> io::Result<()> {
        self.h1_status = None;
        self.h1_headers.clear();
        self.h1_parser.reset();
        self.read_buf.clear();

        let host_header = if (self.secure && self.port != 443) || (!self.secure && self.port != 80) {
            format!("{}:{}", self.host_for_header(), self.port)
        } else {
            self.host_for_header()
        };
        debug!("{} {} (host {})", request.method.as_str(), request.path, host_header);
        self.stream.write_all(&request.to_http1(&host_header)).await?;
        self.stream.flush().await?;

        let head_only = request.method == Method::Head;
        loop {
            self.drain(handler, head_only)?;
            if self.h1_parser.state() == ParseState::Idle {
                return Ok(());
            }
            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                let mut driver = H1Driver {
                    h1_status: &mut self.h1_status,
                    h1_headers: &mut self.h1_headers,
                    handler: &mut *handler,
                };
                if self.h1_parser.finish_at_eof(&mut driver) {
                    return Ok(());
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "HTTP connection closed before response was complete",
                ));
            }
        }
    }

    /// Parse everything buffered so far, handling the end of the response head in between.
    fn drain(&mut self, handler: &mut (dyn ResponseHandler + Send), head_only: bool) -> io::Result<()> {
        loop {
            let mut driver = H1Driver {
                h1_status: &mut self.h1_status,
                h1_headers: &mut self.h1_headers,
                handler: &mut *handler,
            };
            self.h1_parser.receive(&mut self.read_buf, &mut driver)?;
            if self.h1_parser.state() != ParseState::HeadersComplete {
                return Ok(());
            }
            self.headers_complete(handler, head_only);
        }
    }

    fn headers_complete(&mut self, handler: &mut (dyn ResponseHandler + Send), head_only: bool) {
        let (code, reason) = self.h1_status.take().unwrap_or((0, None));
        if (100..200).contains(&code) {
            // Interim response: wait for the final one.
            self.h1_headers.clear();
            self.h1_parser.reset();
            return;
        }
        let content_length = self
            .h1_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<u64>().ok());
        let chunked = self
            .h1_headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("transfer-encoding") && v.to_ascii_lowercase().contains("chunked"));

        let response = match reason {
            Some(r) => Response::with_reason(code, r),
            None => Response::new(code),
        };
        if response.is_success() {
            handler.ok(response);
        } else {
            handler.error(response);
        }
        for (name, value) in self.h1_headers.drain(..) {
            handler.header(&name, &value);
        }
        let bodiless = head_only || code == 204 || code == 304 || (!chunked && content_length == Some(0));
        if bodiless {
            self.h1_parser.set_body_mode(Some(0), false);
            handler.complete();
        } else {
            handler.start_body();
            self.h1_parser.set_body_mode(content_length, chunked);
        }
    }

    fn host_for_header(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}
