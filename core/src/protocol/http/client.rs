/*
 * client.rs
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

//! HTTP client: connect to a host, then use the connection to send requests with a callback handler.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::net::http_client_config;
use crate::protocol::http::buffered::BufferedResponse;
use crate::protocol::http::connection::{HttpConnection, HttpStream};
use crate::protocol::http::request::Method;
use crate::protocol::http::url::HttpUrl;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client. Create with `HttpClient::connect(host, port, use_tls)` then use the returned
/// connection to build requests and send with a handler.
pub struct HttpClient;

impl HttpClient {
    /// Connect to the given host and port. If `use_tls` is true, performs the TLS handshake
    /// (ALPN http/1.1) before returning.
    pub async fn connect(host: &str, port: u16, use_tls: bool) -> io::Result<HttpConnection> {
        let tcp = timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TCP connect timed out"))??;
        debug!("connected to {}:{}", host, port);

        let stream = if use_tls {
            let server_name = ServerName::try_from(host.to_string())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
            let connector = TlsConnector::from(http_client_config());
            let tls = connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
            HttpStream::Tls(Box::new(tls))
        } else {
            HttpStream::Plain(tcp)
        };
        Ok(HttpConnection::new(stream, host.to_string(), port, use_tls))
    }

    /// Connect to the scheme, host and port of a URL.
    pub async fn connect_url(url: &HttpUrl) -> io::Result<HttpConnection> {
        Self::connect(&url.host, url.port, url.secure).await
    }

    /// One-shot POST: connect, send `body` with the given headers, and collect the response.
    pub async fn post(
        url: &HttpUrl,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> io::Result<BufferedResponse> {
        let mut conn = Self::connect_url(url).await?;
        let mut req = conn.request(Method::Post, url.path.clone());
        for (name, value) in headers {
            req.header(*name, *value);
        }
        req.header("Connection", "close").body(body);
        let mut response = BufferedResponse::new();
        conn.send(req, &mut response).await?;
        Ok(response)
    }
}
