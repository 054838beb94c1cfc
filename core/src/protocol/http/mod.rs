/*
 * mod.rs
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

//! HTTP client: HTTP/1.1 over plain TCP or rustls with push-parsed responses.
//!
//! - Callback-based response API (Gumdrop-shaped): `ResponseHandler` with `ok`/`error`, `header`, `start_body`, `body_chunk`, `end_body`, `complete`, `failed`.
//! - Buffers: `bytes` crate (BytesMut for the parse buffer).
//! - `BufferedResponse` collects a response for callers that want the whole body.

mod buffered;
mod handler;
mod request;
mod response;
mod url;

pub mod h1;

pub use buffered::BufferedResponse;
pub use handler::ResponseHandler;
pub use h1::H1ResponseHandler;
pub use request::{Method, RequestBuilder};
pub use response::Response;
pub use url::HttpUrl;

pub mod client;
pub mod connection;

pub use client::HttpClient;
pub use connection::{HttpConnection, HttpStream};
