//! Blocking client for the Trello REST API.
//!
//! # Overview
//! A `Client` turns a path, a method and an optional body into one HTTP call
//! and sniffs the body into a `Response`: an XML document when it starts
//! with `<`, raw text otherwise, or `Empty` when there is no content.
//! Resource sub-clients (`boards`, `cards`, `members`) marshal parameters on
//! top of that.
//!
//! # Design
//! - `Dispatcher::build_request` is pure, so port, header and TLS policy are
//!   testable without a network; `Transport` performs the I/O.
//! - `ConnectionConfig` caches the resolved port behind `&self`, so a client
//!   can be shared across threads.
//! - Sub-clients are a closed set (`Resource`), memoized per client.

pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
pub mod xml;

pub use api::{Api, Boards, Cards, Members, Resource};
pub use client::Client;
pub use config::{AuthScheme, ConnectionConfig};
pub use dispatch::{decode_body, Dispatcher, Response};
pub use error::{ApiError, TransportErrorKind};
pub use http::{content_type_for, ContentType, HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{Board, BoardUpdate, Card, CardUpdate, Member, NewBoard, NewCard};
pub use xml::XmlElement;
