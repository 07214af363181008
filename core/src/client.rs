//! The public entry point: connection setters, raw verbs and sub-clients.
//!
//! # Design
//! `Client` shares one `Dispatcher` with every sub-client through an `Arc`.
//! Sub-clients are created on first use and memoized in `OnceLock`s, so
//! asking for the same resource twice yields the same instance.

use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;

use crate::api::{Api, Boards, Cards, Members, Resource};
use crate::config::ConnectionConfig;
use crate::dispatch::{Dispatcher, Response};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::transport::{Transport, UreqTransport};

/// Blocking client for the Trello REST API.
#[derive(Debug)]
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    boards: OnceLock<Boards>,
    cards: OnceLock<Cards>,
    members: OnceLock<Members>,
}

impl Client {
    /// Client over `ureq`. An empty `credential` disables authentication.
    pub fn new(base_url: &str, credential: impl Into<String>) -> Self {
        Self::with_transport(ConnectionConfig::new(base_url, credential), UreqTransport::new())
    }

    pub fn with_transport(config: ConnectionConfig, transport: impl Transport + 'static) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(config, transport)),
            boards: OnceLock::new(),
            cards: OnceLock::new(),
            members: OnceLock::new(),
        }
    }

    /// Client configured from `TRELLO_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::with_transport(ConnectionConfig::from_env()?, UreqTransport::new()))
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.dispatcher.config()
    }

    pub fn set_verify_tls(&self, verify: bool) {
        self.config().set_verify_tls(verify);
    }

    pub fn set_port(&self, port: Option<u16>) {
        self.config().set_port(port);
    }

    /// See [`ConnectionConfig::resolve_port`].
    pub fn port(&self, url: Option<&str>) -> Result<Option<u16>, ApiError> {
        self.config().resolve_port(url)
    }

    /// Look up a sub-client by name.
    pub fn api(&self, name: &str) -> Result<Api<'_>, ApiError> {
        Ok(match name.parse::<Resource>()? {
            Resource::Boards => Api::Boards(self.boards()),
            Resource::Cards => Api::Cards(self.cards()),
            Resource::Members => Api::Members(self.members()),
        })
    }

    pub fn boards(&self) -> &Boards {
        self.boards.get_or_init(|| Boards::new(Arc::clone(&self.dispatcher)))
    }

    pub fn cards(&self) -> &Cards {
        self.cards.get_or_init(|| Cards::new(Arc::clone(&self.dispatcher)))
    }

    pub fn members(&self) -> &Members {
        self.members.get_or_init(|| Members::new(Arc::clone(&self.dispatcher)))
    }

    pub fn dispatch(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&str>,
    ) -> Result<Response, ApiError> {
        self.dispatcher.dispatch(path, method, body)
    }

    /// `dispatch`, with 404 as `NotFound` and other non-2xx as `HttpError`.
    pub fn dispatch_checked(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&str>,
    ) -> Result<Response, ApiError> {
        self.dispatcher.dispatch_checked(path, method, body)
    }

    /// GET and JSON-decode `path`. `None` means the server sent no content.
    pub fn get(&self, path: &str) -> Result<Option<serde_json::Value>, ApiError> {
        self.dispatcher.get(path)
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        self.dispatcher.get_json(path)
    }

    pub fn post(&self, path: &str, body: &str) -> Result<Response, ApiError> {
        self.dispatcher.post(path, body)
    }

    pub fn put(&self, path: &str, body: &str) -> Result<Response, ApiError> {
        self.dispatcher.put(path, body)
    }

    pub fn delete(&self, path: &str) -> Result<Response, ApiError> {
        self.dispatcher.delete(path)
    }
}
