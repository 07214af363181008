//! Connection settings shared by every request a client makes.
//!
//! # Design
//! Setters take `&self` so a `Client` can hand its dispatcher to sub-clients
//! behind an `Arc` and still be reconfigured. The resolved port is cached in
//! a `Mutex`; the first value stored wins, so concurrent first use resolves
//! to the same port everywhere.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::Rng;
use url::Url;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1";

/// How the credential is presented in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `Basic base64(credential:)`.
    #[default]
    Basic,
    /// `Bearer credential`.
    Bearer,
    /// `Basic base64(credential:NNNNNN)` with a throwaway six-digit password.
    /// Only some legacy servers expect this form.
    BasicDisposablePassword,
}

impl AuthScheme {
    fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthScheme::Basic),
            "bearer" => Ok(AuthScheme::Bearer),
            "basic-disposable" => Ok(AuthScheme::BasicDisposablePassword),
            other => Err(ApiError::Config(format!("unknown auth scheme `{other}`"))),
        }
    }

    /// Render the `Authorization` header value for `credential`.
    pub fn header_value(&self, credential: &str) -> String {
        match self {
            AuthScheme::Basic => format!("Basic {}", STANDARD.encode(format!("{credential}:"))),
            AuthScheme::Bearer => format!("Bearer {credential}"),
            AuthScheme::BasicDisposablePassword => {
                let password: u32 = rand::thread_rng().gen_range(100_000..=199_999);
                format!("Basic {}", STANDARD.encode(format!("{credential}:{password}")))
            }
        }
    }
}

/// Base URL, credential, port and TLS policy for one client.
#[derive(Debug)]
pub struct ConnectionConfig {
    base_url: String,
    credential: Option<String>,
    auth_scheme: AuthScheme,
    port: Mutex<Option<u16>>,
    verify_tls: AtomicBool,
}

impl ConnectionConfig {
    /// An empty `credential` means no `Authorization` header is sent.
    pub fn new(base_url: &str, credential: impl Into<String>) -> Self {
        let credential = credential.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: (!credential.is_empty()).then_some(credential),
            auth_scheme: AuthScheme::default(),
            port: Mutex::new(None),
            verify_tls: AtomicBool::new(false),
        }
    }

    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    /// Build a config from `TRELLO_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup("TRELLO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let credential = lookup("TRELLO_API_KEY").unwrap_or_default();
        let mut config = Self::new(&base_url, credential);

        if let Some(raw) = lookup("TRELLO_AUTH_SCHEME") {
            config.auth_scheme = AuthScheme::parse(&raw)?;
        }
        if let Some(raw) = lookup("TRELLO_PORT") {
            let port = raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ApiError::Config(format!("TRELLO_PORT `{raw}`: {e}")))?;
            config.set_port(Some(port));
        }
        if let Some(raw) = lookup("TRELLO_VERIFY_TLS") {
            config.set_verify_tls(parse_flag(&raw)?);
        }
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn auth_scheme(&self) -> AuthScheme {
        self.auth_scheme
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls.load(Ordering::Relaxed)
    }

    pub fn set_verify_tls(&self, verify: bool) {
        self.verify_tls.store(verify, Ordering::Relaxed);
    }

    /// Override the port. `None` leaves the current value untouched.
    pub fn set_port(&self, port: Option<u16>) {
        if let Some(port) = port {
            *self.port.lock().unwrap_or_else(PoisonError::into_inner) = Some(port);
        }
    }

    /// Return the port for this connection, inferring and caching it from
    /// `url` when none is known yet.
    ///
    /// An explicit port in `url` is used as is; otherwise `http` maps to 80
    /// and `https` to 443. Without a `url` the cached value is returned,
    /// which may be `None`.
    pub fn resolve_port(&self, url: Option<&str>) -> Result<Option<u16>, ApiError> {
        let mut cached = self.port.lock().unwrap_or_else(PoisonError::into_inner);
        if cached.is_some() {
            return Ok(*cached);
        }
        let Some(url) = url else {
            return Ok(None);
        };
        let port = infer_port(url)?;
        tracing::trace!(url, port, "resolved connection port");
        *cached = Some(port);
        Ok(Some(port))
    }

    /// The `Authorization` header value, if a credential is configured.
    pub fn authorization(&self) -> Option<String> {
        self.credential
            .as_deref()
            .map(|credential| self.auth_scheme.header_value(credential))
    }
}

fn infer_port(raw: &str) -> Result<u16, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    // `Url::port` is `None` when the port is absent or equals the scheme default.
    if let Some(port) = url.port() {
        return Ok(port);
    }
    match url.scheme() {
        "http" => Ok(80),
        "https" => Ok(443),
        other => Err(ApiError::UnsupportedScheme(other.to_string())),
    }
}

fn parse_flag(raw: &str) -> Result<bool, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ApiError::Config(format!("TRELLO_VERIFY_TLS `{other}` is not a boolean"))),
    }
}
