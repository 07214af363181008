//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! The dispatcher only ever talks to the `Transport` trait, so tests can
//! swap in an in-memory fake. `UreqTransport` is the blocking default: it
//! keeps one agent that verifies TLS peers and one that does not, and picks
//! between them per request.

use std::io;

use ureq::tls::TlsConfig;
use ureq::typestate::WithBody;
use ureq::{Agent, RequestBuilder};

use crate::error::{ApiError, TransportErrorKind};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round-trip.
///
/// Implementations return `Err(ApiError::Transport { .. })` when no response
/// was received. Any HTTP status, including 4xx/5xx, is a response.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport built on `ureq`.
#[derive(Clone)]
pub struct UreqTransport {
    verifying: Agent,
    insecure: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            verifying: build_agent(true),
            insecure: build_agent(false),
        }
    }

    fn agent(&self, verify_tls: bool) -> &Agent {
        if verify_tls {
            &self.verifying
        } else {
            &self.insecure
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Status codes are returned as data so the dispatcher can interpret them.
/// Redirects are not followed; a 3xx is handed back like any other status.
fn build_agent(verify_tls: bool) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .max_redirects(0)
        .max_redirects_will_error(false)
        .tls_config(TlsConfig::builder().disable_verification(!verify_tls).build())
        .build()
        .new_agent()
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = self.agent(request.verify_tls);
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => with_headers(agent.get(&request.url), request).call(),
            HttpMethod::Delete => with_headers(agent.delete(&request.url), request).call(),
            HttpMethod::Post => send(with_headers(agent.post(&request.url), request), body),
            HttpMethod::Put => send(with_headers(agent.put(&request.url), request), body),
        };
        let mut response = result.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(map_error)?;
        let body = body_text(bytes)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// A body that arrived but is not UTF-8 is a decoding failure, not a
/// transport one.
fn body_text(bytes: Vec<u8>) -> Result<String, ApiError> {
    String::from_utf8(bytes)
        .map_err(|e| ApiError::DeserializationError(format!("response body is not UTF-8: {e}")))
}

fn with_headers<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: RequestBuilder<WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn map_error(err: ureq::Error) -> ApiError {
    let kind = match &err {
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            TransportErrorKind::ConnectionRefused
        }
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
        ureq::Error::Io(_) => TransportErrorKind::Io,
        ureq::Error::ConnectionFailed => TransportErrorKind::ConnectionRefused,
        ureq::Error::HostNotFound => TransportErrorKind::HostNotFound,
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::BadUri(_) => TransportErrorKind::InvalidUrl,
        _ => TransportErrorKind::Other,
    };
    tracing::warn!(%kind, error = %err, "transport failure");
    ApiError::transport(kind, err.to_string())
}
