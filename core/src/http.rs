//! HTTP transport types and header selection.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! dispatcher builds `HttpRequest` values and decodes `HttpResponse` values
//! without touching the network; a `Transport` executes the actual I/O. This
//! keeps header and port policy testable with a fake transport.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a body is attached for this method. GET and DELETE never
    /// carry one.
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content types the dispatcher can attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Xml,
    OctetStream,
    Form,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Xml => "text/xml",
            ContentType::OctetStream => "application/octet-stream",
            ContentType::Form => "application/x-www-form-urlencoded",
        }
    }
}

/// Upload endpoints always send raw bytes, whatever their suffix says.
const UPLOAD_PATHS: [&str; 2] = ["/uploads.json", "/uploads.xml"];

/// Pick the content type for `path` from its suffix.
///
/// The query string is ignored. Upload endpoints are matched on the whole
/// path and override the suffix rule.
pub fn content_type_for(path: &str) -> Option<ContentType> {
    if UPLOAD_PATHS.contains(&path) {
        return Some(ContentType::OctetStream);
    }
    let bare = path.split(['?', '#']).next().unwrap_or(path);
    if bare.ends_with("xml") {
        Some(ContentType::Xml)
    } else if bare.ends_with("json") {
        Some(ContentType::Json)
    } else {
        None
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL with the resolved port applied.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// When false the transport must not verify the TLS peer.
    pub verify_tls: bool,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}
