//! Request dispatch: one path, one method, one HTTP call, one decoded result.
//!
//! # Design
//! `build_request` and `decode_body` are pure, which keeps the header, port
//! and TLS policy testable without a network. `dispatch` glues them to a
//! `Transport`. The decoded `Response` is chosen by sniffing the body, not by
//! the server's declared content type, and regardless of the status code.
//! Callers that want 4xx/5xx as errors opt in with `dispatch_checked`.

use std::fmt;

use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ConnectionConfig;
use crate::error::ApiError;
use crate::http::{content_type_for, ContentType, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::xml::XmlElement;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The body started with `<` and parsed as XML.
    Xml(XmlElement),
    /// Any other non-empty body, undecoded.
    Text(String),
    /// The call succeeded with an empty body.
    Empty,
}

impl Response {
    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlElement> {
        match self {
            Response::Xml(doc) => Some(doc),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Response::Xml(_) => "XML",
            Response::Text(_) => "text",
            Response::Empty => "no content",
        }
    }

    /// JSON-decode a text body. `Empty` yields `None` without decoding.
    pub fn json<T: DeserializeOwned>(&self) -> Result<Option<T>, ApiError> {
        match self {
            Response::Empty => Ok(None),
            Response::Text(text) => serde_json::from_str(text)
                .map(Some)
                .map_err(|e| ApiError::DeserializationError(e.to_string())),
            Response::Xml(_) => Err(ApiError::UnexpectedPayload {
                expected: "JSON",
                found: self.kind(),
            }),
        }
    }

    /// Like `json`, but an empty body is an error.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        self.json()?.ok_or(ApiError::UnexpectedPayload {
            expected: "JSON",
            found: "no content",
        })
    }
}

/// Turn a raw body into a `Response`.
pub fn decode_body(body: String) -> Result<Response, ApiError> {
    if body.is_empty() {
        return Ok(Response::Empty);
    }
    if body.starts_with('<') {
        return XmlElement::parse(&body).map(Response::Xml);
    }
    Ok(Response::Text(body))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Executes requests for a single connection.
pub struct Dispatcher {
    config: ConnectionConfig,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(config: ConnectionConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Describe the request `dispatch` would send, without sending it.
    pub fn build_request(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let target = format!("{}{}", self.config.base_url(), path);
        let port = self
            .config
            .resolve_port(Some(&target))?
            .ok_or_else(|| ApiError::Config(format!("no port resolved for `{target}`")))?;

        let mut url = Url::parse(&target).map_err(|e| ApiError::InvalidUrl {
            url: target.clone(),
            reason: e.to_string(),
        })?;
        url.set_port(Some(port)).map_err(|()| ApiError::InvalidUrl {
            url: target.clone(),
            reason: "URL cannot carry a port".to_string(),
        })?;

        let body = if method.sends_body() {
            body.map(str::to_string)
        } else {
            None
        };

        let mut headers = Vec::new();
        if let Some(auth) = self.config.authorization() {
            headers.push(("Authorization".to_string(), auth));
        }
        let content_type = content_type_for(path).or_else(|| body.as_ref().map(|_| ContentType::Form));
        if let Some(content_type) = content_type {
            headers.push(("Content-Type".to_string(), content_type.as_str().to_string()));
        }

        // Port 80 is always "verified"; every other port follows the flag.
        let verify_tls = port == 80 || self.config.verify_tls();
        if !verify_tls && url.scheme() == "https" {
            tracing::warn!(%url, "TLS peer verification disabled");
        }

        Ok(HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
            verify_tls,
        })
    }

    /// Build, send and log one request. The response is returned whatever
    /// its status.
    pub fn exchange(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&str>,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(path, method, body)?;
        let response = self.transport.execute(&request)?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            bytes = response.body.len(),
            "dispatched request"
        );
        Ok(response)
    }

    /// Perform one call and decode the body. Any received response is
    /// decoded, 4xx/5xx included.
    pub fn dispatch(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&str>,
    ) -> Result<Response, ApiError> {
        decode_body(self.exchange(path, method, body)?.body)
    }

    /// Like `dispatch`, but 404 becomes `NotFound` and any other non-2xx
    /// status becomes `HttpError`. Used by the typed sub-clients.
    pub fn dispatch_checked(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&str>,
    ) -> Result<Response, ApiError> {
        let response = self.exchange(path, method, body)?;
        check_status(&response)?;
        decode_body(response.body)
    }

    /// GET `path` and JSON-decode the body. `None` means no content.
    pub fn get(&self, path: &str) -> Result<Option<serde_json::Value>, ApiError> {
        self.get_json(path)
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        self.dispatch(path, HttpMethod::Get, None)?.json()
    }

    pub fn post(&self, path: &str, body: &str) -> Result<Response, ApiError> {
        self.dispatch(path, HttpMethod::Post, Some(body))
    }

    pub fn put(&self, path: &str, body: &str) -> Result<Response, ApiError> {
        self.dispatch(path, HttpMethod::Put, Some(body))
    }

    pub fn delete(&self, path: &str) -> Result<Response, ApiError> {
        self.dispatch(path, HttpMethod::Delete, None)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::TransportErrorKind;

    /// Records every request and answers with a fixed status and body.
    #[derive(Clone)]
    pub(crate) struct Recorder {
        pub(crate) requests: Arc<Mutex<Vec<HttpRequest>>>,
        status: u16,
        body: String,
    }

    impl Recorder {
        pub(crate) fn new(status: u16, body: &str) -> Self {
            Self {
                requests: Arc::default(),
                status,
                body: body.to_string(),
            }
        }

        pub(crate) fn last(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().expect("no request recorded")
        }
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(HttpResponse {
                status: self.status,
                headers: Vec::new(),
                body: self.body.clone(),
            })
        }
    }

    struct Refused;

    impl Transport for Refused {
        fn execute(&self, _: &HttpRequest) -> Result<HttpResponse, ApiError> {
            Err(ApiError::transport(TransportErrorKind::ConnectionRefused, "connection refused"))
        }
    }

    fn dispatcher(base_url: &str, recorder: &Recorder) -> Dispatcher {
        Dispatcher::new(ConnectionConfig::new(base_url, "key"), recorder.clone())
    }

    #[test]
    fn json_paths_get_application_json() {
        let rec = Recorder::new(200, "{}");
        let d = dispatcher("https://x.test/1", &rec);
        for path in ["/boards/b1.json", "/members/me.json", "/cards.json"] {
            d.dispatch(path, HttpMethod::Get, None).unwrap();
            assert_eq!(rec.last().header("content-type"), Some("application/json"), "{path}");
        }
    }

    #[test]
    fn xml_paths_get_text_xml() {
        let rec = Recorder::new(200, "<ok/>");
        let d = dispatcher("https://x.test/1", &rec);
        d.dispatch("/boards/b1.xml", HttpMethod::Get, None).unwrap();
        assert_eq!(rec.last().header("content-type"), Some("text/xml"));
    }

    #[test]
    fn upload_paths_get_octet_stream() {
        let rec = Recorder::new(201, "");
        let d = dispatcher("https://x.test", &rec);
        for path in ["/uploads.json", "/uploads.xml"] {
            d.dispatch(path, HttpMethod::Post, Some("\u{1}\u{2}")).unwrap();
            assert_eq!(rec.last().header("content-type"), Some("application/octet-stream"), "{path}");
        }
    }

    #[test]
    fn unsuffixed_post_falls_back_to_form_encoding() {
        let rec = Recorder::new(200, "");
        let d = dispatcher("https://x.test", &rec);
        d.dispatch("/boards", HttpMethod::Post, Some("name=x")).unwrap();
        assert_eq!(rec.last().header("content-type"), Some("application/x-www-form-urlencoded"));

        d.dispatch("/boards", HttpMethod::Get, None).unwrap();
        assert_eq!(rec.last().header("content-type"), None);
    }

    #[test]
    fn body_is_attached_only_for_post_and_put() {
        let rec = Recorder::new(200, "");
        let d = dispatcher("https://x.test", &rec);

        d.dispatch("/a.json", HttpMethod::Post, Some("{}")).unwrap();
        assert_eq!(rec.last().body.as_deref(), Some("{}"));
        d.dispatch("/a.json", HttpMethod::Put, Some("{}")).unwrap();
        assert_eq!(rec.last().method, HttpMethod::Put);
        assert_eq!(rec.last().body.as_deref(), Some("{}"));
        d.dispatch("/a.json", HttpMethod::Delete, Some("{}")).unwrap();
        assert_eq!(rec.last().method, HttpMethod::Delete);
        assert!(rec.last().body.is_none());
        d.dispatch("/a.json", HttpMethod::Get, Some("{}")).unwrap();
        assert!(rec.last().body.is_none());
    }

    #[test]
    fn credential_becomes_authorization_header() {
        let rec = Recorder::new(200, "");
        dispatcher("https://x.test", &rec).dispatch("/a.json", HttpMethod::Get, None).unwrap();
        assert_eq!(rec.last().header("authorization"), Some("Basic a2V5Og=="));

        let anonymous = Dispatcher::new(ConnectionConfig::new("https://x.test", ""), rec.clone());
        anonymous.dispatch("/a.json", HttpMethod::Get, None).unwrap();
        assert_eq!(rec.last().header("authorization"), None);
    }

    #[test]
    fn url_is_base_plus_path_on_resolved_port() {
        let rec = Recorder::new(200, "");
        let d = dispatcher("https://x.test/1", &rec);
        d.config().set_port(Some(8443));
        d.dispatch("/boards/b1.json", HttpMethod::Get, None).unwrap();
        assert_eq!(rec.last().url, "https://x.test:8443/1/boards/b1.json");
    }

    #[test]
    fn tls_verification_skipped_off_port_80_unless_enabled() {
        let rec = Recorder::new(200, "");
        let d = dispatcher("https://x.test", &rec);
        d.dispatch("/a.json", HttpMethod::Get, None).unwrap();
        assert!(!rec.last().verify_tls);

        d.config().set_verify_tls(true);
        d.dispatch("/a.json", HttpMethod::Get, None).unwrap();
        assert!(rec.last().verify_tls);
    }

    #[test]
    fn port_80_ignores_verify_flag() {
        let rec = Recorder::new(200, "");
        let d = dispatcher("http://x.test", &rec);
        d.config().set_verify_tls(false);
        d.dispatch("/a.json", HttpMethod::Get, None).unwrap();
        assert!(rec.last().verify_tls);
    }

    #[test]
    fn xml_body_decodes_to_document() {
        let rec = Recorder::new(200, "<board><name>Plan</name></board>");
        let resp = dispatcher("https://x.test", &rec)
            .dispatch("/boards/b1.xml", HttpMethod::Get, None)
            .unwrap();
        let doc = resp.as_xml().unwrap();
        assert_eq!(doc.child("name").unwrap().text(), "Plan");
    }

    #[test]
    fn text_body_is_returned_raw() {
        let rec = Recorder::new(200, r#"{"id":"b1"}"#);
        let resp = dispatcher("https://x.test", &rec)
            .dispatch("/boards/b1.json", HttpMethod::Get, None)
            .unwrap();
        assert_eq!(resp, Response::Text(r#"{"id":"b1"}"#.to_string()));
    }

    #[test]
    fn empty_body_is_empty_marker() {
        let rec = Recorder::new(200, "");
        let resp = dispatcher("https://x.test", &rec)
            .dispatch("/cards/c1.json", HttpMethod::Delete, None)
            .unwrap();
        assert!(resp.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let rec = Recorder::new(200, "<board>");
        let err = dispatcher("https://x.test", &rec)
            .dispatch("/boards/b1.xml", HttpMethod::Get, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::Xml(_)));
    }

    #[test]
    fn get_decodes_json() {
        let rec = Recorder::new(200, r#"[{"id":"b1"},{"id":"b2"}]"#);
        let value = dispatcher("https://x.test", &rec).get("/members/me/boards.json").unwrap().unwrap();
        assert_eq!(value[1]["id"], "b2");
        assert_eq!(rec.last().method, HttpMethod::Get);
    }

    #[test]
    fn get_on_empty_body_skips_decoding() {
        let rec = Recorder::new(200, "");
        assert!(dispatcher("https://x.test", &rec).get("/a.json").unwrap().is_none());
    }

    #[test]
    fn get_surfaces_malformed_json() {
        let rec = Recorder::new(200, "not json");
        let err = dispatcher("https://x.test", &rec).get("/a.json").unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn get_rejects_xml_document() {
        let rec = Recorder::new(200, "<a/>");
        let err = dispatcher("https://x.test", &rec).get("/a.xml").unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedPayload { found: "XML", .. }));
    }

    #[test]
    fn post_put_delete_return_dispatch_result_unchanged() {
        let rec = Recorder::new(200, "ok");
        let d = dispatcher("https://x.test", &rec);
        assert_eq!(d.post("/a.json", "{}").unwrap(), Response::Text("ok".to_string()));
        assert_eq!(d.put("/a.json", "{}").unwrap(), Response::Text("ok".to_string()));
        assert_eq!(d.delete("/a.json").unwrap(), Response::Text("ok".to_string()));
    }

    #[test]
    fn error_status_body_is_still_decoded() {
        let rec = Recorder::new(401, "<error>invalid key</error>");
        let resp = dispatcher("https://x.test", &rec)
            .dispatch("/members/me.xml", HttpMethod::Get, None)
            .unwrap();
        assert_eq!(resp.as_xml().unwrap().text(), "invalid key");

        let rec = Recorder::new(404, "The requested resource was not found.");
        let resp = dispatcher("https://x.test", &rec)
            .dispatch("/boards/nope.json", HttpMethod::Get, None)
            .unwrap();
        assert_eq!(resp.as_text(), Some("The requested resource was not found."));
    }

    #[test]
    fn get_decodes_json_error_bodies() {
        let rec = Recorder::new(400, r#"{"message":"invalid id"}"#);
        let value = dispatcher("https://x.test", &rec).get("/boards/x.json").unwrap().unwrap();
        assert_eq!(value["message"], "invalid id");
    }

    #[test]
    fn error_status_with_empty_body_is_empty_marker() {
        let rec = Recorder::new(500, "");
        let resp = dispatcher("https://x.test", &rec).delete("/cards/c1.json").unwrap();
        assert!(resp.is_empty());
    }

    #[test]
    fn checked_dispatch_maps_not_found() {
        let rec = Recorder::new(404, "The requested resource was not found.");
        let err = dispatcher("https://x.test", &rec)
            .dispatch_checked("/boards/nope.json", HttpMethod::Get, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn checked_dispatch_keeps_error_body() {
        let rec = Recorder::new(401, "invalid key");
        let err = dispatcher("https://x.test", &rec)
            .dispatch_checked("/members/me.json", HttpMethod::Get, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 401, ref body } if body == "invalid key"));
    }

    #[test]
    fn checked_dispatch_passes_success_through() {
        let rec = Recorder::new(201, "created");
        let resp = dispatcher("https://x.test", &rec)
            .dispatch_checked("/boards.json", HttpMethod::Post, Some("{}"))
            .unwrap();
        assert_eq!(resp, Response::Text("created".to_string()));
    }

    #[test]
    fn transport_failure_is_an_error() {
        let d = Dispatcher::new(ConnectionConfig::new("https://x.test", "key"), Refused);
        let err = d.dispatch("/a.json", HttpMethod::Get, None).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport {
                kind: TransportErrorKind::ConnectionRefused,
                ..
            }
        ));
    }

    #[test]
    fn unsupported_scheme_fails_before_sending() {
        let rec = Recorder::new(200, "");
        let err = dispatcher("ftp://x.test", &rec)
            .dispatch("/a.json", HttpMethod::Get, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedScheme(_)));
        assert!(rec.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn into_json_rejects_empty() {
        let err = Response::Empty.into_json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedPayload { found: "no content", .. }));
    }
}
