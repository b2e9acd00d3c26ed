//! Blocking HTTP backend.
//!
//! Talks to a real management service with [`ureq`]. Non-2xx statuses are
//! returned as responses rather than errors so the client can classify them.

use crate::backend::{Backend, Method, Request, Response};
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::time::Duration;

/// Default timeout for a single exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic authentication.
    Basic { username: String, password: String },
    /// Personal access token.
    Bearer(String),
    /// No `Authorization` header.
    Anonymous,
}

impl Credentials {
    /// Value of the `Authorization` header, if any.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::Basic { username, password } => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", username, password))
            )),
            Self::Bearer(token) => Some(format!("Bearer {}", token)),
            Self::Anonymous => None,
        }
    }
}

// Never print secrets.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => write!(f, "Basic({}, ***)", username),
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Backend performing real HTTP calls against a management URL.
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
    authorization: Option<String>,
}

impl HttpBackend {
    /// Create a backend for `base_url` (e.g. `https://apim.example.com`).
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: &Credentials) -> Self {
        Self::with_timeout(base_url, credentials, DEFAULT_TIMEOUT)
    }

    /// Create a backend with a custom per-request timeout.
    #[must_use]
    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        let base_url: String = base_url.into();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: credentials.header_value(),
        }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize<B>(&self, builder: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let builder = builder.header("Accept", "application/json");
        match &self.authorization {
            Some(value) => builder.header("Authorization", value.as_str()),
            None => builder,
        }
    }
}

impl Backend for HttpBackend {
    fn send(&self, request: &Request) -> Result<Response> {
        let url = self.url(&request.path);
        log::debug!("{} {}", request.method, url);

        let body = request.body.as_deref();
        let mut response = match request.method {
            Method::Get => self.authorize(self.agent.get(&url)).call()?,
            Method::Delete => self.authorize(self.agent.delete(&url)).call()?,
            Method::Post => send_body(self.authorize(self.agent.post(&url)), body)?,
            Method::Put => send_body(self.authorize(self.agent.put(&url)), body)?,
        };

        let status = response.status().as_u16();
        let success = (200..300).contains(&status);
        let bytes = match response.body_mut().read_to_vec() {
            Ok(bytes) => bytes,
            Err(e) if success => {
                return Err(Error::Decode(format!("could not read response body: {}", e)));
            }
            Err(e) => return Err(e.into()),
        };
        log::debug!("{} {} -> {}", request.method, url, status);

        // Error bodies are only shown to the user.
        let text = if success {
            String::from_utf8(bytes)
                .map_err(|e| Error::Decode(format!("response body is not UTF-8: {}", e)))?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };
        Ok(Response::new(status, text))
    }
}

fn send_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .send(json.as_bytes()),
        None => builder.send_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Client;
    use crate::error::ErrorCategory;
    use httpmock::Method::{DELETE, GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    #[test]
    fn test_basic_credentials_header() {
        let credentials = Credentials::Basic {
            username: "admin".to_string(),
            password: "admin".to_string(),
        };
        assert_eq!(
            credentials.header_value().as_deref(),
            Some("Basic YWRtaW46YWRtaW4=")
        );
    }

    #[test]
    fn test_bearer_and_anonymous_headers() {
        assert_eq!(
            Credentials::Bearer("tok".to_string()).header_value().as_deref(),
            Some("Bearer tok")
        );
        assert_eq!(Credentials::Anonymous.header_value(), None);
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let credentials = Credentials::Basic {
            username: "admin".to_string(),
            password: "s3cret".to_string(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("https://apim.example.com/", &Credentials::Anonymous);
        assert_eq!(backend.base_url(), "https://apim.example.com");
        assert_eq!(
            backend.url("/management/v2"),
            "https://apim.example.com/management/v2"
        );
    }

    #[test]
    fn test_get_sends_authorization() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/management/v2/environments/DEFAULT")
                .header("authorization", "Bearer tok");
            then.status(200).json_body(json!({ "id": "DEFAULT" }));
        });

        let backend = HttpBackend::new(server.base_url(), &Credentials::Bearer("tok".to_string()));
        let response = backend
            .send(&Request::new(Method::Get, "/management/v2/environments/DEFAULT"))
            .unwrap();

        mock.assert();
        assert_eq!(response.status, 200);
        assert!(response.body.contains("DEFAULT"));
    }

    #[test]
    fn test_post_sends_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/management/v2/environments/DEFAULT/apis/api-1/plans")
                .header("content-type", "application/json")
                .json_body(json!({ "name": "Gold" }));
            then.status(201).json_body(json!({ "id": "plan-1", "name": "Gold" }));
        });

        let backend = HttpBackend::new(server.base_url(), &Credentials::Anonymous);
        let request = Request::json(
            Method::Post,
            "/management/v2/environments/DEFAULT/apis/api-1/plans",
            &json!({ "name": "Gold" }),
        )
        .unwrap();
        let response = backend.send(&request).unwrap();

        mock.assert();
        assert_eq!(response.status, 201);
    }

    #[test]
    fn test_error_status_is_a_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/gone");
            then.status(404).body("missing");
        });

        let backend = HttpBackend::new(server.base_url(), &Credentials::Anonymous);
        let response = backend.send(&Request::new(Method::Delete, "/gone")).unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body, "missing");
    }

    #[test]
    fn test_undecodable_success_body_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bytes");
            then.status(200).body([0xff_u8, 0xfe, 0x00]);
        });

        let backend = HttpBackend::new(server.base_url(), &Credentials::Anonymous);
        let result = backend.send(&Request::new(Method::Get, "/bytes"));

        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_undecodable_error_body_is_kept_lossy() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bytes");
            then.status(500).body([b'b', b'a', b'd', 0xff]);
        });

        let backend = HttpBackend::new(server.base_url(), &Credentials::Anonymous);
        let response = backend.send(&Request::new(Method::Get, "/bytes")).unwrap();

        assert_eq!(response.status, 500);
        assert!(response.body.starts_with("bad"));
    }

    #[test]
    fn test_client_reports_undecodable_plan_as_format() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/management/v2/environments/DEFAULT/apis/a/plans/p");
            then.status(200).body([0xff_u8, 0xfe, 0x00]);
        });

        let client = Client::with_backend(Box::new(HttpBackend::new(
            server.base_url(),
            &Credentials::Anonymous,
        )));
        let err = client.get_plan("a", "p").unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Format);
    }

    #[test]
    fn test_default_timeout_is_five_minutes() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(300));
    }

    #[test]
    fn test_connection_failure_is_transport_error() {
        // Port 9 (discard) is closed on test machines.
        let backend = HttpBackend::with_timeout(
            "http://127.0.0.1:9",
            &Credentials::Anonymous,
            Duration::from_secs(2),
        );
        let result = backend.send(&Request::new(Method::Get, "/"));
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
