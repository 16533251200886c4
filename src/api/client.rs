//! HTTP client for the backend REST API.
//!
//! The client is built once from the application configuration and an
//! explicit [`RequestContext`]; the context decides which authentication and
//! department headers go out with each request.

use crate::{
    config::{app::AppConfig, session::RequestContext},
    errors::{Error, Result},
};
use reqwest::{
    RequestBuilder, StatusCode, Url,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{net::IpAddr, time::Duration};
use tracing::{debug, trace, warn};

/// Header carrying the department a super admin is working in.
pub const DEPARTMENT_CONTEXT_HEADER: HeaderName = HeaderName::from_static("x-department-context");

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
const GENERIC_FAILURE: &str = "Request failed";

/// Client for the backend API, bound to one [`RequestContext`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    context: RequestContext,
}

impl ApiClient {
    /// Creates a client for `config.backend_url` acting as `context`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an unusable backend URL and
    /// [`Error::Http`] if the HTTP client cannot be initialized.
    pub fn new(config: &AppConfig, context: RequestContext) -> Result<Self> {
        let base_url = parse_base_url(&config.backend_url)?;
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        // A backend on this machine is never reached through a proxy.
        if is_loopback(&base_url) {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;
        debug!(backend = %base_url, role = context.role.as_str(), "API client created");
        Ok(Self {
            http,
            base_url,
            context,
        })
    }

    /// Context this client sends with its requests.
    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        &self.context
    }

    /// A client sharing this one's connection pool but acting as `context`.
    #[must_use]
    pub fn with_context(&self, context: RequestContext) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            context,
        }
    }

    /// Absolute URL for the given path segments. Segments are
    /// percent-encoded, so ids and account codes can be passed verbatim.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the base URL cannot take path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config {
                message: format!("Backend URL cannot take a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Headers derived from the request context.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the token or department id contain
    /// characters that are not valid in a header.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        if let Some(token) = self.context.bearer_token() {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }
        if let Some(department) = self.context.department_header() {
            headers.insert(DEPARTMENT_CONTEXT_HEADER, header_value(department)?);
        }
        Ok(headers)
    }

    /// Fails with [`Error::MissingToken`] when no token is configured.
    pub(crate) fn require_token(&self) -> Result<()> {
        self.context
            .bearer_token()
            .map(|_| ())
            .ok_or(Error::MissingToken)
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T> {
        let request = self.http.get(self.endpoint(segments)?).query(query);
        self.execute(request, resource).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        body: &B,
        resource: &str,
    ) -> Result<Value> {
        let request = self.http.post(self.endpoint(segments)?).query(query).json(body);
        self.execute(request, resource).await
    }

    pub(crate) async fn put<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        body: &B,
        resource: &str,
    ) -> Result<Value> {
        let request = self.http.put(self.endpoint(segments)?).query(query).json(body);
        self.execute(request, resource).await
    }

    pub(crate) async fn delete(&self, segments: &[&str], resource: &str) -> Result<Value> {
        let request = self.http.delete(self.endpoint(segments)?);
        self.execute(request, resource).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T> {
        // Context headers go last so they override the JSON body's content type.
        let request = request.headers(self.headers()?).build()?;
        debug!(method = %request.method(), url = %request.url(), "Sending backend request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = error_for_status(status, &body, resource);
            warn!(status = status.as_u16(), %resource, "Backend rejected request: {error}");
            return Err(error);
        }

        trace!(%resource, bytes = body.len(), "Decoding backend response");
        decode_body(&body)
    }
}

/// Maps a non-success response to an [`Error`].
///
/// 401, 403 and 404 get dedicated variants; anything else becomes
/// [`Error::Api`] carrying the body's `message` (or `error`) field.
#[must_use]
pub fn error_for_status(status: StatusCode, body: &str, resource: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized,
        StatusCode::FORBIDDEN => Error::Forbidden {
            resource: resource.to_string(),
        },
        StatusCode::NOT_FOUND => Error::NotFound {
            resource: resource.to_string(),
        },
        _ => Error::Api {
            status: status.as_u16(),
            message: extract_message(body).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        },
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .into_iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

// Empty bodies (e.g. from DELETE) decode as JSON null.
fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(Into::into)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Config {
        message: format!("Invalid header value: {e}"),
    })
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    Url::parse(trimmed).map_err(|e| Error::Config {
        message: format!("Invalid backend URL {trimmed:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::session::Role;
    use crate::test_utils::{client_for, spawn_json_server};

    fn client(backend_url: &str, context: RequestContext) -> ApiClient {
        let config = AppConfig {
            backend_url: backend_url.to_string(),
            ..AppConfig::default()
        };
        ApiClient::new(&config, context).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = client("http://localhost:5000/", RequestContext::default());
        assert_eq!(
            api.endpoint(&["api", "admin", "accounts"]).unwrap().as_str(),
            "http://localhost:5000/api/admin/accounts"
        );

        let api = client("http://localhost:5000/backend", RequestContext::default());
        assert_eq!(
            api.endpoint(&["accounts", "1"]).unwrap().as_str(),
            "http://localhost:5000/backend/accounts/1"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = client("http://localhost:5000/", RequestContext::default());
        assert_eq!(
            api.endpoint(&["accounts", "code", "4.1/02 a"]).unwrap().as_str(),
            "http://localhost:5000/accounts/code/4.1%2F02%20a"
        );
    }

    #[test]
    fn test_invalid_backend_url() {
        let config = AppConfig {
            backend_url: "not a url".to_string(),
            ..AppConfig::default()
        };
        let result = ApiClient::new(&config, RequestContext::default());
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_headers_for_super_admin_in_department() {
        let context = RequestContext::new("tok", Role::SuperAdmin).with_department_context("d1");
        let headers = client("http://localhost/", context).headers().unwrap();

        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(headers[DEPARTMENT_CONTEXT_HEADER], "d1");
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_headers_skip_department_for_other_roles() {
        let context = RequestContext::new("tok", Role::User).with_department_context("d1");
        let headers = client("http://localhost/", context).headers().unwrap();
        assert!(headers.get(DEPARTMENT_CONTEXT_HEADER).is_none());
        assert!(headers.get(AUTHORIZATION).is_some());
    }

    #[test]
    fn test_headers_without_token() {
        let headers = client("http://localhost/", RequestContext::default())
            .headers()
            .unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_error_for_status_mapping() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, "", "accounts"),
            Error::Unauthorized
        ));
        assert!(matches!(
            error_for_status(StatusCode::FORBIDDEN, "", "accounts"),
            Error::Forbidden { resource } if resource == "accounts"
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, "", "account 7"),
            Error::NotFound { resource } if resource == "account 7"
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_REQUEST, r#"{"message": "Código duplicado"}"#, "accounts"),
            Error::Api { status: 400, message } if message == "Código duplicado"
        ));
        assert!(matches!(
            error_for_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": "boom"}"#, "accounts"),
            Error::Api { status: 500, message } if message == "boom"
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, "<html>", "accounts"),
            Error::Api { status: 502, message } if message == GENERIC_FAILURE
        ));
    }

    #[test]
    fn test_loopback_detection() {
        assert!(is_loopback(&Url::parse("http://localhost:5000/").unwrap()));
        assert!(is_loopback(&Url::parse("http://127.0.0.1:8080/").unwrap()));
        assert!(is_loopback(&Url::parse("http://[::1]:8080/").unwrap()));
        assert!(!is_loopback(&Url::parse("https://api.example.org/").unwrap()));
    }

    #[test]
    fn test_decode_empty_body() {
        let value: Value = decode_body("  ").unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_get_sends_context_headers() -> Result<()> {
        let (base_url, server) = spawn_json_server(200, r#"{"ok": true}"#).await;
        let context = RequestContext::new("tok", Role::SuperAdmin).with_department_context("d9");
        let api = client_for(&base_url, context);

        let value: Value = api
            .get(&["ping"], &[("year", "2025".to_string())], "ping")
            .await?;
        assert_eq!(value["ok"], true);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /ping?year=2025 http/1.1"));
        assert!(request.contains("authorization: bearer tok"));
        assert!(request.contains("x-department-context: d9"));
        Ok(())
    }

    #[tokio::test]
    async fn test_forbidden_response_requires_sign_in() {
        let (base_url, server) = spawn_json_server(403, r#"{"message": "no"}"#).await;
        let api = client_for(&base_url, RequestContext::new("tok", Role::User));

        let result: Result<Value> = api.get(&["accounts"], &[], "accounts").await;
        let error = result.unwrap_err();
        assert!(error.requires_sign_in());
        server.await.unwrap();
    }
}
