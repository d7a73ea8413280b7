// REST client for the reelhouse backend.
//
// Every request resolves against `{website_url}/api/`, carries the session's
// bearer token when one exists, and has its response funnelled through one
// place that decides between "payload", "session expired" and "error".

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::session::Session;
use crate::transport::TransportConfig;

// ── Error body shape ─────────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ── SessionExpiryPolicy ──────────────────────────────────────────────

/// Which response statuses mean "the credential is no longer good".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionExpiryPolicy {
    /// Only `401 Unauthorized`.
    Unauthorized,
    /// `401 Unauthorized` or `500 Internal Server Error`. The backend
    /// answers some expired-token requests with a 500.
    #[default]
    UnauthorizedOrServerFault,
}

impl SessionExpiryPolicy {
    pub fn matches(self, status: StatusCode) -> bool {
        match self {
            Self::Unauthorized => status == StatusCode::UNAUTHORIZED,
            Self::UnauthorizedOrServerFault => {
                status == StatusCode::UNAUTHORIZED || status == StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// ── ApiRequest ───────────────────────────────────────────────────────

/// A single outbound call: method, path relative to `/api/`, optional JSON
/// body and query parameters. Built per call and thrown away.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` and attach it.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| Error::Deserialization {
            message: format!("failed to encode request body: {e}"),
            body: String::new(),
        })?;
        Ok(self.body(value))
    }
}

// ── ApiClient ────────────────────────────────────────────────────────

/// Async client for the backend REST API.
///
/// Cheap to share behind an `Arc`. The token is read from the [`Session`]
/// on every request, so signing in or out takes effect immediately.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<Session>,
    expiry: SessionExpiryPolicy,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from the website URL and a transport config.
    pub fn new(
        website_url: &Url,
        transport: &TransportConfig,
        session: Arc<Session>,
        expiry: SessionExpiryPolicy,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(website_url, http, session, expiry)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        website_url: &Url,
        http: reqwest::Client,
        session: Arc<Session>,
        expiry: SessionExpiryPolicy,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(website_url)?;
        Ok(Self {
            http,
            base_url,
            session,
            expiry,
        })
    }

    /// `https://host/prefix` -> `https://host/prefix/api/`
    fn normalize_base_url(raw: &Url) -> Result<Url, Error> {
        let mut url = raw.clone();
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }
        url.set_query(None);
        url.set_fragment(None);

        // Reject cannot-be-a-base URLs (e.g. `mailto:`) up front.
        url.join("probe")?;
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn expiry_policy(&self) -> SessionExpiryPolicy {
        self.expiry
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.execute(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.execute(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.execute(ApiRequest::delete(path)).await
    }

    /// Send a request and unwrap the response payload.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let url = self.url(&request.path)?;
        debug!(method = %request.method, %url, query = ?request.query, "sending request");

        let mut builder = self.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(bearer) = self.session.bearer() {
            let mut value = HeaderValue::from_str(bearer.expose_secret())
                .map_err(|e| Error::InvalidToken(e.to_string()))?;
            value.set_sensitive(true);
            builder = builder.header(AUTHORIZATION, value);
        }

        let resp = builder.send().await?;
        self.handle_response(&request, resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            let body_ref = if body.trim().is_empty() { "null" } else { body.as_str() };
            return serde_json::from_str(body_ref).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            });
        }

        if self.expiry.matches(status) {
            warn!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                "credential rejected"
            );
            self.session.expire();
            return Err(Error::SessionExpired {
                status: status.as_u16(),
            });
        }

        Err(Self::parse_error(status, resp).await)
    }

    async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
        let body = resp.text().await.unwrap_or_default();

        let server_message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .filter(|m| !m.trim().is_empty());

        debug!(status = status.as_u16(), ?server_message, "request failed");

        Error::Http {
            status: status.as_u16(),
            server_message,
            body,
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("session", &self.session)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}
