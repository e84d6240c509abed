//! Authenticated request layer for the mind-map API.
//!
//! # Design
//! `Api` holds the service root, the user's token and a `Transport`, all
//! immutable and shared behind an `Arc`, so cloning an `Api` (as every
//! `Diagram` does) is cheap. Each call is split the same way:
//! `build_request` produces an `HttpRequest` without touching the network,
//! the transport executes it, and `parse_response` maps the status and body
//! back into a typed value or an `ApiError`.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiOptions;
use crate::diagram::Diagram;
use crate::error::{ApiError, ApiResult};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::types::{CreateDiagram, DiagramResource, ErrorBody};
use crate::validate;

pub const DIAGRAMS_ENDPOINT: &str = "/api/1/diagrams";

/// Handle to the mind-map service for one user.
#[derive(Clone)]
pub struct Api {
    inner: Arc<ApiInner>,
}

struct ApiInner {
    base_url: String,
    token: String,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl Api {
    /// Build a client that talks HTTP through `ureq`.
    #[cfg(feature = "ureq")]
    pub fn new(options: ApiOptions) -> ApiResult<Self> {
        Self::with_transport(options, crate::http::UreqTransport::new())
    }

    /// Build a client on top of a caller-supplied transport.
    ///
    /// Fails with `ApiError::Configuration` when the token is missing or
    /// blank, or the base URL does not parse. No request is made either way.
    pub fn with_transport(
        options: ApiOptions,
        transport: impl Transport + 'static,
    ) -> ApiResult<Self> {
        let token = options
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ApiError::Configuration("you must provide a user's authentication token".to_string())
            })?;

        let base_url = options.resolved_base_url();
        Url::parse(&base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid base url {base_url:?}: {e}")))?;

        Ok(Self {
            inner: Arc::new(ApiInner {
                base_url,
                token,
                transport: Box::new(transport),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Describe a request to `endpoint` (relative to the base URL) without
    /// sending it. Any query already on `endpoint` is kept, then
    /// `access_token` is appended, then `query` (an already-formed
    /// `k=v&k2=v2` string) if given.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        query: Option<&str>,
        body: Option<&B>,
    ) -> ApiResult<HttpRequest> {
        let mut url = Url::parse(&format!("{}{endpoint}", self.inner.base_url))
            .map_err(|e| ApiError::Configuration(format!("invalid endpoint {endpoint:?}: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("access_token", &self.inner.token);
            if let Some(query) = query.filter(|q| !q.is_empty()) {
                pairs.extend_pairs(url::form_urlencoded::parse(query.as_bytes()));
            }
        }

        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        let body = match body {
            Some(body) => {
                let json = serde_json::to_string(body)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?;
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(json)
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Interpret a response to a request against `endpoint`. Any 2xx is a
    /// success; the body is then parsed as `T`.
    pub fn parse_response<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        response: HttpResponse,
    ) -> ApiResult<T> {
        check_status(method, endpoint, &response)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    fn execute(&self, request: HttpRequest, endpoint: &str) -> ApiResult<HttpResponse> {
        let method = request.method;
        debug!(%method, endpoint, "sending request");
        let response = self.inner.transport.execute(&request).map_err(|e| {
            warn!(%method, endpoint, error = %e, "transport failure");
            ApiError::Transport {
                method,
                endpoint: endpoint.to_string(),
                message: e.message,
            }
        })?;
        debug!(%method, endpoint, status = response.status, "received response");
        Ok(response)
    }

    fn call<B, T>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        query: Option<&str>,
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build_request(method, endpoint, query, body)?;
        let response = self.execute(request, endpoint)?;
        self.parse_response(method, endpoint, response)
    }

    /// Authenticated GET; the response body is parsed as `T`.
    pub fn get<T: DeserializeOwned>(&self, endpoint: &str, query: Option<&str>) -> ApiResult<T> {
        self.call::<(), T>(HttpMethod::Get, endpoint, query, None)
    }

    /// Authenticated POST of `body` as JSON.
    pub fn post<B, T>(&self, endpoint: &str, query: Option<&str>, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(HttpMethod::Post, endpoint, query, Some(body))
    }

    /// Authenticated PUT of `body` as JSON.
    pub fn put<B, T>(&self, endpoint: &str, query: Option<&str>, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(HttpMethod::Put, endpoint, query, Some(body))
    }

    /// Authenticated DELETE. Any response body is ignored.
    pub fn delete(&self, endpoint: &str, query: Option<&str>) -> ApiResult<()> {
        let request = self.build_request::<()>(HttpMethod::Delete, endpoint, query, None)?;
        let response = self.execute(request, endpoint)?;
        check_status(HttpMethod::Delete, endpoint, &response)
    }

    /// Create a new diagram titled `title`. The service seeds it with a
    /// single root node carrying the title as its text.
    pub fn create_diagram(&self, title: &str) -> ApiResult<Diagram> {
        validate::check_title(title)?;
        let body = CreateDiagram {
            title: title.to_string(),
        };
        let resource: DiagramResource = self
            .post(DIAGRAMS_ENDPOINT, None, &body)
            .map_err(|e| e.context("failed to create diagram"))?;
        debug!(diagram = %resource.id, "created diagram");
        Ok(Diagram::from_resource(self.clone(), resource))
    }

    /// Address an existing diagram by id without contacting the service.
    pub fn diagram(&self, id: impl Into<String>, title: impl Into<String>) -> Diagram {
        Diagram::from_resource(
            self.clone(),
            DiagramResource {
                id: id.into(),
                title: title.into(),
            },
        )
    }
}

/// Map a non-2xx response to `ApiError::Http`, preferring the server's
/// `description`, then legacy `details`, then the raw body.
fn check_status(method: HttpMethod, endpoint: &str, response: &HttpResponse) -> ApiResult<()> {
    if response.is_success() {
        return Ok(());
    }
    let parsed: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
    let description = parsed
        .description
        .or(parsed.details)
        .unwrap_or_else(|| response.body.trim().to_string());
    warn!(%method, endpoint, status = response.status, %description, "request rejected");
    Err(ApiError::Http {
        method,
        endpoint: endpoint.to_string(),
        status: response.status,
        description,
    })
}
