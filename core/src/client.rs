//! Request dispatcher for the Nutripatrol API.
//!
//! # Design
//! `NutripatrolClient` holds only its configuration and the injected
//! transport; no state is shared between calls. Every call goes through
//! three steps:
//!
//! 1. `build_request` turns a method, path and `RequestOptions` into a
//!    plain `HttpRequest`.
//! 2. The transport executes it.
//! 3. `parse_response` classifies the `HttpResponse` into the decoded
//!    payload or an `ApiError`.
//!
//! Steps 1 and 3 are pure, so they are tested without any transport.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, Cause};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Public Nutripatrol deployment.
pub const DEFAULT_BASE_URL: &str = "https://nutripatrol.openfoodfacts.org";

/// Connection settings fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Query pairs and JSON body for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Attach a JSON body. Fails only if `body` cannot be represented as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Unexpected(Cause::Encode(e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Typed client for the Nutripatrol moderation service.
#[derive(Debug, Clone)]
pub struct NutripatrolClient<T> {
    base_url: String,
    transport: T,
}

impl<T: Transport> NutripatrolClient<T> {
    /// Client for the public deployment.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_base_url(transport: T, base_url: &str) -> Self {
        Self::with_config(
            transport,
            ClientConfig {
                base_url: base_url.to_string(),
            },
        )
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one call and decode its JSON payload into `R`.
    ///
    /// Never fails outside `ApiError`: transport failures, status errors and
    /// undecodable bodies all come back normalized.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let outcome = self.dispatch(method, path, options).await;
        if let Err(err) = &outcome {
            warn!(
                %method,
                path,
                status_code = err.status_code(),
                error = %err,
                cause = %source_chain(err),
                "request normalized into error"
            );
        }
        outcome
    }

    async fn dispatch<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let request = self.build_request(method, path, options)?;
        debug!(%method, url = %request.url, "dispatching request");

        let response = self.transport.send(request).await?;
        debug!(%method, path, status = response.status, "response received");

        parse_response(&response)
    }

    /// Describe a call as an `HttpRequest` without sending it.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let body = options
            .body
            .map(|value| serde_json::to_string(&value))
            .transpose()
            .map_err(|e| ApiError::Unexpected(Cause::Encode(e)))?;
        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            query: options.query,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        })
    }
}

/// Every source below `err`, outermost first, joined with `: `.
fn source_chain(err: &dyn std::error::Error) -> String {
    let mut chain = Vec::new();
    let mut next = err.source();
    while let Some(source) = next {
        chain.push(source.to_string());
        next = source.source();
    }
    chain.join(": ")
}

/// Classify a response into its decoded payload or an `ApiError`.
pub fn parse_response<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    if !response.is_success() {
        return Err(error_from_status(response));
    }
    if response.body.trim().is_empty() {
        return Err(ApiError::MalformedResponse);
    }
    let value: Value =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Unexpected(Cause::Decode(e)))?;
    if is_falsy(&value) {
        return Err(ApiError::MalformedResponse);
    }
    serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "response does not match the expected schema");
        ApiError::MalformedResponse
    })
}

/// `null`, `false`, `0` and `""` carry no payload.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn error_from_status(response: &HttpResponse) -> ApiError {
    let body: Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(e) => return ApiError::Unexpected(Cause::Decode(e)),
    };
    if response.status == 422 {
        return match validation_messages(&body) {
            Some(details) => ApiError::Validation { details },
            None => ApiError::Unexpected(Cause::ValidationBody),
        };
    }
    ApiError::Upstream {
        status: response.status,
        body,
    }
}

/// The `msg` of every `detail` entry, or `None` if the body is not shaped
/// like a validation error.
fn validation_messages(body: &Value) -> Option<Vec<String>> {
    body.get("detail")?
        .as_array()?
        .iter()
        .map(|entry| entry.get("msg").and_then(Value::as_str).map(str::to_string))
        .collect()
}
