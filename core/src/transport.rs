//! The seam between the client and the network.
//!
//! # Design
//! A `Transport` executes exactly one `HttpRequest` and reports either the
//! response (whatever its status) or a failure to get one. Status codes are
//! never treated as transport errors; the dispatcher classifies them.
//!
//! Any async closure `Fn(HttpRequest) -> impl Future<Output = Result<..>>`
//! is a transport, so tests inject a closure instead of a server.
//! `UreqTransport` is the ready-made network implementation.

use std::future::Future;

use thiserror::Error;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Failure to obtain any response at all.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        TransportError::with_source("HTTP request failed", err)
    }
}

/// Executes HTTP requests on behalf of `NutripatrolClient`.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<F, Fut> Transport for F
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse, TransportError>> + Send,
{
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        self(request)
    }
}

/// Transport backed by a blocking `ureq` agent.
///
/// Each request runs on tokio's blocking pool, so this must be used from
/// within a tokio runtime. 4xx/5xx responses come back as data.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let agent = self.agent.clone();
        async move {
            tokio::task::spawn_blocking(move || execute(&agent, request))
                .await
                .map_err(|e| TransportError::with_source("blocking request task failed", e))?
        }
    }
}

fn execute(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, TransportError> {
    let body = req.body.unwrap_or_default();

    let mut response = match req.method {
        HttpMethod::Get => decorate(agent.get(&req.url), &req.query, &req.headers).call(),
        HttpMethod::Delete => decorate(agent.delete(&req.url), &req.query, &req.headers).call(),
        HttpMethod::Post => {
            decorate(agent.post(&req.url), &req.query, &req.headers).send(body.as_bytes())
        }
        HttpMethod::Put => {
            decorate(agent.put(&req.url), &req.query, &req.headers).send(body.as_bytes())
        }
    }?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string()?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn decorate<B>(
    mut builder: ureq::RequestBuilder<B>,
    query: &[(String, String)],
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (key, value) in query {
        builder = builder.query(key, value);
    }
    for (key, value) in headers {
        builder = builder.header(key, value);
    }
    builder
}
