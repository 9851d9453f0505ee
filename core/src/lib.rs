//! Async typed client for the Nutripatrol moderation API.
//!
//! # Overview
//! Wraps the flag/ticket routes and the health check of the Nutripatrol
//! service. Every operation returns either its decoded payload or an
//! `ApiError`; status errors, validation errors, undecodable bodies and
//! transport failures are all normalized at one dispatcher boundary.
//!
//! # Design
//! - `NutripatrolClient` is stateless apart from its base URL and the
//!   injected `Transport`, so concurrent calls never interfere.
//! - Requests and responses are plain data (`HttpRequest` /
//!   `HttpResponse`); any async closure can stand in for the network.
//! - `ApiError::to_normalized` renders the `{"error": {...}}` wire shape.

pub mod client;
pub mod error;
pub mod http;
mod routes;
pub mod transport;
pub mod types;

pub use client::{parse_response, ClientConfig, NutripatrolClient, RequestOptions, DEFAULT_BASE_URL};
pub use error::{ApiError, Cause, ErrorBody, NormalizedError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{
    Flag, Flavor, HealthCheck, HealthStatus, IssueType, NewFlag, Source, Ticket, TicketFilter,
    TicketStatus,
};
