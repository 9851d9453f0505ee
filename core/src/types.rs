//! Schema types for the Nutripatrol API.
//!
//! # Design
//! These mirror the service's JSON schema but are defined independently of
//! the mock-server crate; the end-to-end tests catch schema drift. Enum
//! values travel as snake_case strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a flag or ticket is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Product,
    Image,
    Search,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Product => "product",
            IssueType::Image => "image",
            IssueType::Search => "search",
        }
    }
}

/// Where a flag was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Mobile,
    Web,
    Robotoff,
}

/// The Open*Facts project a product belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    Off,
    Obf,
    Opff,
    Opf,
    OffPro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
        }
    }
}

/// A moderation report as stored by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub id: i64,
    pub ticket_id: i64,
    pub barcode: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub url: String,
    pub user_id: String,
    pub device_id: String,
    pub source: Source,
    pub confidence: Option<f64>,
    pub image_id: Option<String>,
    pub flavor: Flavor,
    pub reason: Option<String>,
    pub comment: Option<String>,
    pub created_at: String,
}

/// Payload for `POST /api/v1/flags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFlag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub url: String,
    pub user_id: String,
    pub device_id: String,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    pub flavor: Flavor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A group of flags under moderation review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub barcode: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub url: String,
    pub status: TicketStatus,
    pub image_id: Option<String>,
    pub flavor: Flavor,
    pub created_at: String,
}

/// Response of `GET /health`. Fields beyond the known ones are kept in
/// `extra` so the payload serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub hostname: String,
    pub status: String,
    pub timestamp: f64,
    pub results: Vec<HealthCheck>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One checker's outcome inside a `HealthStatus`. `output` is whatever the
/// checker returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub checker: String,
    pub output: Value,
    pub passed: bool,
    pub timestamp: f64,
    pub expires: f64,
    pub response_time: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FlagsEnvelope {
    pub flags: Vec<Flag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketsEnvelope {
    pub tickets: Vec<Ticket>,
}

/// Query filters for `GET /api/v1/tickets`. Unset fields are not sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub issue_type: Option<IssueType>,
}

impl TicketFilter {
    pub fn status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn issue_type(mut self, issue_type: IssueType) -> Self {
        self.issue_type = Some(issue_type);
        self
    }

    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status".to_string(), status.as_str().to_string()));
        }
        if let Some(issue_type) = self.issue_type {
            pairs.push(("type".to_string(), issue_type.as_str().to_string()));
        }
        pairs
    }
}
