use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Product,
    Image,
    Search,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Mobile,
    Web,
    Robotoff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    Off,
    Obf,
    Opff,
    Opf,
    OffPro,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Closed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
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

#[derive(Deserialize)]
pub struct CreateFlag {
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
}

#[derive(Clone, Debug, Serialize, Deserialize)]
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

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub hostname: String,
    pub status: String,
    pub timestamp: f64,
    pub results: Vec<HealthCheck>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub checker: String,
    pub output: String,
    pub passed: bool,
    pub timestamp: f64,
    pub expires: f64,
    pub response_time: f64,
}

#[derive(Serialize, Deserialize)]
pub struct FlagsResponse {
    pub flags: Vec<Flag>,
}

#[derive(Serialize, Deserialize)]
pub struct TicketsResponse {
    pub tickets: Vec<Ticket>,
}

#[derive(Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: TicketStatus,
}

#[derive(Default)]
pub struct Store {
    flags: Vec<Flag>,
    tickets: Vec<Ticket>,
}

pub type Db = Arc<RwLock<Store>>;

/// Error response: status plus a FastAPI-style `{"detail": ...}` body.
pub type Rejection = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/flags", get(list_flags).post(create_flag))
        .route("/api/v1/flags/{id}", get(get_flag))
        .route("/api/v1/tickets", get(list_tickets))
        .route("/api/v1/tickets/{id}", get(get_ticket))
        .route("/api/v1/tickets/{id}/status", put(update_ticket_status))
        .route("/api/v1/tickets/{id}/flags", get(get_ticket_flags))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn now_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn now_iso() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn not_found(what: &str) -> Rejection {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": format!("{what} not found") })),
    )
}

/// A 422 body shaped like the one FastAPI produces.
fn unprocessable(entries: Vec<(&str, String, &[&str])>) -> Rejection {
    let detail: Vec<Value> = entries
        .into_iter()
        .map(|(kind, msg, loc)| json!({ "type": kind, "msg": msg, "loc": loc }))
        .collect();
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": detail })),
    )
}

fn validate(input: &CreateFlag) -> Result<(), Rejection> {
    let mut problems = Vec::new();
    if input.url.trim().is_empty() {
        problems.push(("value_error", "url must not be empty".to_string(), &["body", "url"][..]));
    }
    if matches!(input.issue_type, IssueType::Product | IssueType::Image) && input.barcode.is_none() {
        problems.push((
            "value_error",
            "barcode is required for product and image flags".to_string(),
            &["body", "barcode"][..],
        ));
    }
    if input.issue_type == IssueType::Image && input.image_id.is_none() {
        problems.push((
            "value_error",
            "image_id is required for image flags".to_string(),
            &["body", "image_id"][..],
        ));
    }
    if let Some(confidence) = input.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            problems.push((
                "value_error",
                "confidence must be between 0 and 1".to_string(),
                &["body", "confidence"][..],
            ));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(unprocessable(problems))
    }
}

async fn health() -> Json<HealthStatus> {
    let timestamp = now_timestamp();
    Json(HealthStatus {
        hostname: "nutripatrol-mock".to_string(),
        status: "success".to_string(),
        timestamp,
        results: vec![HealthCheck {
            checker: "test_connect_store".to_string(),
            output: "ok".to_string(),
            passed: true,
            timestamp,
            expires: timestamp + 27.0,
            response_time: 0.0,
        }],
    })
}

async fn list_flags(State(db): State<Db>) -> Json<FlagsResponse> {
    let store = db.read().await;
    Json(FlagsResponse {
        flags: store.flags.clone(),
    })
}

async fn create_flag(
    State(db): State<Db>,
    payload: Result<Json<CreateFlag>, JsonRejection>,
) -> Result<Json<Flag>, Rejection> {
    let Json(input) = payload.map_err(|rejection| {
        unprocessable(vec![("json_invalid", rejection.body_text(), &["body"][..])])
    })?;
    validate(&input)?;

    let mut store = db.write().await;
    let existing = store
        .tickets
        .iter()
        .find(|t| {
            t.status == TicketStatus::Open
                && t.issue_type == input.issue_type
                && t.barcode == input.barcode
                && t.url == input.url
                && t.image_id == input.image_id
        })
        .map(|t| t.id);
    let ticket_id = match existing {
        Some(id) => id,
        None => {
            let ticket = Ticket {
                id: store.tickets.len() as i64 + 1,
                barcode: input.barcode.clone(),
                issue_type: input.issue_type,
                url: input.url.clone(),
                status: TicketStatus::Open,
                image_id: input.image_id.clone(),
                flavor: input.flavor,
                created_at: now_iso(),
            };
            let id = ticket.id;
            store.tickets.push(ticket);
            id
        }
    };

    let flag = Flag {
        id: store.flags.len() as i64 + 1,
        ticket_id,
        barcode: input.barcode,
        issue_type: input.issue_type,
        url: input.url,
        user_id: input.user_id,
        device_id: input.device_id,
        source: input.source,
        confidence: input.confidence,
        image_id: input.image_id,
        flavor: input.flavor,
        reason: input.reason,
        comment: input.comment,
        created_at: now_iso(),
    };
    store.flags.push(flag.clone());
    info!(flag_id = flag.id, ticket_id, "flag created");
    Ok(Json(flag))
}

async fn get_flag(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Flag>, Rejection> {
    let store = db.read().await;
    store
        .flags
        .iter()
        .find(|f| f.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("Flag"))
}

async fn list_tickets(
    State(db): State<Db>,
    query: Result<Query<TicketQuery>, QueryRejection>,
) -> Result<Json<TicketsResponse>, Rejection> {
    let Query(filter) = query.map_err(|rejection| {
        unprocessable(vec![("enum", rejection.body_text(), &["query"][..])])
    })?;
    let store = db.read().await;
    let tickets = store
        .tickets
        .iter()
        .filter(|t| filter.status.map_or(true, |s| t.status == s))
        .filter(|t| filter.issue_type.map_or(true, |k| t.issue_type == k))
        .cloned()
        .collect();
    Ok(Json(TicketsResponse { tickets }))
}

async fn get_ticket(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Ticket>, Rejection> {
    let store = db.read().await;
    store
        .tickets
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("Ticket"))
}

async fn update_ticket_status(
    State(db): State<Db>,
    Path(id): Path<i64>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<Ticket>, Rejection> {
    let Query(StatusQuery { status }) = query.map_err(|rejection| {
        unprocessable(vec![("enum", rejection.body_text(), &["query", "status"][..])])
    })?;
    let mut store = db.write().await;
    let ticket = store
        .tickets
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| not_found("Ticket"))?;
    ticket.status = status;
    info!(ticket_id = id, ?status, "ticket status updated");
    Ok(Json(ticket.clone()))
}

async fn get_ticket_flags(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<FlagsResponse>, Rejection> {
    let store = db.read().await;
    if !store.tickets.iter().any(|t| t.id == id) {
        return Err(not_found("Ticket"));
    }
    let flags = store
        .flags
        .iter()
        .filter(|f| f.ticket_id == id)
        .cloned()
        .collect();
    Ok(Json(FlagsResponse { flags }))
}
