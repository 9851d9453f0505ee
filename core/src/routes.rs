//! Typed accessors for the Nutripatrol routes.
//!
//! Each accessor is a fixed method and path over `NutripatrolClient::request`.
//! Errors pass through untouched; list routes unwrap their envelope.

use crate::client::{NutripatrolClient, RequestOptions};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::transport::Transport;
use crate::types::{
    Flag, FlagsEnvelope, HealthStatus, NewFlag, Ticket, TicketFilter, TicketStatus, TicketsEnvelope,
};

impl<T: Transport> NutripatrolClient<T> {
    /// `GET /api/v1/flags`
    pub async fn list_flags(&self) -> Result<Vec<Flag>, ApiError> {
        let envelope: FlagsEnvelope = self
            .request(HttpMethod::Get, "/api/v1/flags", RequestOptions::new())
            .await?;
        Ok(envelope.flags)
    }

    /// `POST /api/v1/flags`. The service attaches the flag to an open ticket
    /// for the same product, or opens a new one.
    pub async fn create_flag(&self, flag: &NewFlag) -> Result<Flag, ApiError> {
        let options = RequestOptions::new().json(flag)?;
        self.request(HttpMethod::Post, "/api/v1/flags", options)
            .await
    }

    /// `GET /api/v1/flags/{id}`
    pub async fn get_flag(&self, id: i64) -> Result<Flag, ApiError> {
        self.request(
            HttpMethod::Get,
            &format!("/api/v1/flags/{id}"),
            RequestOptions::new(),
        )
        .await
    }

    /// `GET /api/v1/tickets`
    pub async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, ApiError> {
        let options = RequestOptions::new().query_pairs(filter.query_pairs());
        let envelope: TicketsEnvelope = self
            .request(HttpMethod::Get, "/api/v1/tickets", options)
            .await?;
        Ok(envelope.tickets)
    }

    /// `GET /api/v1/tickets/{id}`
    pub async fn get_ticket(&self, id: i64) -> Result<Ticket, ApiError> {
        self.request(
            HttpMethod::Get,
            &format!("/api/v1/tickets/{id}"),
            RequestOptions::new(),
        )
        .await
    }

    /// `PUT /api/v1/tickets/{id}/status`
    pub async fn update_ticket_status(
        &self,
        id: i64,
        status: TicketStatus,
    ) -> Result<Ticket, ApiError> {
        let options = RequestOptions::new().query("status", status.as_str());
        self.request(
            HttpMethod::Put,
            &format!("/api/v1/tickets/{id}/status"),
            options,
        )
        .await
    }

    /// `GET /api/v1/tickets/{id}/flags`
    pub async fn get_ticket_flags(&self, id: i64) -> Result<Vec<Flag>, ApiError> {
        let envelope: FlagsEnvelope = self
            .request(
                HttpMethod::Get,
                &format!("/api/v1/tickets/{id}/flags"),
                RequestOptions::new(),
            )
            .await?;
        Ok(envelope.flags)
    }

    /// `GET /health`, returned as-is.
    pub async fn get_health(&self) -> Result<HealthStatus, ApiError> {
        self.request(HttpMethod::Get, "/health", RequestOptions::new())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::transport::TransportError;
    use crate::types::{Flavor, IssueType, Source};

    const FLAG: &str = r#"{"id":1,"ticket_id":9,"barcode":"3017620422003","type":"product","url":"https://world.openfoodfacts.org/product/3017620422003","user_id":"alice","device_id":"web-1","source":"web","confidence":null,"image_id":null,"flavor":"off","reason":"inappropriate","comment":"rude name","created_at":"2024-05-01T10:00:00"}"#;

    const TICKET: &str = r#"{"id":9,"barcode":"3017620422003","type":"product","url":"https://world.openfoodfacts.org/product/3017620422003","status":"closed","image_id":null,"flavor":"off","created_at":"2024-05-01T10:00:00"}"#;

    /// Transport that records the request and answers with a fixed response.
    fn recording(
        status: u16,
        body: String,
    ) -> (
        Arc<Mutex<Option<HttpRequest>>>,
        impl Transport,
    ) {
        let seen: Arc<Mutex<Option<HttpRequest>>> = Arc::default();
        let transport = {
            let seen = Arc::clone(&seen);
            move |req: HttpRequest| {
                *seen.lock().unwrap() = Some(req);
                ready(Ok::<_, TransportError>(HttpResponse::new(status, body.clone())))
            }
        };
        (seen, transport)
    }

    fn client<T: Transport>(transport: T) -> NutripatrolClient<T> {
        NutripatrolClient::with_base_url(transport, "http://localhost:8000")
    }

    #[tokio::test]
    async fn list_flags_unwraps_envelope() {
        let (seen, transport) = recording(200, format!(r#"{{"flags":[{FLAG}]}}"#));
        let flags = client(transport).list_flags().await.unwrap();

        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].id, 1);
        assert_eq!(flags[0].ticket_id, 9);
        assert_eq!(flags[0].issue_type, IssueType::Product);

        let req = seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/api/v1/flags");
    }

    #[tokio::test]
    async fn list_flags_passes_validation_error_through() {
        let (_, transport) = recording(
            422,
            r#"{"detail":[{"msg":"bad id","type":"value_error","loc":["query","id"]}]}"#
                .to_string(),
        );
        let err = client(transport).list_flags().await.unwrap_err();
        assert_eq!(
            serde_json::to_value(err.to_normalized()).unwrap(),
            json!({"error": {"statusCode": 422, "message": "Validation error", "details": ["bad id"]}})
        );
    }

    #[tokio::test]
    async fn list_flags_with_empty_body_is_malformed() {
        let (_, transport) = recording(200, String::new());
        let err = client(transport).list_flags().await.unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse));
    }

    #[tokio::test]
    async fn create_flag_posts_json_body() {
        let (seen, transport) = recording(200, FLAG.to_string());
        let input = NewFlag {
            barcode: Some("3017620422003".to_string()),
            issue_type: IssueType::Product,
            url: "https://world.openfoodfacts.org/product/3017620422003".to_string(),
            user_id: "alice".to_string(),
            device_id: "web-1".to_string(),
            source: Source::Web,
            confidence: None,
            image_id: None,
            flavor: Flavor::Off,
            reason: Some("inappropriate".to_string()),
            comment: Some("rude name".to_string()),
        };
        let flag = client(transport).create_flag(&input).await.unwrap();
        assert_eq!(flag.comment.as_deref(), Some("rude name"));

        let req = seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/api/v1/flags");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["type"], "product");
        assert_eq!(body["flavor"], "off");
        assert_eq!(body["reason"], "inappropriate");
    }

    #[tokio::test]
    async fn get_flag_not_found_is_upstream_error() {
        let (seen, transport) = recording(404, r#"{"detail":"Flag not found"}"#.to_string());
        let err = client(transport).get_flag(42).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.details(), Some(json!({"detail": "Flag not found"})));

        let req = seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/v1/flags/42");
    }

    #[tokio::test]
    async fn list_tickets_sends_filter_as_query() {
        let (seen, transport) = recording(200, format!(r#"{{"tickets":[{TICKET}]}}"#));
        let filter = TicketFilter::default().status(TicketStatus::Closed);
        let tickets = client(transport).list_tickets(filter).await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].status, TicketStatus::Closed);

        let req = seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/v1/tickets");
        assert_eq!(req.query, vec![("status".to_string(), "closed".to_string())]);
    }

    #[tokio::test]
    async fn get_ticket_returns_record() {
        let (_, transport) = recording(200, TICKET.to_string());
        let ticket = client(transport).get_ticket(9).await.unwrap();
        assert_eq!(ticket.id, 9);
        assert_eq!(ticket.flavor, Flavor::Off);
    }

    #[tokio::test]
    async fn update_ticket_status_puts_status_query() {
        let (seen, transport) = recording(200, TICKET.to_string());
        let ticket = client(transport)
            .update_ticket_status(9, TicketStatus::Closed)
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);

        let req = seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:8000/api/v1/tickets/9/status");
        assert_eq!(req.query, vec![("status".to_string(), "closed".to_string())]);
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn get_ticket_flags_unwraps_envelope() {
        let (seen, transport) = recording(200, format!(r#"{{"flags":[{FLAG},{FLAG}]}}"#));
        let flags = client(transport).get_ticket_flags(9).await.unwrap();
        assert_eq!(flags.len(), 2);

        let req = seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/v1/tickets/9/flags");
    }

    #[tokio::test]
    async fn get_health_returns_payload_verbatim() {
        let raw = r#"{"hostname":"nutripatrol-api","status":"success","timestamp":1714557600.5,"results":[{"checker":"test_connect_postgres","output":"ok","passed":true,"timestamp":1714557600.5,"expires":1714557627.5,"response_time":0.0123}]}"#;
        let (seen, transport) = recording(200, raw.to_string());
        let health = client(transport).get_health().await.unwrap();

        assert_eq!(
            serde_json::to_value(&health).unwrap(),
            serde_json::from_str::<serde_json::Value>(raw).unwrap()
        );
        assert_eq!(health.results[0].checker, "test_connect_postgres");
        assert!(health.results[0].passed);

        let req = seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.url, "http://localhost:8000/health");
    }

    #[tokio::test]
    async fn get_health_transport_failure_is_unexpected() {
        let failing = |_req: HttpRequest| {
            ready(Err::<HttpResponse, _>(TransportError::new("connection reset")))
        };
        let err = client(failing).get_health().await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "An unexpected error occurred");
        assert!(err.details().is_none());
    }
}
