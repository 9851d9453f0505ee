//! Moderation lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every typed accessor
//! through `UreqTransport` over real HTTP. Validates that request building,
//! the transport and response normalization agree with an actual server.

use nutripatrol_client::{
    ApiError, Flavor, HttpMethod, IssueType, NewFlag, NutripatrolClient, RequestOptions, Source,
    TicketFilter, TicketStatus, UreqTransport,
};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

fn product_flag(user_id: &str) -> NewFlag {
    NewFlag {
        barcode: Some("3017620422003".to_string()),
        issue_type: IssueType::Product,
        url: "https://world.openfoodfacts.org/product/3017620422003".to_string(),
        user_id: user_id.to_string(),
        device_id: "web-1".to_string(),
        source: Source::Web,
        confidence: None,
        image_id: None,
        flavor: Flavor::Off,
        reason: Some("inappropriate".to_string()),
        comment: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn moderation_lifecycle() {
    // Step 1: start mock server and point a client at it.
    let base_url = start_server().await;
    let client = NutripatrolClient::with_base_url(UreqTransport::new(), &base_url);

    // Step 2: health check.
    let health = client.get_health().await.unwrap();
    assert_eq!(health.status, "success");
    assert!(health.results.iter().all(|check| check.passed));

    // Step 3: no flags yet.
    let flags = client.list_flags().await.unwrap();
    assert!(flags.is_empty(), "expected empty list");

    // Step 4: two flags on the same product share a ticket.
    let first = client.create_flag(&product_flag("alice")).await.unwrap();
    let second = client.create_flag(&product_flag("bob")).await.unwrap();
    assert_eq!(first.ticket_id, second.ticket_id);

    // Step 5: fetch back the first flag.
    let fetched = client.get_flag(first.id).await.unwrap();
    assert_eq!(fetched, first);

    // Step 6: the ticket lists both flags.
    let ticket = client.get_ticket(first.ticket_id).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Open);
    let grouped = client.get_ticket_flags(ticket.id).await.unwrap();
    assert_eq!(grouped.len(), 2);

    // Step 7: close it, then filter by status.
    let closed = client
        .update_ticket_status(ticket.id, TicketStatus::Closed)
        .await
        .unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);

    let open = client
        .list_tickets(TicketFilter::default().status(TicketStatus::Open))
        .await
        .unwrap();
    assert!(open.is_empty(), "expected no open tickets");
    let all = client.list_tickets(TicketFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);

    // Step 8: list shows both flags.
    let flags = client.list_flags().await.unwrap();
    assert_eq!(flags.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_normalized() {
    let base_url = start_server().await;
    let client = NutripatrolClient::with_base_url(UreqTransport::new(), &base_url);

    // 404 keeps status and body.
    let err = client.get_flag(404).await.unwrap_err();
    assert!(matches!(err, ApiError::Upstream { status: 404, .. }));
    assert_eq!(
        err.details(),
        Some(serde_json::json!({"detail": "Flag not found"}))
    );

    // 422 from validation carries the messages.
    let mut invalid = product_flag("alice");
    invalid.barcode = None;
    let err = client.create_flag(&invalid).await.unwrap_err();
    match err {
        ApiError::Validation { details } => {
            assert_eq!(details, vec!["barcode is required for product and image flags"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    // Unsupported method: axum answers 405 with an empty body, which cannot
    // be parsed and so is reported as unexpected.
    let err = client
        .request::<serde_json::Value>(HttpMethod::Delete, "/api/v1/flags/1", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unexpected(_)));
    assert_eq!(err.status_code(), 500);

    // 422 from the query extractor still carries FastAPI-style messages.
    let err = client
        .request::<serde_json::Value>(
            HttpMethod::Put,
            "/api/v1/tickets/1/status",
            RequestOptions::new().query("status", "pending"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_unexpected_error() {
    // Bind then drop a listener so the port is closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = NutripatrolClient::with_base_url(UreqTransport::new(), &format!("http://{addr}"));
    let err = client.get_health().await.unwrap_err();
    assert!(matches!(err, ApiError::Unexpected(_)));
    assert_eq!(
        serde_json::to_value(err.to_normalized()).unwrap(),
        serde_json::json!({"error": {"statusCode": 500, "message": "An unexpected error occurred"}})
    );
}
