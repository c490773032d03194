//! Tests for the pendency dashboard: which shipments are missing data or
//! have blown past a scheduled date, and the per-kind summary counts.

mod common;

use axum::{
    body,
    http::{Method, StatusCode},
    response::Response,
};
use chrono::{Duration, Utc};
use common::TestApp;
use freightflow_api::entities::shipment::{self, ShipmentStatus};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{Set, Unchanged},
};
use serde_json::{json, Value};
use uuid::Uuid;

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

async fn create_shipment(app: &TestApp, number: &str, invoice: &str, client: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/shipments",
            Some(json!({
                "shipment_number": number,
                "invoice_number": invoice,
                "client_name": client
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    body["data"]["shipment"]["id"]
        .as_str()
        .expect("shipment id")
        .to_string()
}

async fn schedule_delivery(app: &TestApp, id: &str, when: chrono::DateTime<Utc>) {
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{}/schedule-delivery", id),
            Some(json!({ "scheduled_for": when.to_rfc3339() })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn list_pendencies(app: &TestApp, query: &str) -> Vec<Value> {
    let uri = if query.is_empty() {
        "/api/v1/pendencies".to_string()
    } else {
        format!("/api/v1/pendencies?{}", query)
    };
    let response = app.request(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    body["data"].as_array().expect("pendency array").clone()
}

fn kinds_for<'a>(pendencies: &'a [Value], shipment_id: &str) -> Vec<&'a str> {
    pendencies
        .iter()
        .filter(|p| p["shipment"]["id"] == shipment_id)
        .map(|p| p["kind"].as_str().expect("kind"))
        .collect()
}

#[tokio::test]
async fn a_fresh_shipment_reports_missing_scheduling() {
    let app = TestApp::new().await;
    let id = create_shipment(&app, "RM-300", "NF-300", "Acme").await;

    let pendencies = list_pendencies(&app, "").await;
    assert_eq!(pendencies.len(), 1);
    assert_eq!(pendencies[0]["shipment"]["id"], id.as_str());
    assert_eq!(pendencies[0]["kind"], "missing_scheduling");
    assert_eq!(pendencies[0]["severity"], 5);
    assert_eq!(pendencies[0]["label"], "Missing scheduling");
}

#[tokio::test]
async fn scheduling_tomorrow_leaves_only_the_loading_date_open() {
    let app = TestApp::new().await;
    let id = create_shipment(&app, "RM-301", "NF-301", "Acme").await;

    schedule_delivery(&app, &id, Utc::now() + Duration::days(1)).await;

    let pendencies = list_pendencies(&app, "").await;
    let kinds = kinds_for(&pendencies, &id);
    assert_eq!(kinds, vec!["missing_loading_date"]);
}

#[tokio::test]
async fn a_past_delivery_date_flags_delivery_overdue_while_still_open() {
    let app = TestApp::new().await;
    let id = create_shipment(&app, "RM-310", "NF-310", "Globex").await;

    schedule_delivery(&app, &id, Utc::now() - Duration::days(1)).await;

    let pendencies = list_pendencies(&app, "").await;
    let kinds = kinds_for(&pendencies, &id);
    assert_eq!(kinds, vec!["delivery_overdue", "missing_loading_date"]);

    // The listing badge agrees with the dashboard.
    let response = app
        .request(Method::GET, "/api/v1/shipments?search=RM-310", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["items"][0]["late"], true);

    // The rule keeps firing through the loading stage.
    let uuid = Uuid::parse_str(&id).expect("uuid");
    let force = shipment::ActiveModel {
        id: Unchanged(uuid),
        status: Set(ShipmentStatus::AwaitingLoading),
        ..Default::default()
    };
    force
        .update(&*app.state.db)
        .await
        .expect("force awaiting_loading");

    let pendencies = list_pendencies(&app, "kind=delivery_overdue").await;
    assert_eq!(kinds_for(&pendencies, &id), vec!["delivery_overdue"]);
}

#[tokio::test]
async fn loading_overdue_appears_once_the_loading_date_passes() {
    let app = TestApp::new().await;
    let id = create_shipment(&app, "RM-320", "NF-320", "Initech").await;

    schedule_delivery(&app, &id, Utc::now() + Duration::days(2)).await;
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{}/schedule-loading", id),
            Some(json!({ "scheduled_for": (Utc::now() - Duration::hours(3)).to_rfc3339() })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let pendencies = list_pendencies(&app, "").await;
    let entry = pendencies
        .iter()
        .find(|p| p["shipment"]["id"] == id.as_str())
        .expect("pendency entry");
    assert_eq!(entry["kind"], "loading_overdue");
    assert_eq!(entry["severity"], 2);
    assert_eq!(entry["label"], "Loading overdue");
}

#[tokio::test]
async fn kind_filter_returns_exactly_the_matching_subset() {
    let app = TestApp::new().await;
    let fresh = create_shipment(&app, "RM-330", "NF-330", "Acme").await;
    let booked = create_shipment(&app, "RM-331", "NF-331", "Globex").await;
    let overdue = create_shipment(&app, "RM-332", "NF-332", "Initech").await;

    schedule_delivery(&app, &booked, Utc::now() + Duration::days(1)).await;
    schedule_delivery(&app, &overdue, Utc::now() - Duration::days(1)).await;

    let pendencies = list_pendencies(&app, "kind=missing_loading_date").await;
    assert_eq!(pendencies.len(), 2);
    for entry in &pendencies {
        assert_eq!(entry["kind"], "missing_loading_date");
    }
    let ids: Vec<&str> = pendencies
        .iter()
        .map(|p| p["shipment"]["id"].as_str().expect("id"))
        .collect();
    assert!(ids.contains(&booked.as_str()));
    assert!(ids.contains(&overdue.as_str()));
    assert!(!ids.contains(&fresh.as_str()));

    let response = app
        .request(Method::GET, "/api/v1/pendencies?kind=sideways", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn closed_shipments_never_appear() {
    let app = TestApp::new().await;
    let id = create_shipment(&app, "RM-340", "NF-340", "Umbrella").await;

    schedule_delivery(&app, &id, Utc::now() - Duration::days(2)).await;
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{}/cancel", id),
            Some(json!({ "reason": "Client gave up" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let pendencies = list_pendencies(&app, "").await;
    assert!(kinds_for(&pendencies, &id).is_empty());

    let response = app
        .request(Method::GET, "/api/v1/pendencies/summary", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["late_shipments"], 0);
}

#[tokio::test]
async fn summary_counts_every_kind_with_zeroes() {
    let app = TestApp::new().await;
    create_shipment(&app, "RM-350", "NF-350", "Acme").await;
    let booked = create_shipment(&app, "RM-351", "NF-351", "Globex").await;
    let overdue = create_shipment(&app, "RM-352", "NF-352", "Initech").await;

    schedule_delivery(&app, &booked, Utc::now() + Duration::days(1)).await;
    schedule_delivery(&app, &overdue, Utc::now() - Duration::days(1)).await;

    let response = app
        .request(Method::GET, "/api/v1/pendencies/summary", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    let counts = body["data"]["counts"].as_array().expect("counts array");
    assert_eq!(counts.len(), 5);
    let count_of = |kind: &str| -> u64 {
        counts
            .iter()
            .find(|c| c["kind"] == kind)
            .and_then(|c| c["count"].as_u64())
            .expect("count for kind")
    };
    assert_eq!(count_of("delivery_overdue"), 1);
    assert_eq!(count_of("loading_overdue"), 0);
    assert_eq!(count_of("missing_delivery_date"), 0);
    assert_eq!(count_of("missing_loading_date"), 2);
    assert_eq!(count_of("missing_scheduling"), 1);
    // Most critical kind first, zeroes included.
    assert_eq!(counts[0]["kind"], "delivery_overdue");
    assert_eq!(counts[4]["kind"], "missing_scheduling");

    assert_eq!(body["data"]["late_shipments"], 1);
}

#[tokio::test]
async fn severity_orders_the_dashboard() {
    let app = TestApp::new().await;
    create_shipment(&app, "RM-360", "NF-360", "Acme").await;
    let overdue = create_shipment(&app, "RM-361", "NF-361", "Globex").await;
    schedule_delivery(&app, &overdue, Utc::now() - Duration::days(1)).await;

    let pendencies = list_pendencies(&app, "").await;
    assert!(pendencies.len() >= 3);
    assert_eq!(pendencies[0]["kind"], "delivery_overdue");
    assert_eq!(
        pendencies.last().expect("last entry")["kind"],
        "missing_scheduling"
    );

    let severities: Vec<u64> = pendencies
        .iter()
        .map(|p| p["severity"].as_u64().expect("severity"))
        .collect();
    let mut sorted = severities.clone();
    sorted.sort_unstable();
    assert_eq!(severities, sorted);
}

#[tokio::test]
async fn search_narrows_the_dashboard() {
    let app = TestApp::new().await;
    create_shipment(&app, "RM-370", "NF-370", "Acme").await;
    let other = create_shipment(&app, "RM-371", "NF-371", "Globex").await;

    let pendencies = list_pendencies(&app, "search=globex").await;
    assert_eq!(pendencies.len(), 1);
    assert_eq!(pendencies[0]["shipment"]["id"], other.as_str());

    let pendencies = list_pendencies(&app, "without_carrier=true").await;
    assert_eq!(pendencies.len(), 2);
}
