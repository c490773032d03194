//! Tests for the carrier registry and the name-snapshot contract on
//! assignment: a shipment keeps the carrier name it was assigned under,
//! whatever happens to the carrier record afterwards.

mod common;

use axum::{
    body,
    http::{Method, StatusCode},
    response::Response,
};
use common::TestApp;
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

async fn create_carrier(app: &TestApp, name: &str, tax_id: &str, email: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/carriers",
            Some(json!({
                "name": name,
                "tax_id": tax_id,
                "email": email,
                "phone": "+55 11 4002-8922"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    body["data"]["id"].as_str().expect("carrier id").to_string()
}

async fn create_shipment(app: &TestApp, number: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/shipments",
            Some(json!({
                "shipment_number": number,
                "invoice_number": format!("NF-{}", number),
                "client_name": "Acme"
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

#[tokio::test]
async fn crud_roundtrip_with_alphabetical_listing() {
    let app = TestApp::new().await;
    let rapido = create_carrier(&app, "Rapido Norte", "11.111.111/0001-11", "ops@rapido.example").await;
    create_carrier(&app, "Alfa Cargo", "22.222.222/0001-22", "ops@alfa.example").await;

    let response = app.request(Method::GET, "/api/v1/carriers", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .expect("carriers array")
        .iter()
        .map(|c| c["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["Alfa Cargo", "Rapido Norte"]);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/carriers/{}", rapido),
            Some(json!({ "phone": "+55 51 3000-0000" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["phone"], "+55 51 3000-0000");
    // Fields that were not sent stay as they were.
    assert_eq!(body["data"]["name"], "Rapido Norte");
    assert_eq!(body["data"]["email"], "ops@rapido.example");

    let response = app
        .request(Method::DELETE, &format!("/api/v1/carriers/{}", rapido), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/api/v1/carriers/{}", rapido), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_contact_data_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/carriers",
            Some(json!({
                "name": "TransLog",
                "tax_id": "33.333.333/0001-33",
                "email": "not-an-email"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/api/v1/carriers",
            Some(json!({
                "name": "",
                "tax_id": "33.333.333/0001-33",
                "email": "ops@translog.example"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let id = create_carrier(&app, "TransLog", "33.333.333/0001-33", "ops@translog.example").await;
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/carriers/{}", id),
            Some(json!({ "email": "still-not-an-email" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assignment_snapshots_the_carrier_name() {
    let app = TestApp::new().await;
    let carrier = create_carrier(&app, "Alfa Cargo", "22.222.222/0001-22", "ops@alfa.example").await;
    let first = create_shipment(&app, "RM-400").await;
    let second = create_shipment(&app, "RM-401").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{}/carrier", first),
            Some(json!({ "carrier_id": carrier, "actor": "planner" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["shipment"]["carrier_name"], "Alfa Cargo");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/shipments/{}/history", first),
            None,
        )
        .await;
    let body = response_json(response).await;
    let entries = body["data"].as_array().expect("history array");
    assert_eq!(entries[0]["status"], "carrier_assigned");
    assert_eq!(entries[0]["description"], "Carrier assigned: Alfa Cargo.");
    assert_eq!(entries[0]["actor"], "planner");

    // Renaming the carrier must not rewrite what is on the paperwork.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/carriers/{}", carrier),
            Some(json!({ "name": "Alfa Cargo Ltda" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/api/v1/shipments/{}", first), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["carrier_name"], "Alfa Cargo");

    // A fresh assignment picks up the new name.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{}/carrier", second),
            Some(json!({ "carrier_id": carrier })),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["shipment"]["carrier_name"], "Alfa Cargo Ltda");

    // The listing filter matches the snapshot, not the registry.
    let response = app
        .request(Method::GET, "/api/v1/shipments?carrier=Alfa%20Cargo", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], first.as_str());

    let response = app
        .request(Method::GET, "/api/v1/shipments?without_carrier=true", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn deleting_a_carrier_keeps_past_assignments() {
    let app = TestApp::new().await;
    let carrier = create_carrier(&app, "Rota Sul", "44.444.444/0001-44", "ops@rotasul.example").await;
    let shipment = create_shipment(&app, "RM-410").await;

    app.request(
        Method::POST,
        &format!("/api/v1/shipments/{}/carrier", shipment),
        Some(json!({ "carrier_id": carrier })),
    )
    .await;

    let response = app
        .request(Method::DELETE, &format!("/api/v1/carriers/{}", carrier), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/api/v1/shipments/{}", shipment), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["carrier_name"], "Rota Sul");

    // Assigning the deleted carrier to anything else fails cleanly.
    let other = create_shipment(&app, "RM-411").await;
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{}/carrier", other),
            Some(json!({ "carrier_id": carrier })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn closed_shipments_refuse_new_assignments() {
    let app = TestApp::new().await;
    let carrier = create_carrier(&app, "Rota Sul", "44.444.444/0001-44", "ops@rotasul.example").await;
    let shipment = create_shipment(&app, "RM-420").await;

    app.request(
        Method::POST,
        &format!("/api/v1/shipments/{}/cancel", shipment),
        Some(json!({ "reason": "Route discontinued" })),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/shipments/{}/carrier", shipment),
            Some(json!({ "carrier_id": carrier })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
