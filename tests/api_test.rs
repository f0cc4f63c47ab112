//! End-to-end tests driving the axum router with in-process requests
//! against a temporary database.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use equiflow::api::{router, AppState};
use equiflow::auth::StaticTokenVerifier;
use equiflow::store::Store;

const TOKEN: &str = "test-token";
const REVOKED_TOKEN: &str = "revoked-token";
const BOUNDARY: &str = "equiflow-test-boundary";

const VALID_CSV: &str = "\
Equipment Name,Type,Flowrate,Pressure,Temperature
P1,Pump,10.0,2.0,300.0
V1,Valve,5.0,1.0,250.0
";

fn test_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("api.db")).unwrap();

    let mut tokens = HashMap::new();
    tokens.insert(TOKEN.to_string(), "tester".to_string());
    tokens.insert(REVOKED_TOKEN.to_string(), "tester".to_string());
    let mut revoked = HashSet::new();
    revoked.insert(REVOKED_TOKEN.to_string());

    let verifier = Arc::new(StaticTokenVerifier::new(tokens, revoked));
    (dir, router(AppState::new(store, verifier)))
}

fn multipart_body(filename: &str, csv: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{BOUNDARY}--\r\n"
    )
}

async fn upload(app: &Router, filename: &str, csv: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(filename, csv)))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn get_authed(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_creates_identity_without_echoing_password() {
    let (_dir, app) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"username":"alice","password":"hunter2","email":"alice@example.com"}"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["username"], "alice");
    assert_eq!(json["email"], "alice@example.com");
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn register_rejects_invalid_payload() {
    let (_dir, app) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"alice"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_reject_missing_and_revoked_tokens() {
    let (_dir, app) = test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/summary")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "missing bearer token");

    let request = Request::builder()
        .method("GET")
        .uri("/summary")
        .header(header::AUTHORIZATION, format!("Bearer {REVOKED_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "token revoked");
}

#[tokio::test]
async fn upload_returns_created_snapshot() {
    let (_dir, app) = test_app();

    let response = upload(&app, "equipment.csv", VALID_CSV).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["total_count"], 2);
    assert_eq!(json["avg_flowrate"], 7.5);
    assert_eq!(json["avg_pressure"], 1.5);
    assert_eq!(json["avg_temperature"], 275.0);
    assert_eq!(json["type_distribution"][0]["equipment_type"], "Pump");
    assert_eq!(json["type_distribution"][0]["count"], 1);
    assert_eq!(json["type_distribution"][1]["equipment_type"], "Valve");
    assert_eq!(json["type_distribution"][1]["count"], 1);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let (_dir, app) = test_app();
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"notes\"\r\n\r\n\
         hello\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No file provided");
}

#[tokio::test]
async fn upload_rejects_non_csv_filename() {
    let (_dir, app) = test_app();
    let response = upload(&app, "equipment.xlsx", VALID_CSV).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "File must be CSV");
}

#[tokio::test]
async fn upload_missing_pressure_column_names_it_and_persists_nothing() {
    let (_dir, app) = test_app();
    let csv = "\
Equipment Name,Type,Flowrate,Temperature
P1,Pump,10.0,300.0
";
    let response = upload(&app, "equipment.csv", csv).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Pressure"));

    let response = get_authed(&app, "/summary").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_with_bad_numeric_cell_is_a_server_error_and_persists_nothing() {
    let (_dir, app) = test_app();
    let csv = "\
Equipment Name,Type,Flowrate,Pressure,Temperature
P1,Pump,ten,2.0,300.0
";
    let response = upload(&app, "equipment.csv", csv).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = get_authed(&app, "/summary").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn header_only_upload_reports_zero_averages() {
    let (_dir, app) = test_app();
    let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\n";

    let response = upload(&app, "equipment.csv", csv).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["total_count"], 0);
    assert_eq!(json["avg_flowrate"], 0.0);
    assert_eq!(json["avg_pressure"], 0.0);
    assert_eq!(json["avg_temperature"], 0.0);
    assert_eq!(json["type_distribution"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn summary_is_404_until_first_upload() {
    let (_dir, app) = test_app();

    let response = get_authed(&app, "/summary").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["message"], "No data available");

    upload(&app, "equipment.csv", VALID_CSV).await;

    let response = get_authed(&app, "/summary").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total_count"], 2);
}

#[tokio::test]
async fn history_after_seven_uploads_returns_five_newest_first() {
    let (_dir, app) = test_app();

    for i in 1..=7 {
        // vary the row count so each snapshot is distinguishable
        let mut csv = String::from("Equipment Name,Type,Flowrate,Pressure,Temperature\n");
        for row in 0..i {
            csv.push_str(&format!("E{row},Pump,1.0,1.0,1.0\n"));
        }
        let response = upload(&app, "equipment.csv", &csv).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = get_authed(&app, "/history").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 5);

    let counts: Vec<i64> = entries
        .iter()
        .map(|e| e["total_count"].as_i64().unwrap())
        .collect();
    assert_eq!(counts, vec![7, 6, 5, 4, 3]);
}

#[tokio::test]
async fn generate_pdf_returns_document_or_404() {
    let (_dir, app) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/generate-pdf")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No data available to generate report");

    upload(&app, "equipment.csv", VALID_CSV).await;

    let request = Request::builder()
        .method("POST")
        .uri("/generate-pdf")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
