use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use moto_workflow::config::EnvironmentConfig;
use moto_workflow::middleware::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use moto_workflow::repositories::MemoryStore;
use moto_workflow::routes::create_app_router;
use moto_workflow::services::LogNotifier;
use moto_workflow::state::AppState;

fn create_test_app() -> Router {
    let state = AppState::new(
        EnvironmentConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(LogNotifier),
    );
    create_app_router(state)
}

struct Caller {
    id: Uuid,
    role: &'static str,
}

fn caller(role: &'static str) -> Caller {
    Caller {
        id: Uuid::new_v4(),
        role,
    }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        request = request
            .header(ACTOR_ID_HEADER, caller.id.to_string())
            .header(ACTOR_ROLE_HEADER, caller.role);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn register_moto(app: &Router, admin: &Caller) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/motorcycles",
        Some(admin),
        Some(json!({
            "brand": "Honda",
            "model": "Ace 125",
            "year": 2020,
            "acquisition_cost": 850000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "moto-workflow");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_register_motorcycle() {
    let app = create_test_app();
    let admin = caller("admin");
    let id = register_moto(&app, &admin).await;

    let (status, body) = call(&app, Method::GET, &format!("/api/motorcycles/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "in_stock");
    assert_eq!(body["data"]["acquisition_cost"], "850000");
    assert_eq!(body["data"]["total_cost"], "850000");
}

#[tokio::test]
async fn test_missing_actor_headers() {
    let app = create_test_app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/motorcycles",
        None,
        Some(json!({ "brand": "Honda", "model": "Ace", "acquisition_cost": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_ACTOR");
}

#[tokio::test]
async fn test_role_without_permission_is_forbidden() {
    let app = create_test_app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/motorcycles",
        Some(&caller("mechanic")),
        Some(json!({ "brand": "Honda", "model": "Ace", "acquisition_cost": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_invalid_payload_is_rejected() {
    let app = create_test_app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/motorcycles",
        Some(&caller("admin")),
        Some(json!({ "brand": "  ", "model": "Ace", "acquisition_cost": -5 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_motorcycle_is_not_found() {
    let app = create_test_app();
    let uri = format!("/api/motorcycles/{}", Uuid::new_v4());
    let (status, body) = call(&app, Method::GET, &uri, None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_repair_transitions_over_http() {
    let app = create_test_app();
    let admin = caller("admin");
    let mechanic = caller("mechanic");
    let moto_id = register_moto(&app, &admin).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/repairs",
        Some(&admin),
        Some(json!({
            "motorcycle_id": moto_id,
            "mechanic_id": mechanic.id,
            "description": "Frenos traseros"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let repair_id = body["data"]["id"].as_str().unwrap().to_string();

    let start = format!("/api/repairs/{}/start", repair_id);
    let (status, body) = call(&app, Method::POST, &start, Some(&mechanic), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, body) = call(
        &app,
        Method::POST,
        &start,
        Some(&mechanic),
        Some(json!({ "expected_status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["message"], "This item has already moved on, please refresh");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/repairs/{}/details", repair_id),
        Some(&mechanic),
        Some(json!({
            "work_items": [{
                "description": "Pastillas nuevas",
                "labor_cost": "20000",
                "spare_parts": [{ "name": "Pastillas", "quantity": 2, "cost": "30000" }]
            }],
            "expected_status": "in_progress"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["repair"]["status"], "awaiting_details_approval");
    assert_eq!(body["data"]["repair"]["total_cost"], "50000");
    assert_eq!(body["data"]["approval_request"]["status"], "pending_sales");

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/motorcycles/{}/invariants", moto_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in_repair");
    assert_eq!(body["data"]["violations"], json!([]));

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/repairs/{}/history", repair_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_approval_chain_over_http() {
    let app = create_test_app();
    let admin = caller("admin");
    let sales = caller("sales");
    let moto_id = register_moto(&app, &admin).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/approvals",
        Some(&caller("staff")),
        Some(json!({
            "approval_type": "motorcycle_edit",
            "proposed_data": { "motorcycle_id": moto_id, "registration_number": "MC 123 ABC" },
            "priority": "high"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    let admin_first = format!("/api/approvals/{}/admin-approve", request_id);
    let (status, body) = call(&app, Method::POST, &admin_first, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/approvals/{}/sales-approve", request_id),
        Some(&sales),
        Some(json!({ "comments": "ok", "expected_status": "pending_sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, "/api/approvals?status=pending_admin", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, Method::POST, &admin_first, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "approved");

    let (_, body) = call(&app, Method::GET, &format!("/api/motorcycles/{}", moto_id), None, None).await;
    assert_eq!(body["data"]["registration_number"], "MC 123 ABC");
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let app = create_test_app();
    let admin = caller("admin");
    let moto_id = register_moto(&app, &admin).await;

    let (_, body) = call(
        &app,
        Method::POST,
        "/api/approvals",
        Some(&admin),
        Some(json!({
            "approval_type": "price_change",
            "proposed_data": { "motorcycle_id": moto_id, "sale_price": "1100000" }
        })),
    )
    .await;
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    let reject = format!("/api/approvals/{}/reject", request_id);

    let (status, _) = call(&app, Method::POST, &reject, Some(&caller("sales")), Some(json!({ "reason": " " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = call(
        &app,
        Method::POST,
        &reject,
        Some(&caller("sales")),
        Some(json!({ "reason": "precio muy bajo" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "rejected");
}

#[tokio::test]
async fn test_inspection_status_depends_on_viewer() {
    let app = create_test_app();
    let admin = caller("admin");
    let registration = caller("registration");
    let moto_id = register_moto(&app, &admin).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/inspections",
        Some(&registration),
        Some(json!({ "motorcycle_id": moto_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let inspection_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/inspections/{}/verify-rama", inspection_id),
        Some(&registration),
        Some(json!({ "seller_information": { "full_name": "Neema Said" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let uri = format!("/api/inspections/{}", inspection_id);
    let (_, anonymous) = call(&app, Method::GET, &uri, None, None).await;
    let (_, transport) = call(&app, Method::GET, &uri, Some(&caller("transport")), None).await;

    assert_eq!(anonymous["data"]["workflow_status"], "rama_completed");
    assert_eq!(anonymous["data"]["effective_status"], "rama_completed");
    assert_eq!(transport["data"]["effective_status"], "gidioni_pending");
}

#[tokio::test]
async fn test_misspelled_expected_status_is_rejected() {
    let app = create_test_app();
    let admin = caller("admin");
    let mechanic = caller("mechanic");
    let moto_id = register_moto(&app, &admin).await;

    let (_, body) = call(
        &app,
        Method::POST,
        "/api/repairs",
        Some(&admin),
        Some(json!({
            "motorcycle_id": moto_id,
            "mechanic_id": mechanic.id,
            "description": "Embrague"
        })),
    )
    .await;
    let repair_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/repairs/{}/start", repair_id),
        Some(&mechanic),
        Some(json!({ "expected_status": "in_progres" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (_, body) = call(&app, Method::GET, &format!("/api/repairs/{}", repair_id), None, None).await;
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn test_stale_listing_rejects_huge_threshold() {
    let app = create_test_app();
    let uri = format!("/api/approvals/stale?hours={}", i64::MAX);
    let (status, body) = call(&app, Method::GET, &uri, None, None).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = call(&app, Method::GET, "/api/approvals/stale?hours=24", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}
