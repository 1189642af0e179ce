use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use duty_roster::server::router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn month() -> Value {
    json!({
        "calendar": { "monthDays": 3, "firstWeekday": "Mon" },
        "shifts": [{ "code": "D" }],
        "dayParts": { "morning": ["D"] },
        "demand": { "weekdayShifts": ["D"], "holidayShifts": ["D"] },
        "levels": [{ "name": "L1", "shifts": ["D"] }],
        "employees": [
            { "id": "P01", "level": "L1", "minShifts": 0, "maxShifts": 3 },
            { "id": "P02", "level": "L1", "minShifts": 0, "maxShifts": 3 }
        ]
    })
}

async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_validate_accepts_month() {
    let (status, body) = post("/v1/roster/validate", month()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(true));
    assert_eq!(body["issues"], json!([]));
}

#[tokio::test]
async fn test_validate_reports_every_issue() {
    let mut input = month();
    input["dayParts"] = json!({ "morning": [] });
    input["employees"][0]["minShifts"] = json!(5);
    let (status, body) = post("/v1/roster/validate", input).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["issues"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_solve_returns_roster() {
    let request = json!({ "input": month(), "settings": { "timeLimitSecs": 10.0 } });
    let (status, body) = post("/v1/roster/solve", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("OPTIMAL"));
    assert_eq!(body["assignments"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["violations"], json!([]));
}

#[tokio::test]
async fn test_solve_rejects_invalid_input() {
    let mut input = month();
    input["calendar"]["publicHolidays"] = json!([9]);
    let (status, _) = post("/v1/roster/solve", json!({ "input": input })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let (status, _) = post("/v1/roster/solve", json!({ "settings": {} })).await;
    assert!(status.is_client_error());
}
