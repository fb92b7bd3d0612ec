use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use optipack_http_server::server::config::ServerConfig;
use optipack_http_server::server::routes;
use optipack_http_server::server::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let config = ServerConfig {
        server_addr: "127.0.0.1:0".into(),
        sizes: vec![250, 500, 1000, 2000, 5000],
        cache_capacity: 128,
    };
    routes::router(AppState::new(&config).unwrap())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn put_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(app(), get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "All services are up and running");
    assert!(body.get("err").is_none());
}

#[tokio::test]
async fn lists_the_active_sizes_ascending() {
    let (status, body) = send(app(), get("/api/v1/packet/size")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["packet_sizes"],
        json!([250, 500, 1000, 2000, 5000])
    );
}

#[tokio::test]
async fn calculates_an_optimal_allocation() {
    let (status, body) = send(app(), get("/api/v1/packet/calculate?items=12001")).await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(
        data["optimal_packets"],
        json!({ "250": 1, "2000": 1, "5000": 2 })
    );
    assert_eq!(data["total_capacity"], 12_250);
    assert_eq!(data["packet_count"], 4);
    assert_eq!(data["overshoot"], 249);
}

#[tokio::test]
async fn repeated_requests_return_the_same_allocation() {
    let app = app();
    let (_, first) = send(app.clone(), get("/api/v1/packet/calculate?items=751")).await;
    let (_, second) = send(app, get("/api/v1/packet/calculate?items=751")).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn rejects_non_numeric_items() {
    for uri in [
        "/api/v1/packet/calculate",
        "/api/v1/packet/calculate?items=",
        "/api/v1/packet/calculate?items=abc",
        "/api/v1/packet/calculate?items=-5",
        "/api/v1/packet/calculate?items=1.5",
    ] {
        let (status, body) = send(app(), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["err"], "items should be positive integer", "{uri}");
    }
}

#[tokio::test]
async fn rejects_out_of_range_items() {
    let (status, body) = send(app(), get("/api/v1/packet/calculate?items=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["err"].as_str().unwrap().contains("between 1 and"));

    let (status, _) = send(app(), get("/api/v1/packet/calculate?items=1000000001")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_replaces_sizes_and_recalculates() {
    let app = app();

    let (status, body) = send(
        app.clone(),
        put_json("/api/v1/packet/size", &json!({ "sizes": [23, 31, 53] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Packet sizes have been put successfully");

    let (_, body) = send(app.clone(), get("/api/v1/packet/size")).await;
    assert_eq!(body["data"]["packet_sizes"], json!([23, 31, 53]));

    let (status, body) = send(app, get("/api/v1/packet/calculate?items=500000")).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(
        data["optimal_packets"],
        json!({ "23": 2, "31": 7, "53": 9429 })
    );
    assert_eq!(data["total_capacity"], 500_000);
    assert_eq!(data["packet_count"], 9_438);
}

#[tokio::test]
async fn put_rejects_invalid_sizes_and_keeps_the_old_set() {
    let app = app();

    for body in [
        json!({ "sizes": [] }),
        json!({ "sizes": [250, 250] }),
        json!({ "sizes": [0, 500] }),
    ] {
        let (status, response) = send(app.clone(), put_json("/api/v1/packet/size", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response["err"].is_string(), "{body}");
    }

    let (_, body) = send(app, get("/api/v1/packet/size")).await;
    assert_eq!(
        body["data"]["packet_sizes"],
        json!([250, 500, 1000, 2000, 5000])
    );
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (status, _) = send(app(), get("/api/v1/packet/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
