mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::setup;
use storefront_api::{api_v1_routes, config::AppConfig, jobs::JobRunResult, AppState};
use tower::util::ServiceExt;

async fn test_router(scheduler_secret: Option<&str>) -> Router {
    let app = setup().await;

    let mut config = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        0,
        "test".to_string(),
    );
    config.scheduler_secret = scheduler_secret.map(str::to_string);

    let state = AppState {
        db: app.db.clone(),
        config,
        jobs: app.jobs.clone(),
    };

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn get_trigger_runs_open_without_configured_secret() {
    let router = test_router(None).await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/jobs/no-show?gracePeriodMinutes=15")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result: JobRunResult = serde_json::from_value(body_json(response).await).unwrap();
    assert!(result.success);
    assert_eq!(result.processed, 0);
}

#[tokio::test]
async fn configured_secret_rejects_unauthenticated_triggers() {
    let router = test_router(Some("cron-s3cret")).await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/jobs/no-show")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn bearer_token_query_secret_and_marker_all_authenticate() {
    let router = test_router(Some("cron-s3cret")).await;

    let bearer = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/jobs/auto-clock-out")
                .header("authorization", "Bearer cron-s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bearer.status(), StatusCode::OK);

    let query_secret = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/jobs/auto-clock-out?secret=cron-s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(query_secret.status(), StatusCode::OK);

    let marker = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/jobs/auto-clock-out")
                .header("x-trusted-scheduler", "true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(marker.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_body_secret_matches_get_semantics() {
    let router = test_router(Some("cron-s3cret")).await;

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/jobs/no-show")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "secret": "cron-s3cret",
                        "gracePeriodMinutes": 15
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result: JobRunResult = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(result.failed, 0);
}

#[tokio::test]
async fn malformed_parameters_are_a_bad_request() {
    let router = test_router(None).await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/jobs/no-show?gracePeriodMinutes=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
