use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::infrastructure::observability::{PrometheusMetrics, create_metrics_router};

use super::health;
use super::images;
use super::queue;
use super::state::AppState;

/// Create the full router with application state
pub fn create_router(state: AppState, metrics: Option<PrometheusMetrics>) -> Router {
    let mut router = Router::new()
        .route("/", get(images::root))
        .route("/process-images", post(images::process_images))
        .route("/queue", get(queue::queue_status))
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .with_state(state);

    if let Some(m) = metrics {
        router = router.merge(create_metrics_router(m));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::QueueConfig;
    use crate::domain::detection::MockDetector;
    use crate::domain::{DomainError, ResultStatus};
    use crate::infrastructure::blob::InMemoryBlobStorage;
    use crate::infrastructure::detection::ImageAnnotator;
    use crate::infrastructure::queue::testing::{RecordingReporter, png_bytes};
    use crate::infrastructure::queue::{JobPipeline, QueueProcessor};

    const IMAGE_URL: &str = "https://storage.googleapis.com/uploads/raw/quintal.png";

    struct TestApp {
        router: Router,
        queue: Arc<QueueProcessor>,
        reporter: Arc<RecordingReporter>,
    }

    fn test_app(detector: MockDetector) -> TestApp {
        let storage =
            Arc::new(InMemoryBlobStorage::new("uploads").with_http_object(IMAGE_URL, png_bytes(24, 24)));
        let detector: Arc<MockDetector> = Arc::new(detector);
        let reporter = Arc::new(RecordingReporter::new());

        let pipeline = JobPipeline::new(
            storage.clone(),
            Arc::new(ImageAnnotator::new(detector.clone(), None, 85)),
            reporter.clone(),
            "processed",
        );
        let queue = Arc::new(QueueProcessor::start(
            pipeline,
            &QueueConfig {
                max_workers: 2,
                shutdown_timeout_secs: 5,
            },
        ));

        let state = AppState::new(queue.clone(), detector, storage, reporter.clone());

        TestApp {
            router: create_router(state, None),
            queue,
            reporter,
        }
    }

    fn working_detector() -> MockDetector {
        let mut detector = MockDetector::new();
        detector.expect_detect().returning(|_| Ok(vec![]));
        detector.expect_warm_up().returning(|| Ok(()));
        detector
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };

        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_message() {
        let app = test_app(working_detector());

        let (status, body) = send(&app.router, get("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Detecção de Criadouro Service API"}));
    }

    #[tokio::test]
    async fn test_health_and_live() {
        let app = test_app(working_detector());

        let (status, body) = send(&app.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, _) = send(&app.router, get("/live")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_process_images_queues_and_processes() {
        let app = test_app(working_detector());

        let (status, body) = send(
            &app.router,
            post_json("/process-images", json!({"image_url": IMAGE_URL, "resultId": 31})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Image has been queued for processing",
                "queued_image": IMAGE_URL
            })
        );

        assert!(app.queue.shutdown(Duration::from_secs(5)).await);

        let updates = app.reporter.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, 31);
        assert_eq!(updates[0].status, ResultStatus::Finished);
        assert!(
            updates[0]
                .result_image
                .starts_with("https://storage.googleapis.com/uploads/processed/processed_")
        );
    }

    #[tokio::test]
    async fn test_process_images_queues_normalized_url() {
        let app = test_app(working_detector());

        let (status, body) = send(
            &app.router,
            post_json(
                "/process-images",
                json!({
                    "image_url": "  HTTPS://Storage.GoogleAPIs.com/uploads/raw/quintal.png ",
                    "resultId": "32"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["queued_image"], IMAGE_URL);

        assert!(app.queue.shutdown(Duration::from_secs(5)).await);

        // the stored object is keyed by the normalized URL only
        let updates = app.reporter.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, 32);
        assert_eq!(updates[0].status, ResultStatus::Finished);
    }

    #[tokio::test]
    async fn test_process_images_encodes_spaces() {
        let app = test_app(working_detector());

        let (status, body) = send(
            &app.router,
            post_json(
                "/process-images",
                json!({"image_url": " HTTPS://Example.COM/a b.jpg ", "resultId": 5}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["queued_image"], "https://example.com/a%20b.jpg");
    }

    #[tokio::test]
    async fn test_process_images_rejects_non_http_url() {
        let app = test_app(working_detector());

        let (status, body) = send(
            &app.router,
            post_json(
                "/process-images",
                json!({"image_url": "gs://uploads/raw/quintal.png", "resultId": 1}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["param"], "image_url");
        assert_eq!(app.queue.snapshot().pending, 0);
    }

    #[tokio::test]
    async fn test_process_images_rejects_missing_result_id() {
        let app = test_app(working_detector());

        let (status, body) = send(
            &app.router,
            post_json("/process-images", json!({"image_url": IMAGE_URL})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "json_parse_error");
    }

    #[tokio::test]
    async fn test_process_images_after_shutdown_is_unavailable() {
        let app = test_app(working_detector());
        app.queue.shutdown(Duration::from_secs(1)).await;

        let (status, body) = send(
            &app.router,
            post_json("/process-images", json!({"image_url": IMAGE_URL, "resultId": 2})),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["type"], "service_unavailable_error");
    }

    #[tokio::test]
    async fn test_ready_reports_component_checks() {
        let app = test_app(working_detector());

        let (status, body) = send(&app.router, get("/ready")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        let names: Vec<&str> = body["checks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|check| check["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["detector", "storage", "result_api", "queue"]);
    }

    #[tokio::test]
    async fn test_ready_unavailable_when_model_missing() {
        let mut detector = MockDetector::new();
        detector.expect_warm_up().returning(|| {
            Err(DomainError::configuration(
                "Detection model not found at detection_model/model.onnx",
            ))
        });
        let app = test_app(detector);

        let (status, body) = send(&app.router, get("/ready")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["checks"][0]["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_queue_snapshot() {
        let app = test_app(working_detector());

        let (status, body) = send(&app.router, get("/queue")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepting"], true);
        assert_eq!(body["completed"], 0);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = test_app(working_detector());
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/process-images")
            .header(header::ORIGIN, "https://painel.example.org")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
