//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - question endpoints under `/api/v1/questions`
/// - progress endpoints under `/api/v1/progress` (caller from `X-User-Id`)
/// - administrative batch/migration triggers under `/api/v1/admin`
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/categories", get(http::http_get_categories))
        .route("/api/v1/questions", get(http::http_list_questions))
        .route("/api/v1/questions/generate", post(http::http_post_generate_question))
        .route("/api/v1/questions/:id", get(http::http_get_question))
        .route("/api/v1/progress", get(http::http_get_progress))
        .route("/api/v1/progress/complete", post(http::http_post_complete))
        .route("/api/v1/progress/toggle", post(http::http_post_toggle))
        .route("/api/v1/admin/generate_daily", post(http::http_post_generate_daily))
        .route("/api/v1/admin/backfill_dates", post(http::http_post_backfill_dates))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::USER_ID_HEADER;
    use crate::config::AppConfig;
    use crate::domain::QUESTIONS_COLLECTION;
    use crate::generator::TextGenerator;
    use crate::store::{DocumentStore, MemoryStore};
    use crate::testing::{DownStore, ScriptedGenerator};

    fn state_with(store: Arc<dyn DocumentStore>, gen: Option<Arc<ScriptedGenerator>>) -> AppState {
        let cfg = AppConfig {
            categories: vec!["IT".into(), "Health".into()],
            levels: vec![1],
            ..Default::default()
        };
        AppState::new(store, gen.map(|g| g as Arc<dyn TextGenerator>), cfg)
    }

    fn post(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::post(uri).header("content-type", "application/json");
        if let Some(u) = user {
            req = req.header(USER_ID_HEADER, u);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn generate_then_cache_over_http() {
        let store = Arc::new(MemoryStore::new());
        let gen = Arc::new(ScriptedGenerator::new([r#"{"prompt":"Q1","explanation":"E1"}"#]));
        let app = build_router(state_with(store.clone(), Some(gen.clone())));

        for _ in 0..2 {
            let res = app
                .clone()
                .oneshot(post("/api/v1/questions/generate", None, json!({"category": "IT", "level": 1})))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(json_body(res).await, json!({"prompt": "Q1", "explanation": "E1"}));
        }
        assert_eq!(gen.calls(), 1);
        assert_eq!(store.list_ids(QUESTIONS_COLLECTION).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn parse_failure_returns_error_payload() {
        let gen = Arc::new(ScriptedGenerator::new(["not json"]));
        let app = build_router(state_with(Arc::new(MemoryStore::new()), Some(gen)));

        let res = app
            .oneshot(post("/api/v1/questions/generate", None, json!({"category": "IT", "level": 1})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(res).await;
        assert!(body["error"].as_str().unwrap().starts_with("generation parse error"));
    }

    #[tokio::test]
    async fn level_zero_is_rejected() {
        let app = build_router(state_with(Arc::new(MemoryStore::new()), None));
        let res = app
            .oneshot(post("/api/v1/questions/generate", None, json!({"category": "IT", "level": 0})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_request_json() {
        let store = Arc::new(MemoryStore::new());
        let gen = Arc::new(ScriptedGenerator::new([r#"{"prompt":"Q","explanation":"E"}"#]));
        let app = build_router(state_with(store.clone(), Some(gen.clone())));

        let cases = [
            ("/api/v1/questions/generate", json!({"category": "IT"})),
            ("/api/v1/questions/generate", json!({"category": "IT", "level": -1})),
            ("/api/v1/questions/generate", json!({"category": "IT", "level": "1"})),
            ("/api/v1/progress/complete", json!({"level": 1})),
            ("/api/v1/progress/toggle", json!({"category": "IT", "level": 1.5})),
        ];
        for (uri, body) in cases {
            let res = app.clone().oneshot(post(uri, Some("u1"), body)).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                res.headers()["content-type"].to_str().unwrap(),
                "application/json",
                "{uri}"
            );
            let error = json_body(res).await["error"].as_str().unwrap().to_string();
            assert!(error.starts_with("bad request: "), "{uri}: {error}");
        }

        let res = app
            .oneshot(
                Request::post("/api/v1/questions/generate")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(res).await["error"].is_string());

        assert_eq!(gen.calls(), 0);
        assert!(store.list_ids(crate::domain::PROGRESS_COLLECTION).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_content_type_is_bad_request_json() {
        let app = build_router(state_with(Arc::new(MemoryStore::new()), None));
        let res = app
            .oneshot(
                Request::post("/api/v1/progress/complete")
                    .body(Body::from(r#"{"category":"IT","level":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(res).await["error"].is_string());
    }

    #[tokio::test]
    async fn store_outage_is_service_unavailable() {
        let app = build_router(state_with(Arc::new(DownStore), None));
        let res = app
            .oneshot(Request::get("/api/v1/questions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(json_body(res).await["error"].is_string());
    }

    #[tokio::test]
    async fn completion_and_toggle_flow() {
        let app = build_router(state_with(Arc::new(MemoryStore::new()), None));

        let res = app
            .clone()
            .oneshot(post("/api/v1/progress/complete", Some("u1"), json!({"category": "IT", "level": 1})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["streakCount"], 1);
        assert!(body["lastCompleted"].is_string());

        let res = app
            .clone()
            .oneshot(post("/api/v1/progress/toggle", Some("u1"), json!({"category": "IT"})))
            .await
            .unwrap();
        assert_eq!(json_body(res).await, json!({"completed": true}));

        let res = app
            .oneshot(
                Request::get("/api/v1/progress")
                    .header(USER_ID_HEADER, "u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["streakCount"], 1);
        assert_eq!(body["completedCategories"]["IT"], true);
        assert_eq!(body["completedLevels"]["IT"]["1"], true);
    }

    #[tokio::test]
    async fn anonymous_progress_calls_are_no_ops() {
        let store = Arc::new(MemoryStore::new());
        let app = build_router(state_with(store.clone(), None));

        let res = app
            .clone()
            .oneshot(post("/api/v1/progress/complete", None, json!({"category": "IT", "level": 1})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = app
            .oneshot(post("/api/v1/progress/toggle", None, json!({"category": "IT", "level": 2})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(store.list_ids(crate::domain::PROGRESS_COLLECTION).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reading_progress_requires_a_caller() {
        let app = build_router(state_with(Arc::new(MemoryStore::new()), None));
        let res = app
            .oneshot(Request::get("/api/v1/progress").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await, json!({"error": "unauthenticated"}));
    }

    #[tokio::test]
    async fn admin_batch_and_question_lookup() {
        let store = Arc::new(MemoryStore::new());
        let gen = Arc::new(ScriptedGenerator::new([r#"{"prompt":"Q","explanation":"E"}"#]));
        let app = build_router(state_with(store, Some(gen)));

        let res = app
            .clone()
            .oneshot(post("/api/v1/admin/generate_daily", None, json!({})))
            .await
            .unwrap();
        let report = json_body(res).await;
        assert_eq!(report["created"], 2);
        assert_eq!(report["skipped"], 0);

        let res = app
            .clone()
            .oneshot(Request::get("/api/v1/questions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let ids = json_body(res).await["ids"].as_array().unwrap().clone();
        assert_eq!(ids.len(), 2);

        let id = ids[0].as_str().unwrap();
        let res = app
            .clone()
            .oneshot(Request::get(format!("/api/v1/questions/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["id"], id);
        assert_eq!(body["prompt"], "Q");

        let res = app
            .oneshot(post("/api/v1/admin/backfill_dates", None, json!({})))
            .await
            .unwrap();
        assert_eq!(json_body(res).await, json!({"updated": 2}));
    }

    #[tokio::test]
    async fn categories_report_level_counts() {
        let app = build_router(state_with(Arc::new(MemoryStore::new()), None));
        let res = app
            .oneshot(Request::get("/api/v1/categories").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["categories"][0], json!({"name": "IT", "maxLevels": 30}));
    }
}
