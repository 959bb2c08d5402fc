use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;

use super::render;
use super::server::AppState;

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    experiments: usize,
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/chart.svg", get(chart_handler))
        .route("/api/report", get(report_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(render::page(&state.report))
}

async fn chart_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        render::chart(&state.report.info),
    )
}

async fn report_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.report.as_ref().clone())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        experiments: state.report.info.rows().len(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::table::{GridReport, InfoTable, ResultsTable};

    fn make_router() -> Router {
        let mut info = InfoTable::new(vec!["chunk_size".to_string()]);
        info.add_row("Experiment_1", vec!["500".to_string()]);
        info.set_timings("Experiment_1", 1.5, 0.25);
        let mut results = ResultsTable::new(vec!["q1".to_string()]);
        results
            .add_column("Experiment_1", vec!["a1".to_string()])
            .unwrap();

        build_router(AppState {
            report: Arc::new(GridReport { info, results }),
            started_at: Instant::now(),
        })
    }

    async fn get_body(uri: &str) -> (u16, Option<String>, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = make_router().oneshot(req).await.unwrap();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, body.to_vec())
    }

    #[tokio::test]
    async fn index_renders_tables() {
        let (status, content_type, body) = get_body("/").await;
        assert_eq!(status, 200);
        assert!(content_type.unwrap().starts_with("text/html"));
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("Experiment_1"));
        assert!(html.contains("a1"));
        assert!(html.contains("<svg"));
    }

    #[tokio::test]
    async fn chart_is_svg() {
        let (status, content_type, body) = get_body("/chart.svg").await;
        assert_eq!(status, 200);
        assert_eq!(content_type.as_deref(), Some("image/svg+xml"));
        assert!(String::from_utf8(body).unwrap().contains("1.50"));
    }

    #[tokio::test]
    async fn report_returns_json() {
        let (status, _, body) = get_body("/api/report").await;
        assert_eq!(status, 200);
        let report: GridReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.info.rows()[0].embedding_time, Some(0.25));
        assert_eq!(report.results.cell(0, 0), Some("a1"));
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (status, _, body) = get_body("/health").await;
        assert_eq!(status, 200);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["experiments"], 1);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _, _) = get_body("/missing").await;
        assert_eq!(status, 404);
    }
}
