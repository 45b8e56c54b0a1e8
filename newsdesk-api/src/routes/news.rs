//! News endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info};

use newsdesk_core::NewsdeskError;
use newsdesk_services::{AggregateQuery, DEFAULT_LIMIT};

use crate::AppState;

/// Query parameters for listing news
#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    /// Search text (title, source, tags)
    pub query: Option<String>,
    /// Inclusive lower bound (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of results
    pub limit: Option<i64>,
    /// Annotate each item with its category
    #[serde(default)]
    pub classify: bool,
}

impl NewsQuery {
    fn to_aggregate_query(&self) -> AggregateQuery {
        AggregateQuery {
            query: self.query.clone(),
            date_from: self.from,
            date_to: self.to,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
        }
    }
}

/// Create news routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/news", get(get_news))
}

/// GET /api/news - aggregated items, newest first
async fn get_news(State(state): State<AppState>, Query(params): Query<NewsQuery>) -> Response {
    let query = params.to_aggregate_query();

    match state.aggregator.aggregate(&query).await {
        Ok(items) => {
            info!("Serving {} news items (classify: {})", items.len(), params.classify);
            if params.classify {
                Json(state.aggregator.classify(items)).into_response()
            } else {
                Json(items).into_response()
            }
        }
        Err(e) => error_response(e.into()),
    }
}

fn error_response(err: NewsdeskError) -> Response {
    let status = if err.is_caller_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!("News request failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(serde_json::json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use newsdesk_services::{Aggregator, AggregatorConfig};
    use newsdesk_sources::{HarvestConfig, Harvester, SourceRegistry};

    use super::*;

    fn app() -> Router {
        let registry = SourceRegistry::new(Vec::new()).unwrap();
        let aggregator = Aggregator::new(
            Arc::new(registry),
            Harvester::from_config(&HarvestConfig::default()),
            &AggregatorConfig::default(),
        );
        crate::app(AppState {
            aggregator: Arc::new(aggregator),
        })
    }

    async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_empty_registry_returns_empty_list() {
        let (status, body) = get("/api/news?classify=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_negative_limit_is_bad_request() {
        let (status, body) = get("/api/news?limit=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("limit"));
    }

    #[tokio::test]
    async fn test_inverted_window_is_bad_request() {
        let (status, _) =
            get("/api/news?from=2025-03-05T00:00:00Z&to=2025-03-01T00:00:00Z").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_side_errors_are_500() {
        let response = error_response(NewsdeskError::internal("cache unavailable"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = error_response(NewsdeskError::config("no sources"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_reports_source_count() {
        let (status, body) = get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sources"], 0);
    }
}
