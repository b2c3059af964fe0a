//! Stats routes — batched, jittered synthetic statistics.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use mockserve_core::Error;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::error_response;
use crate::state::AppState;

/// Records returned per stats request.
const RECORD_COUNT: usize = 5;

const METRICS: [&str; RECORD_COUNT] = [
    "Active users",
    "Page views",
    "Sessions",
    "Bounce rate",
    "Conversions",
];

/// One synthetic stats row.
#[derive(Debug, Clone, Serialize)]
pub struct StatRecord {
    pub id: u32,
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub metric: String,
    pub value: u32,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    #[serde(rename = "requestId")]
    request_id: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/stats/coordinator", get(get_coordinator_stats))
}

/// GET /stats?requestId= — waits for the request's batch to redispatch it,
/// then returns five synthetic records.
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    let token = query
        .request_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    match state
        .coordinator
        .submit_and_wait(token, state.config.stats_timeout())
        .await
    {
        Ok(token) => (
            StatusCode::OK,
            Json(serde_json::json!(generate_records(&token))),
        ),
        Err(Error::DuplicateWait(_)) => error_response(
            StatusCode::CONFLICT,
            "A stats request with this requestId is already pending",
        ),
        Err(Error::Timeout { .. }) => {
            error_response(StatusCode::GATEWAY_TIMEOUT, "Stats request timed out")
        }
        Err(e) => {
            error!("Stats request failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// GET /stats/coordinator — batching coordinator counters.
async fn get_coordinator_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.coordinator.stats()))
}

pub fn generate_records(request_id: &str) -> Vec<StatRecord> {
    let mut rng = rand::thread_rng();
    let generated_at = chrono::Utc::now().to_rfc3339();

    METRICS
        .iter()
        .zip(1..)
        .map(|(metric, id)| StatRecord {
            id,
            request_id: request_id.to_string(),
            metric: metric.to_string(),
            value: rng.gen_range(0..10_000),
            generated_at: generated_at.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use mockserve_core::{BatchSettings, MockServeConfig};
    use tokio::time::{Duration, Instant};

    fn fast_config() -> MockServeConfig {
        MockServeConfig {
            batch: BatchSettings {
                quiet_period_ms: 100,
                jitter_min_ms: 50,
                jitter_max_ms: 150,
            },
            ..MockServeConfig::default()
        }
    }

    #[test]
    fn test_generate_records() {
        let records = generate_records("req-1");
        assert_eq!(records.len(), RECORD_COUNT);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.id as usize, i + 1);
            assert_eq!(record.request_id, "req-1");
            assert!(record.value < 10_000);
        }
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(generate_records("req-42")).unwrap();
        let records = json.as_array().unwrap();
        assert_eq!(records.len(), RECORD_COUNT);

        for record in records {
            let fields = record.as_object().unwrap();
            assert_eq!(fields.len(), 5);
            assert!(record["id"].is_u64());
            assert_eq!(record["requestId"], "req-42");
            assert!(record["metric"].is_string());
            assert!(record["value"].is_u64());
            let generated_at = record["generatedAt"].as_str().unwrap();
            assert!(chrono::DateTime::parse_from_rfc3339(generated_at).is_ok());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_waits_for_batch() {
        let start = Instant::now();
        let response = send_get(app(fast_config()), "/stats?requestId=abc").await;
        let elapsed = Instant::now() - start;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed <= Duration::from_millis(260));

        let body = body_json(response).await;
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r["requestId"] == "abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_without_request_id() {
        let response = send_get(app(fast_config()), "/stats").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let request_id = body[0]["requestId"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(request_id).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_request_id_conflicts() {
        let app = app(fast_config());

        let first = tokio::spawn(send_get(app.clone(), "/stats?requestId=same"));
        tokio::time::sleep(Duration::from_millis(1)).await;

        let second = send_get(app, "/stats?requestId=same").await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(first.await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_timeout() {
        let config = MockServeConfig {
            stats_timeout_ms: Some(50),
            ..fast_config()
        };
        let response = send_get(app(config), "/stats?requestId=slow").await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinator_stats() {
        let app = app(fast_config());
        let response = send_get(app.clone(), "/stats?requestId=one").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(send_get(app, "/stats/coordinator").await).await;
        assert_eq!(body["phase"], "idle");
        assert_eq!(body["batchesClosed"], 1);
        assert_eq!(body["tokensRedispatched"], 1);
        assert_eq!(body["pendingWaits"], 0);
    }
}
