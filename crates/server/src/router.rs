use axum::{
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use chrono::Utc;
use minestat_core::{runtime::ServiceContext, stats::MiningStatsRequest};
use std::{sync::Arc, time::Instant};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Builds the HTTP application.
///
/// `/getminingstats` sits behind the body size and concurrency limits; `/health` and
/// `/metrics` do not, so probes keep answering while stats requests queue up.
pub fn create_app(context: Arc<ServiceContext>) -> Router {
    let server_config = context.config().server.clone();

    let public = Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .with_state(context.clone());

    let stats = Router::new()
        .route("/getminingstats", get(handle_mining_stats).post(handle_mining_stats))
        .with_state(context)
        .layer(ConcurrencyLimitLayer::new(server_config.max_concurrent_requests))
        .layer(DefaultBodyLimit::max(server_config.request_body_limit_bytes));

    public.merge(stats).layer(TraceLayer::new_for_http())
}

/// Handles `/getminingstats`.
///
/// The body is decoded by hand so that a malformed request ends with a bare `400` and
/// no body. An unreadable or oversized body ends the same way with the rejection's
/// status. Any well-formed request gets a fully populated response, zero-filled when
/// no data is available.
pub async fn handle_mining_stats(
    State(context): State<Arc<ServiceContext>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                error = %rejection,
                status = %rejection.status(),
                "mining stats request body rejected"
            );
            return rejection.status().into_response();
        }
    };

    let request: MiningStatsRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "malformed mining stats request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let response = context.aggregator().mining_stats(&request, Utc::now()).await;
    context.metrics().record_stats_request(started.elapsed());

    Json(response).into_response()
}

pub async fn handle_metrics(State(context): State<Arc<ServiceContext>>) -> impl IntoResponse {
    context.metrics().record_cache_entries(context.cache().len());

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        context.metrics().render(),
    )
}

pub async fn handle_health(State(context): State<Arc<ServiceContext>>) -> impl IntoResponse {
    let report = context.health();

    let health_status = serde_json::json!({
        "status": if report.ready { "healthy" } else { "starting" },
        "cache": {
            "entries": report.cache_entries,
            "lowest_height": report.lowest_height,
            "highest_height": report.highest_height
        },
        "chain": {
            "node_height": report.node_height,
            "store_height": report.store_height,
            "network_hashrate": report.network_hashrate
        },
        "ingestion": {
            "degraded": report.degraded,
            "last_pass_age_seconds": report.last_ingest_age_seconds
        },
        "timestamp": Utc::now().to_rfc3339()
    });

    (
        if report.ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE },
        [("content-type", "application/json")],
        serde_json::to_string(&health_status).unwrap_or_default(),
    )
}
