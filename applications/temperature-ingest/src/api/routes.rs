use crate::api::handlers::{health, readings};
use crate::services::ReadingService;
use axum::{extract::Request, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

pub const INGEST_PATH: &str = "/api/ingestar";

pub fn create_router(service: ReadingService) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request| {
            tracing::info_span!(
                "ingest",
                method = %request.method(),
                path = %request.uri().path(),
            )
        })
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(DefaultOnFailure::new().level(Level::ERROR));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route(INGEST_PATH, get(readings::list).post(readings::submit))
        .with_state(service)
        .layer(CorsLayer::permissive())
        .layer(trace)
}
