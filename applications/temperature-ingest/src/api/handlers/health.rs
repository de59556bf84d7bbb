/// Liveness text for the root path. Never touches the store.
pub async fn root() -> &'static str {
    "Temperature ingestion service running. Waiting for sensor readings..."
}

/// Health check endpoint handler
/// Returns "OK" with 200 status code
pub async fn health() -> &'static str {
    "OK"
}
