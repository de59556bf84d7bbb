use axum::{body::Bytes, extract::State, http::StatusCode, Json};

use crate::api::source_address::SourceAddress;
use crate::error::Result;
use crate::models::{Reading, SubmitResponse};
use crate::services::ReadingService;

/// POST /api/ingestar
/// The body is read raw so malformed JSON still gets a JSON error response.
pub async fn submit(
    State(service): State<ReadingService>,
    SourceAddress(source): SourceAddress,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let reading = service.submit(&body, source).await?;
    Ok((StatusCode::CREATED, Json(SubmitResponse::stored(&reading))))
}

/// GET /api/ingestar
/// Newest readings first, one page.
pub async fn list(State(service): State<ReadingService>) -> Result<Json<Vec<Reading>>> {
    let readings = service.list_recent().await?;
    Ok(Json(readings))
}
