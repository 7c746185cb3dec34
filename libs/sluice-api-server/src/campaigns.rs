use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::Serialize;

use sluice_query::{FilterSpec, QueryResult};

use crate::AppState;
use crate::error::ApiError;

// ═══════════════════════════════════════════════════════════════
//  REST: GET /campaigns?Location=US&...   (or a JSON body)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub(crate) struct CampaignsResponse {
    message: &'static str,
    #[serde(flatten)]
    result: QueryResult,
}

/// Filters come from the query string; a JSON object body may add to them
/// and wins on conflicting fields.
pub(crate) async fn handle_campaigns(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<CampaignsResponse>, ApiError> {
    let mut filters = FilterSpec::from_pairs(params);
    if !body.iter().all(u8::is_ascii_whitespace) {
        let from_body: FilterSpec = serde_json::from_slice(&body).map_err(ApiError::Filter)?;
        filters = filters.overlay(from_body);
    }

    let result = state.queries.execute(&filters).await?;
    Ok(Json(CampaignsResponse {
        message: "Campaigns retrieved successfully",
        result,
    }))
}
