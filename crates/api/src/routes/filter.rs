use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use qfilter_lang::parse_with_limits;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/filter", get(describe))
}

#[derive(Debug, Deserialize)]
struct FilterParams {
    filter: Option<String>,
}

/// Parse a filter and echo it back in canonical forms.
async fn describe(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> ApiResult<Json<Value>> {
    let text = params
        .filter
        .ok_or_else(|| ApiError::BadRequest("missing 'filter' query parameter".to_string()))?;
    let filter = parse_with_limits(&text, state.config().parse_limits)?;

    Ok(Json(json!({
        "compact": filter.compact_print(),
        "pretty": filter.pretty_print(),
        "condition": filter,
    })))
}
