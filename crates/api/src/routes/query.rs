use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use qfilter_core::{CompiledQuery, QueryCompiler};
use qfilter_lang::{parse_with_limits, Pagination, Sorting};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/query/{entity}", get(compile))
}

#[derive(Debug, Default, Deserialize)]
struct QueryParams {
    filter: Option<String>,
    sort: Option<String>,
    pagination: Option<String>,
}

/// Compile filter, sorting and pagination for `entity`. Nothing is executed.
async fn compile(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<CompiledQuery>> {
    let filter = params
        .filter
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .map(|text| parse_with_limits(text, state.config().parse_limits))
        .transpose()?;
    let sorting = params.sort.as_deref().map(Sorting::parse).transpose()?;
    let pagination = params
        .pagination
        .as_deref()
        .map(Pagination::parse)
        .transpose()?
        .unwrap_or_default();

    let compiled = QueryCompiler::new(entity, state.catalog())?
        .with_field_transform(state.field_transform())
        .with_options(state.config().compiler_options())
        .compile(filter.as_ref(), sorting.as_ref(), &pagination)?;

    tracing::info!(query = %compiled.query, "compiled request");
    Ok(Json(compiled))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::get_json;

    #[tokio::test]
    async fn compiles_filter_sort_and_page() {
        let (status, body) = get_json(
            "/v1/query/Employee?filter=is_part_time%24eq%3Atrue&sort=-salary&pagination=%24page%3A2%24size%3A5",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["query"],
            "SELECT em_0 FROM Employee em_0 WHERE em_0.isPartTime = :isPartTime_0 ORDER BY em_0.salary DESC"
        );
        assert_eq!(
            body["countQuery"],
            "SELECT COUNT(em_0) FROM Employee em_0 WHERE em_0.isPartTime = :isPartTime_0"
        );
        assert_eq!(
            body["parameters"]["isPartTime_0"],
            json!({ "type": "boolean", "value": true })
        );
        assert_eq!(body["offset"], 5);
        assert_eq!(body["limit"], 5);
    }

    #[tokio::test]
    async fn having_count() {
        let (status, body) =
            get_json("/v1/query/Department?filter=%24having%3ACOUNT(employees)%24gt%3A10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["whereClause"],
            "de_0.id IN (SELECT em_0.department.id FROM Employee em_0 \
             GROUP BY em_0.department.id HAVING COUNT(em_0.id) > 10)"
        );
    }

    #[tokio::test]
    async fn no_filter_selects_everything() {
        let (status, body) = get_json("/v1/query/Project").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "SELECT pr_0 FROM Project pr_0");
        assert_eq!(body["limit"], 20);
    }

    #[tokio::test]
    async fn unknown_entity_is_not_found() {
        let (status, body) = get_json("/v1/query/Invoice").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "notFound");
    }

    #[tokio::test]
    async fn compile_errors_are_bad_requests() {
        let (status, body) = get_json("/v1/query/Employee?filter=nickname%24eq%3ABob").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "compileError");

        let (status, body) = get_json("/v1/query/Employee?sort=-nickname").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "compileError");

        let (status, body) = get_json("/v1/query/Employee?pagination=%24page%3A0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalidPagination");
    }
}
