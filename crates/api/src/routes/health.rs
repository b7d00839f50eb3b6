use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ping", get(ping))
}

/// Reports the loaded schema.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let entities: Vec<&str> = state.catalog().type_names().collect();
    Json(json!({
        "status": "ok",
        "entities": entities,
    }))
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::get_json;

    #[tokio::test]
    async fn health_lists_entities() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entities"], json!(["Department", "Employee", "Project"]));
    }

    #[tokio::test]
    async fn ping_is_ok() {
        let (status, body) = get_json("/v1/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }
}
