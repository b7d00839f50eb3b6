pub mod filter;
pub mod health;
pub mod query;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(filter::routes())
        .merge(query::routes())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use qfilter_core::StaticCatalog;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::state::AppState;

    const COMPANY_SCHEMA: &str = include_str!("../../../../schema/company.json");

    pub fn router() -> Router {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let catalog = StaticCatalog::from_json(COMPANY_SCHEMA).unwrap();
        super::build_router(AppState::new(config, catalog))
    }

    /// GET `uri` and decode the JSON response.
    pub async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
