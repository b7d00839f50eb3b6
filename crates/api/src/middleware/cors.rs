use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The service is read-only: any origin may issue GET requests.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
