use std::sync::Arc;

use qfilter_core::{FieldTransform, StaticCatalog};

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    config: AppConfig,
    catalog: StaticCatalog,
    field_transform: FieldTransform,
}

impl AppState {
    pub fn new(config: AppConfig, catalog: StaticCatalog) -> Self {
        let field_transform = config.field_naming.transform();
        Self {
            inner: Arc::new(InnerState {
                config,
                catalog,
                field_transform,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &StaticCatalog {
        &self.inner.catalog
    }

    pub fn field_transform(&self) -> FieldTransform {
        self.inner.field_transform.clone()
    }
}
