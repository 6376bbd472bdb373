use crate::db::Db;

/// Shared application state. `FromRef` lets handlers extract the store
/// directly as `State<Db>`.
#[derive(Debug, Clone, axum::extract::FromRef)]
pub struct AppState {
    pub db: Db,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}
