use crate::{config::Config, db::Database, storage::ObjectStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(db: Database, config: Config, store: Arc<dyn ObjectStore>) -> Self {
        Self { db, config, store }
    }
}
