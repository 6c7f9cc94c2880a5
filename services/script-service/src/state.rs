use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::store::KvStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn KvStore>, config: ServiceConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
