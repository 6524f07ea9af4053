use std::sync::Arc;

use crate::common::Clock;
use crate::config::Config;
use crate::services::{AggregationEngine, AlertEngine, IngestionService};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
    pub ingestion: IngestionService,
    pub alerts: AlertEngine,
    pub aggregation: AggregationEngine,
}

impl AppState {
    /// Wire the services over one store and clock. Any [`Store`] works, so the
    /// same state drives PostgreSQL in production and memory in tests.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: Config) -> Self {
        let alerts = AlertEngine::new(Arc::clone(&store), Arc::clone(&clock));
        let ingestion =
            IngestionService::new(Arc::clone(&store), Arc::clone(&clock), alerts.clone());
        let aggregation =
            AggregationEngine::new(Arc::clone(&store), Arc::clone(&clock), config.time_zone);

        Self {
            store,
            clock,
            config: Arc::new(config),
            ingestion,
            alerts,
            aggregation,
        }
    }
}
