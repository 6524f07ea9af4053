pub mod aggregation;
pub mod alerts;
pub mod health;
pub mod ingestion;

pub use aggregation::AggregationEngine;
pub use alerts::AlertEngine;
pub use ingestion::IngestionService;
