mod handlers;
mod types;

pub use handlers::{acknowledge_alert, get_alert, list_alerts};
pub use types::{AcknowledgeResponse, AlertResponse, AlertsQuery};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_acknowledge_alert, __path_get_alert, __path_list_alerts};
