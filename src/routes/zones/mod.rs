mod handlers;
mod types;

pub use handlers::{list_zones, set_zone_target};
pub use types::{ZoneResponse, ZoneTargetRequest, ZoneTargetResponse};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_list_zones, __path_set_zone_target};
