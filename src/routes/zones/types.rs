use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ZoneResponse {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Null until a target is set
    pub daily_target_occupancy: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ZoneTargetRequest {
    /// Expected occupancy events per day
    pub daily_target_occupancy: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ZoneTargetResponse {
    pub zone_id: Uuid,
    pub zone_name: String,
    pub daily_target_occupancy: i32,
    pub updated_at: DateTime<Utc>,
}
