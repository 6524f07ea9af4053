use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub zone_id: Uuid,
    pub is_active: bool,
    pub installed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::zones::Entity",
        from = "Column::ZoneId",
        to = "super::zones::Column::Id"
    )]
    Zone,
    #[sea_orm(has_many = "super::telemetry_readings::Entity")]
    TelemetryReadings,
    #[sea_orm(has_many = "super::occupancy_events::Entity")]
    OccupancyEvents,
    #[sea_orm(has_many = "super::alerts::Entity")]
    Alerts,
}

impl Related<super::zones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Zone.def()
    }
}

impl Related<super::telemetry_readings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TelemetryReadings.def()
    }
}

impl Related<super::occupancy_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OccupancyEvents.def()
    }
}

impl Related<super::alerts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
