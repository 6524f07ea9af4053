use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== FACILITIES ==========
        manager
            .create_table(
                Table::create()
                    .table(Facilities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Facilities::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(Facilities::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Facilities::Location).string_len(200))
                    .to_owned(),
            )
            .await?;

        // ========== ZONES ==========
        manager
            .create_table(
                Table::create()
                    .table(Zones::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Zones::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(Zones::FacilityId).uuid().not_null())
                    .col(ColumnDef::new(Zones::Name).string_len(50).not_null())
                    .col(ColumnDef::new(Zones::Description).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_zones_facility")
                            .from(Zones::Table, Zones::FacilityId)
                            .to(Facilities::Table, Facilities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Zone lookup by name is case-insensitive
        manager
            .get_connection()
            .execute_unprepared("CREATE INDEX zones_name_lower_idx ON zones (LOWER(name))")
            .await?;

        // ========== DEVICES ==========
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(
                        ColumnDef::new(Devices::Code)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Devices::ZoneId).uuid().not_null())
                    .col(
                        ColumnDef::new(Devices::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Devices::InstalledAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT NOW()"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_devices_zone")
                            .from(Devices::Table, Devices::ZoneId)
                            .to(Zones::Table, Zones::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_devices_zone")
                    .table(Devices::Table)
                    .col(Devices::ZoneId)
                    .to_owned(),
            )
            .await?;

        // ========== TELEMETRY READINGS ==========
        manager
            .create_table(
                Table::create()
                    .table(TelemetryReadings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TelemetryReadings::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(TelemetryReadings::DeviceId).uuid().not_null())
                    .col(ColumnDef::new(TelemetryReadings::Voltage).double().not_null())
                    .col(ColumnDef::new(TelemetryReadings::Current).double().not_null())
                    .col(
                        ColumnDef::new(TelemetryReadings::PowerFactor)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TelemetryReadings::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TelemetryReadings::ReceivedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT NOW()"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_telemetry_device")
                            .from(TelemetryReadings::Table, TelemetryReadings::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One reading per (device, timestamp); also serves latest-per-device lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_telemetry_device_timestamp")
                    .table(TelemetryReadings::Table)
                    .col(TelemetryReadings::DeviceId)
                    .col(TelemetryReadings::Timestamp)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ========== OCCUPANCY EVENTS ==========
        manager
            .create_table(
                Table::create()
                    .table(OccupancyEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OccupancyEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(OccupancyEvents::DeviceId).uuid().not_null())
                    .col(
                        ColumnDef::new(OccupancyEvents::IsOccupied)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OccupancyEvents::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OccupancyEvents::ReceivedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT NOW()"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_occupancy_device")
                            .from(OccupancyEvents::Table, OccupancyEvents::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX idx_occupancy_device_time ON occupancy_events (device_id, timestamp DESC)",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_occupancy_time")
                    .table(OccupancyEvents::Table)
                    .col(OccupancyEvents::Timestamp)
                    .to_owned(),
            )
            .await?;

        // ========== ALERTS ==========
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alerts::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(Alerts::DeviceId).uuid())
                    .col(ColumnDef::new(Alerts::Severity).string_len(10).not_null())
                    .col(
                        ColumnDef::new(Alerts::RuleCategory)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alerts::Message).text().not_null())
                    .col(
                        ColumnDef::new(Alerts::IsAcknowledged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT NOW()"),
                    )
                    .col(ColumnDef::new(Alerts::ResolvedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alerts_device")
                            .from(Alerts::Table, Alerts::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE alerts ADD CONSTRAINT alerts_severity_check \
                 CHECK (severity IN ('INFO', 'WARNING', 'CRITICAL'))",
            )
            .await?;

        // At most one open alert per (device, severity, rule); NULL device counts as one key
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX alerts_open_dedup_idx \
                 ON alerts (device_id, severity, rule_category) NULLS NOT DISTINCT \
                 WHERE resolved_at IS NULL",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("CREATE INDEX idx_alerts_created_at ON alerts (created_at DESC)")
            .await?;

        // ========== ZONE TARGETS ==========
        manager
            .create_table(
                Table::create()
                    .table(ZoneTargets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ZoneTargets::ZoneId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ZoneTargets::DailyTargetOccupancy)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ZoneTargets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT NOW()"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_zone_targets_zone")
                            .from(ZoneTargets::Table, ZoneTargets::ZoneId)
                            .to(Zones::Table, Zones::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ZoneTargets::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alerts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(OccupancyEvents::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(TelemetryReadings::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Devices::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Zones::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Facilities::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Facilities {
    Table,
    Id,
    Name,
    Location,
}

#[derive(DeriveIden)]
enum Zones {
    Table,
    Id,
    FacilityId,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum Devices {
    Table,
    Id,
    Code,
    ZoneId,
    IsActive,
    InstalledAt,
}

#[derive(DeriveIden)]
enum TelemetryReadings {
    Table,
    Id,
    DeviceId,
    Voltage,
    Current,
    PowerFactor,
    Timestamp,
    ReceivedAt,
}

#[derive(DeriveIden)]
enum OccupancyEvents {
    Table,
    Id,
    DeviceId,
    IsOccupied,
    Timestamp,
    ReceivedAt,
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    DeviceId,
    Severity,
    RuleCategory,
    Message,
    IsAcknowledged,
    CreatedAt,
    ResolvedAt,
}

#[derive(DeriveIden)]
enum ZoneTargets {
    Table,
    ZoneId,
    DailyTargetOccupancy,
    UpdatedAt,
}
