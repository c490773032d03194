use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_shipments_table::Migration),
            Box::new(m20240101_000002_create_shipment_history_table::Migration),
            Box::new(m20240101_000003_create_carriers_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_shipments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_shipments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create shipments table aligned with entities::shipment Model
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Shipments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::ShipmentNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::InvoiceNumber).string().not_null())
                        .col(ColumnDef::new(Shipments::ClientName).string().not_null())
                        .col(ColumnDef::new(Shipments::CarrierName).string().null())
                        .col(ColumnDef::new(Shipments::Status).text().not_null())
                        .col(ColumnDef::new(Shipments::LoadingType).text().null())
                        .col(
                            ColumnDef::new(Shipments::ScheduledDeliveryAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::ScheduledLoadingAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::LoadedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::DispatchedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::LabelCreated)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Shipments::LabelCreatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::LabelReceived)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Shipments::LabelReceivedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Shipments::Notes).string().null())
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Useful indexes
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_status")
                        .table(Shipments::Table)
                        .col(Shipments::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_created_at")
                        .table(Shipments::Table)
                        .col(Shipments::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_shipment_number")
                        .table(Shipments::Table)
                        .col(Shipments::ShipmentNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_carrier_name")
                        .table(Shipments::Table)
                        .col(Shipments::CarrierName)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Shipments {
        Table,
        Id,
        ShipmentNumber,
        InvoiceNumber,
        ClientName,
        CarrierName,
        Status,
        LoadingType,
        ScheduledDeliveryAt,
        ScheduledLoadingAt,
        LoadedAt,
        DispatchedAt,
        LabelCreated,
        LabelCreatedAt,
        LabelReceived,
        LabelReceivedAt,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_shipment_history_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000001_create_shipments_table::Shipments;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_shipment_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create shipment_history table aligned with entities::shipment_history Model
            manager
                .create_table(
                    Table::create()
                        .table(ShipmentHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShipmentHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShipmentHistory::ShipmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShipmentHistory::Status).string().not_null())
                        .col(
                            ColumnDef::new(ShipmentHistory::Description)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShipmentHistory::Actor).string().not_null())
                        .col(
                            ColumnDef::new(ShipmentHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipment_history_shipment_id")
                                .from(ShipmentHistory::Table, ShipmentHistory::ShipmentId)
                                .to(Shipments::Table, Shipments::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_history_shipment_id")
                        .table(ShipmentHistory::Table)
                        .col(ShipmentHistory::ShipmentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_history_created_at")
                        .table(ShipmentHistory::Table)
                        .col(ShipmentHistory::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShipmentHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ShipmentHistory {
        Table,
        Id,
        ShipmentId,
        Status,
        Description,
        Actor,
        CreatedAt,
    }
}

mod m20240101_000003_create_carriers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_carriers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create carriers table aligned with entities::carrier Model
            manager
                .create_table(
                    Table::create()
                        .table(Carriers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Carriers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Carriers::Name).string().not_null())
                        .col(ColumnDef::new(Carriers::TaxId).string().not_null())
                        .col(ColumnDef::new(Carriers::Email).string().not_null())
                        .col(ColumnDef::new(Carriers::Phone).string().null())
                        .col(
                            ColumnDef::new(Carriers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_carriers_name")
                        .table(Carriers::Table)
                        .col(Carriers::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Carriers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Carriers {
        Table,
        Id,
        Name,
        TaxId,
        Email,
        Phone,
        CreatedAt,
    }
}
