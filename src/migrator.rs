use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_stock_tables::Migration),
            Box::new(m20240101_000003_create_transfer_tables::Migration),
            Box::new(m20240101_000004_create_adjustment_tables::Migration),
            Box::new(m20240101_000005_create_loan_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Warehouses::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Warehouses::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Warehouses::Name).string_len(128).not_null())
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
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
                        .name("uq_warehouses_company_name")
                        .table(Warehouses::Table)
                        .col(Warehouses::CompanyId)
                        .col(Warehouses::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Products::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Products::TotalStock)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::PiecesPerPack)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Products::CostPrice)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Warehouses {
        Table,
        Id,
        CompanyId,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Id,
        CompanyId,
        Name,
        TotalStock,
        PiecesPerPack,
        CostPrice,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_stock_tables {
    use super::m20240101_000001_create_catalog_tables::{Products, Warehouses};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stocks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Stocks::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Stocks::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Stocks::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Stocks::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Stocks::BatchNumber).string_len(64).not_null())
                        .col(
                            ColumnDef::new(Stocks::AvailableQuantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Stocks::CommittedQuantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Stocks::CostPrice)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Stocks::InitialQuantity).decimal_len(16, 4).null())
                        .col(
                            ColumnDef::new(Stocks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Stocks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stocks_product")
                                .from(Stocks::Table, Stocks::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stocks_warehouse")
                                .from(Stocks::Table, Stocks::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_stocks_company_batch_number")
                        .table(Stocks::Table)
                        .col(Stocks::CompanyId)
                        .col(Stocks::BatchNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stocks_fifo")
                        .table(Stocks::Table)
                        .col(Stocks::ProductId)
                        .col(Stocks::WarehouseId)
                        .col(Stocks::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BatchLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BatchLogs::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(BatchLogs::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(BatchLogs::StockId).big_integer().not_null())
                        .col(ColumnDef::new(BatchLogs::ProductId).uuid().not_null())
                        .col(ColumnDef::new(BatchLogs::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(BatchLogs::Quantity).decimal_len(16, 4).not_null())
                        .col(
                            ColumnDef::new(BatchLogs::SellingPrice)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BatchLogs::CostPricePiece)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BatchLogs::CostPricePack)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(BatchLogs::UnitCost).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(BatchLogs::Unit).string_len(8).not_null())
                        .col(ColumnDef::new(BatchLogs::ReferenceType).string_len(16).not_null())
                        .col(ColumnDef::new(BatchLogs::ReferenceId).uuid().not_null())
                        .col(ColumnDef::new(BatchLogs::CounterpartType).string_len(16).null())
                        .col(ColumnDef::new(BatchLogs::CounterpartId).uuid().null())
                        .col(ColumnDef::new(BatchLogs::Status).string_len(16).null())
                        .col(
                            ColumnDef::new(BatchLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batch_logs_stock")
                                .from(BatchLogs::Table, BatchLogs::StockId)
                                .to(Stocks::Table, Stocks::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_logs_reference")
                        .table(BatchLogs::Table)
                        .col(BatchLogs::ReferenceType)
                        .col(BatchLogs::ReferenceId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BatchSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BatchSequences::CompanyId)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(BatchSequences::LastValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BatchSequences::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BatchSequences::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BatchLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Stocks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Stocks {
        Table,
        Id,
        CompanyId,
        ProductId,
        WarehouseId,
        BatchNumber,
        AvailableQuantity,
        CommittedQuantity,
        CostPrice,
        InitialQuantity,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum BatchLogs {
        Table,
        Id,
        CompanyId,
        StockId,
        ProductId,
        WarehouseId,
        Quantity,
        SellingPrice,
        CostPricePiece,
        CostPricePack,
        UnitCost,
        Unit,
        ReferenceType,
        ReferenceId,
        CounterpartType,
        CounterpartId,
        Status,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum BatchSequences {
        Table,
        CompanyId,
        LastValue,
        UpdatedAt,
    }
}

mod m20240101_000003_create_transfer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_transfer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransferRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferRequests::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(TransferRequests::CompanyId).uuid().not_null())
                        .col(
                            ColumnDef::new(TransferRequests::RequestNumber)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequests::SendingWarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequests::ReceivingWarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequests::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferRequests::RequestedBy).uuid().not_null())
                        .col(ColumnDef::new(TransferRequests::ApprovedBy).uuid().null())
                        .col(ColumnDef::new(TransferRequests::Note).text().null())
                        .col(
                            ColumnDef::new(TransferRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequests::UpdatedAt)
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
                        .name("uq_transfer_requests_company_number")
                        .table(TransferRequests::Table)
                        .col(TransferRequests::CompanyId)
                        .col(TransferRequests::RequestNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferRequestItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferRequestItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(TransferRequestItems::TransferRequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequestItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequestItems::SendingStockId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequestItems::QuantityTransferred)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequestItems::QuantityReceived)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequestItems::CostPrice)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferRequestItems::ReceivedStockId)
                                .big_integer()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transfer_items_request")
                                .from(
                                    TransferRequestItems::Table,
                                    TransferRequestItems::TransferRequestId,
                                )
                                .to(TransferRequests::Table, TransferRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferRequestItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TransferRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum TransferRequests {
        Table,
        Id,
        CompanyId,
        RequestNumber,
        SendingWarehouseId,
        ReceivingWarehouseId,
        Status,
        RequestedBy,
        ApprovedBy,
        Note,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum TransferRequestItems {
        Table,
        Id,
        TransferRequestId,
        ProductId,
        SendingStockId,
        QuantityTransferred,
        QuantityReceived,
        CostPrice,
        ReceivedStockId,
    }
}

mod m20240101_000004_create_adjustment_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_adjustment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryAdjustments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryAdjustments::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::CompanyId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::AdjustmentType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryAdjustments::Reason).text().null())
                        .col(
                            ColumnDef::new(InventoryAdjustments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryAdjustmentLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::AdjustmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::StockId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::PreviousQuantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::NewQuantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::Delta)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::ChangeType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::PreviousValue)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustmentLines::NewValue)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_adjustment_lines_adjustment")
                                .from(
                                    InventoryAdjustmentLines::Table,
                                    InventoryAdjustmentLines::AdjustmentId,
                                )
                                .to(InventoryAdjustments::Table, InventoryAdjustments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(
                    Table::drop()
                        .table(InventoryAdjustmentLines::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryAdjustments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryAdjustments {
        Table,
        Id,
        CompanyId,
        WarehouseId,
        AdjustmentType,
        CreatedBy,
        Reason,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryAdjustmentLines {
        Table,
        Id,
        AdjustmentId,
        StockId,
        ProductId,
        PreviousQuantity,
        NewQuantity,
        Delta,
        ChangeType,
        PreviousValue,
        NewValue,
    }
}

mod m20240101_000005_create_loan_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_loan_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LoanRequests::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(LoanRequests::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(LoanRequests::CompanyId).uuid().not_null())
                        .col(
                            ColumnDef::new(LoanRequests::RequestNumber)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(LoanRequests::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(LoanRequests::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(LoanRequests::Status).string_len(16).not_null())
                        .col(ColumnDef::new(LoanRequests::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(LoanRequests::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(LoanRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoanRequests::UpdatedAt)
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
                        .name("uq_loan_requests_company_number")
                        .table(LoanRequests::Table)
                        .col(LoanRequests::CompanyId)
                        .col(LoanRequests::RequestNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LoanRequestItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LoanRequestItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(LoanRequestItems::LoanRequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LoanRequestItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(LoanRequestItems::Unit).string_len(8).not_null())
                        .col(
                            ColumnDef::new(LoanRequestItems::QuantityTransferred)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoanRequestItems::QuantityReturned)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LoanRequestItems::QuantityRemainingToReturn)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoanRequestItems::BalanceQuantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoanRequestItems::Amount)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_loan_items_request")
                                .from(LoanRequestItems::Table, LoanRequestItems::LoanRequestId)
                                .to(LoanRequests::Table, LoanRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LoanReturns::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(LoanReturns::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(LoanReturns::LoanRequestId).uuid().not_null())
                        .col(ColumnDef::new(LoanReturns::Note).text().null())
                        .col(ColumnDef::new(LoanReturns::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(LoanReturns::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_loan_returns_request")
                                .from(LoanReturns::Table, LoanReturns::LoanRequestId)
                                .to(LoanRequests::Table, LoanRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LoanReturnLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LoanReturnLines::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(LoanReturnLines::LoanReturnId).uuid().not_null())
                        .col(
                            ColumnDef::new(LoanReturnLines::LoanRequestItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LoanReturnLines::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(LoanReturnLines::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoanReturnLines::QuantityTransferred)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoanReturnLines::QuantityReturned)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoanReturnLines::QuantityRemainingToReturn)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoanReturnLines::BalanceQuantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_loan_return_lines_return")
                                .from(LoanReturnLines::Table, LoanReturnLines::LoanReturnId)
                                .to(LoanReturns::Table, LoanReturns::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LoanReturnLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LoanReturns::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LoanRequestItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LoanRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LoanRequests {
        Table,
        Id,
        CompanyId,
        RequestNumber,
        CustomerId,
        WarehouseId,
        Status,
        CreatedBy,
        ApprovedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum LoanRequestItems {
        Table,
        Id,
        LoanRequestId,
        ProductId,
        Unit,
        QuantityTransferred,
        QuantityReturned,
        QuantityRemainingToReturn,
        BalanceQuantity,
        Amount,
    }

    #[derive(DeriveIden)]
    enum LoanReturns {
        Table,
        Id,
        LoanRequestId,
        Note,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum LoanReturnLines {
        Table,
        Id,
        LoanReturnId,
        LoanRequestItemId,
        ProductId,
        Quantity,
        QuantityTransferred,
        QuantityReturned,
        QuantityRemainingToReturn,
        BalanceQuantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, Database};

    #[tokio::test]
    async fn schema_applies_on_sqlite() {
        // Each pooled connection would open its own in-memory database.
        let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
        opt.max_connections(1).min_connections(1);
        let db = Database::connect(opt)
            .await
            .expect("connect to sqlite");

        Migrator::up(&db, None).await.expect("migrations apply");
        let applied = Migrator::get_applied_migrations(&db)
            .await
            .expect("read migration table");
        assert_eq!(applied.len(), Migrator::migrations().len());

        // Already applied: a second run is a no-op.
        Migrator::up(&db, None).await.expect("re-run is a no-op");
    }
}
