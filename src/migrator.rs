use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_tenants_table::Migration),
            Box::new(m20240101_000002_create_inventory_tables::Migration),
            Box::new(m20240101_000003_create_rule_tables::Migration),
            Box::new(m20240101_000004_create_scheduling_tables::Migration),
            Box::new(m20240101_000005_create_commerce_tables::Migration),
            Box::new(m20240101_000006_create_sync_and_audit_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_tenants_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_tenants_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tenants::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tenants::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tenants::Name).string().not_null())
                        .col(
                            ColumnDef::new(Tenants::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Tenants::TaxEnabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Tenants::TaxRate)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Tenants::TaxLabel)
                                .string()
                                .not_null()
                                .default("Tax"),
                        )
                        .col(
                            ColumnDef::new(Tenants::LowStockThreshold)
                                .integer()
                                .not_null()
                                .default(10),
                        )
                        .col(
                            ColumnDef::new(Tenants::AllowOutOfStockSales)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Tenants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tenants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tenants::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Tenants {
        Table,
        Id,
        Name,
        IsActive,
        TaxEnabled,
        TaxRate,
        TaxLabel,
        LowStockThreshold,
        AllowOutOfStockSales,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::CategoryId).uuid().null())
                        .col(
                            ColumnDef::new(Products::IsService)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Products::BasePrice).decimal().not_null())
                        .col(ColumnDef::new(Products::Price).decimal().not_null())
                        .col(
                            ColumnDef::new(Products::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::TrackInventory)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::ReorderPoint).integer().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::NeedsSync)
                                .boolean()
                                .not_null()
                                .default(false),
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
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_tenant_id")
                        .table(Products::Table)
                        .col(Products::TenantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BranchStock::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BranchStock::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BranchStock::TenantId).uuid().not_null())
                        .col(ColumnDef::new(BranchStock::ProductId).uuid().not_null())
                        .col(ColumnDef::new(BranchStock::BranchId).uuid().not_null())
                        .col(
                            ColumnDef::new(BranchStock::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BranchStock::UpdatedAt)
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
                        .name("idx_branch_stock_product_branch")
                        .table(BranchStock::Table)
                        .col(BranchStock::ProductId)
                        .col(BranchStock::BranchId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::BranchId).uuid().null())
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(StockMovements::PreviousStock)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::NewStock)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::TransactionId).uuid().null())
                        .col(ColumnDef::new(StockMovements::UserId).uuid().null())
                        .col(ColumnDef::new(StockMovements::Reason).string().null())
                        .col(ColumnDef::new(StockMovements::Notes).string().null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
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
                        .name("idx_stock_movements_product_created")
                        .table(StockMovements::Table)
                        .col(StockMovements::ProductId)
                        .col(StockMovements::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BranchStock::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        TenantId,
        Name,
        Sku,
        CategoryId,
        IsService,
        BasePrice,
        Price,
        Stock,
        TrackInventory,
        ReorderPoint,
        IsActive,
        NeedsSync,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum BranchStock {
        Table,
        Id,
        TenantId,
        ProductId,
        BranchId,
        Stock,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        TenantId,
        ProductId,
        BranchId,
        MovementType,
        Quantity,
        PreviousStock,
        NewStock,
        TransactionId,
        UserId,
        Reason,
        Notes,
        CreatedAt,
    }
}

mod m20240101_000003_create_rule_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_rule_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DiscountRules::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DiscountRules::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DiscountRules::TenantId).uuid().not_null())
                        .col(ColumnDef::new(DiscountRules::Code).string().not_null())
                        .col(
                            ColumnDef::new(DiscountRules::DiscountType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DiscountRules::Value).decimal().not_null())
                        .col(
                            ColumnDef::new(DiscountRules::MinPurchaseAmount)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DiscountRules::MaxDiscountAmount)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(DiscountRules::UsageLimit).integer().null())
                        .col(
                            ColumnDef::new(DiscountRules::UsageCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DiscountRules::ValidFrom)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiscountRules::ValidUntil)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiscountRules::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(DiscountRules::NeedsSync)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(DiscountRules::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiscountRules::UpdatedAt)
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
                        .name("idx_discount_rules_tenant_code")
                        .table(DiscountRules::Table)
                        .col(DiscountRules::TenantId)
                        .col(DiscountRules::Code)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TaxRules::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TaxRules::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TaxRules::TenantId).uuid().not_null())
                        .col(ColumnDef::new(TaxRules::Rate).decimal().not_null())
                        .col(ColumnDef::new(TaxRules::Label).string().not_null())
                        .col(ColumnDef::new(TaxRules::AppliesTo).string().not_null())
                        .col(ColumnDef::new(TaxRules::CategoryIds).json().not_null())
                        .col(ColumnDef::new(TaxRules::ProductIds).json().not_null())
                        .col(
                            ColumnDef::new(TaxRules::Priority)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TaxRules::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(TaxRules::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TaxRules::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DiscountRules::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DiscountRules {
        Table,
        Id,
        TenantId,
        Code,
        DiscountType,
        Value,
        MinPurchaseAmount,
        MaxDiscountAmount,
        UsageLimit,
        UsageCount,
        ValidFrom,
        ValidUntil,
        IsActive,
        NeedsSync,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum TaxRules {
        Table,
        Id,
        TenantId,
        Rate,
        Label,
        AppliesTo,
        CategoryIds,
        ProductIds,
        Priority,
        IsActive,
        CreatedAt,
    }
}

mod m20240101_000004_create_scheduling_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_scheduling_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Bookings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Bookings::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Bookings::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Bookings::CustomerId).uuid().null())
                        .col(ColumnDef::new(Bookings::ServiceName).string().not_null())
                        .col(
                            ColumnDef::new(Bookings::StartTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Bookings::Status).string().not_null())
                        .col(
                            ColumnDef::new(Bookings::ReminderSent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Bookings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Bookings::UpdatedAt)
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
                        .name("idx_bookings_tenant_status_start")
                        .table(Bookings::Table)
                        .col(Bookings::TenantId)
                        .col(Bookings::Status)
                        .col(Bookings::StartTime)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Attendance::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Attendance::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Attendance::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Attendance::EmployeeId).uuid().not_null())
                        .col(
                            ColumnDef::new(Attendance::ClockIn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Attendance::ClockOut)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Attendance::AutoClockOut)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Attendance::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Attendance::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Bookings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Bookings {
        Table,
        Id,
        TenantId,
        CustomerId,
        ServiceName,
        StartTime,
        Status,
        ReminderSent,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Attendance {
        Table,
        Id,
        TenantId,
        EmployeeId,
        ClockIn,
        ClockOut,
        AutoClockOut,
        CreatedAt,
    }
}

mod m20240101_000005_create_commerce_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_commerce_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Carts::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Carts::CustomerId).uuid().null())
                        .col(ColumnDef::new(Carts::Items).json().not_null())
                        .col(
                            ColumnDef::new(Carts::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Carts::Status).string().not_null())
                        .col(
                            ColumnDef::new(Carts::ReminderSent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Carts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Carts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PosTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PosTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PosTransactions::TenantId).uuid().not_null())
                        .col(ColumnDef::new(PosTransactions::BranchId).uuid().null())
                        .col(ColumnDef::new(PosTransactions::CashierId).uuid().not_null())
                        .col(ColumnDef::new(PosTransactions::Total).decimal().not_null())
                        .col(
                            ColumnDef::new(PosTransactions::DiscountCode)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PosTransactions::DiscountAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PosTransactions::TaxAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PosTransactions::Status).string().not_null())
                        .col(
                            ColumnDef::new(PosTransactions::CreatedAt)
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
                        .name("idx_pos_transactions_tenant_created")
                        .table(PosTransactions::Table)
                        .col(PosTransactions::TenantId)
                        .col(PosTransactions::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CashDrawerSessions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CashDrawerSessions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashDrawerSessions::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashDrawerSessions::CashierId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashDrawerSessions::OpenedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashDrawerSessions::ClosedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CashDrawerSessions::OpeningAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashDrawerSessions::ExpectedAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashDrawerSessions::ClosingAmount)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CashDrawerSessions::Status)
                                .string()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Email).string().null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(
                            ColumnDef::new(Customers::NeedsSync)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::TenantId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::Status).string().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::AutoCreated)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CashDrawerSessions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PosTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        TenantId,
        CustomerId,
        Items,
        Subtotal,
        Status,
        ReminderSent,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PosTransactions {
        Table,
        Id,
        TenantId,
        BranchId,
        CashierId,
        Total,
        DiscountCode,
        DiscountAmount,
        TaxAmount,
        Status,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum CashDrawerSessions {
        Table,
        Id,
        TenantId,
        CashierId,
        OpenedAt,
        ClosedAt,
        OpeningAmount,
        ExpectedAmount,
        ClosingAmount,
        Status,
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        TenantId,
        Name,
        Email,
        Phone,
        NeedsSync,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        Id,
        TenantId,
        ProductId,
        Quantity,
        Status,
        AutoCreated,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_sync_and_audit_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_sync_and_audit_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BranchChanges::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BranchChanges::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BranchChanges::TenantId).uuid().not_null())
                        .col(ColumnDef::new(BranchChanges::BranchId).uuid().not_null())
                        .col(
                            ColumnDef::new(BranchChanges::EntityType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BranchChanges::EntityId).uuid().not_null())
                        .col(ColumnDef::new(BranchChanges::Payload).json().not_null())
                        .col(
                            ColumnDef::new(BranchChanges::BranchUpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BranchChanges::Applied)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(BranchChanges::CreatedAt)
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
                        .name("idx_branch_changes_tenant_applied")
                        .table(BranchChanges::Table)
                        .col(BranchChanges::TenantId)
                        .col(BranchChanges::Applied)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SyncConflicts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SyncConflicts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SyncConflicts::TenantId).uuid().not_null())
                        .col(ColumnDef::new(SyncConflicts::BranchId).uuid().not_null())
                        .col(
                            ColumnDef::new(SyncConflicts::EntityType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SyncConflicts::EntityId).uuid().not_null())
                        .col(
                            ColumnDef::new(SyncConflicts::BranchPayload)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SyncConflicts::BranchUpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SyncConflicts::CentralUpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SyncConflicts::Status).string().not_null())
                        .col(
                            ColumnDef::new(SyncConflicts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SecurityAlerts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SecurityAlerts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SecurityAlerts::TenantId).uuid().not_null())
                        .col(ColumnDef::new(SecurityAlerts::ActorId).uuid().not_null())
                        .col(
                            ColumnDef::new(SecurityAlerts::AlertType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SecurityAlerts::Details).json().not_null())
                        .col(
                            ColumnDef::new(SecurityAlerts::WindowStart)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SecurityAlerts::WindowEnd)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SecurityAlerts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AuditLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AuditLogs::TenantId).uuid().not_null())
                        .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityType).string().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityId).uuid().not_null())
                        .col(ColumnDef::new(AuditLogs::Changes).json().not_null())
                        .col(ColumnDef::new(AuditLogs::Actor).uuid().null())
                        .col(
                            ColumnDef::new(AuditLogs::CreatedAt)
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
                        .name("idx_audit_logs_tenant_action_created")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::TenantId)
                        .col(AuditLogs::Action)
                        .col(AuditLogs::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SecurityAlerts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SyncConflicts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BranchChanges::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BranchChanges {
        Table,
        Id,
        TenantId,
        BranchId,
        EntityType,
        EntityId,
        Payload,
        BranchUpdatedAt,
        Applied,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SyncConflicts {
        Table,
        Id,
        TenantId,
        BranchId,
        EntityType,
        EntityId,
        BranchPayload,
        BranchUpdatedAt,
        CentralUpdatedAt,
        Status,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SecurityAlerts {
        Table,
        Id,
        TenantId,
        ActorId,
        AlertType,
        Details,
        WindowStart,
        WindowEnd,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum AuditLogs {
        Table,
        Id,
        TenantId,
        Action,
        EntityType,
        EntityId,
        Changes,
        Actor,
        CreatedAt,
    }
}
