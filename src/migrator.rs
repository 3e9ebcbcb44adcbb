use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_products_table::Migration),
            Box::new(m20250301_000002_create_inventory_records_table::Migration),
            Box::new(m20250301_000003_create_sales_orders_tables::Migration),
            Box::new(m20250301_000004_create_suppliers_tables::Migration),
            Box::new(m20250301_000005_create_purchase_requests_table::Migration),
            Box::new(m20250301_000006_create_purchase_orders_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20250301_000001_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_products_table"
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
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Category).string().not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::CostPrice).decimal().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_is_active")
                        .table(Products::Table)
                        .col(Products::IsActive)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Sku,
        Name,
        Category,
        Price,
        CostPrice,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_inventory_records_table {

    use sea_orm_migration::prelude::*;

    use super::m20250301_000001_create_products_table::Products;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_inventory_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryRecords::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryRecords::AvailableQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::MinStockLevel)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::MaxStockLevel)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::ReorderPoint)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_records_product_id")
                                .from(InventoryRecords::Table, InventoryRecords::ProductId)
                                .to(Products::Table, Products::Id)
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
                        .name("idx_inventory_records_product_id")
                        .table(InventoryRecords::Table)
                        .col(InventoryRecords::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryRecords {
        Table,
        Id,
        ProductId,
        AvailableQuantity,
        MinStockLevel,
        MaxStockLevel,
        ReorderPoint,
        UpdatedAt,
    }
}

mod m20250301_000003_create_sales_orders_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_sales_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(SalesOrders::Status).string().not_null())
                        .col(ColumnDef::new(SalesOrders::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_orders_order_number")
                        .table(SalesOrders::Table)
                        .col(SalesOrders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Velocity scans filter on status and created_at together
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_orders_status_created_at")
                        .table(SalesOrders::Table)
                        .col(SalesOrders::Status)
                        .col(SalesOrders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SalesOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(SalesOrderItems::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(SalesOrderItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_order_items_order_id")
                                .from(SalesOrderItems::Table, SalesOrderItems::OrderId)
                                .to(SalesOrders::Table, SalesOrders::Id)
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
                        .name("idx_sales_order_items_order_id")
                        .table(SalesOrderItems::Table)
                        .col(SalesOrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_order_items_product_id")
                        .table(SalesOrderItems::Table)
                        .col(SalesOrderItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SalesOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SalesOrders {
        Table,
        Id,
        OrderNumber,
        Status,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum SalesOrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
        UnitPrice,
    }
}

mod m20250301_000004_create_suppliers_tables {

    use sea_orm_migration::prelude::*;

    use super::m20250301_000001_create_products_table::Products;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_suppliers_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::ContactEmail).string().null())
                        .col(ColumnDef::new(Suppliers::Phone).string().null())
                        .col(
                            ColumnDef::new(Suppliers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Suppliers::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SupplierOffers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SupplierOffers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SupplierOffers::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(SupplierOffers::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(SupplierOffers::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::LeadTimeDays)
                                .integer()
                                .not_null()
                                .default(3),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::MinOrderQty)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::Rating)
                                .float()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::IsPreferred)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_supplier_offers_supplier_id")
                                .from(SupplierOffers::Table, SupplierOffers::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_supplier_offers_product_id")
                                .from(SupplierOffers::Table, SupplierOffers::ProductId)
                                .to(Products::Table, Products::Id)
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
                        .name("idx_supplier_offers_supplier_product")
                        .table(SupplierOffers::Table)
                        .col(SupplierOffers::SupplierId)
                        .col(SupplierOffers::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_supplier_offers_product_id")
                        .table(SupplierOffers::Table)
                        .col(SupplierOffers::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SupplierOffers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Suppliers {
        Table,
        Id,
        Name,
        ContactEmail,
        Phone,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum SupplierOffers {
        Table,
        Id,
        SupplierId,
        ProductId,
        UnitPrice,
        LeadTimeDays,
        MinOrderQty,
        Rating,
        IsPreferred,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000005_create_purchase_requests_table {

    use sea_orm_migration::prelude::*;

    use super::m20250301_000001_create_products_table::Products;
    use super::m20250301_000004_create_suppliers_tables::Suppliers;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_purchase_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::RequestNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseRequests::ProductId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseRequests::SupplierId).uuid().null())
                        .col(
                            ColumnDef::new(PurchaseRequests::RequestedQty)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::CurrentStock)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::ReorderPoint)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::EstimatedCost)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(PurchaseRequests::Priority).string().not_null())
                        .col(ColumnDef::new(PurchaseRequests::Source).string().not_null())
                        .col(ColumnDef::new(PurchaseRequests::Status).string().not_null())
                        .col(ColumnDef::new(PurchaseRequests::Notes).string().null())
                        .col(ColumnDef::new(PurchaseRequests::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(PurchaseRequests::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::PurchaseOrderId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_requests_product_id")
                                .from(PurchaseRequests::Table, PurchaseRequests::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_requests_supplier_id")
                                .from(PurchaseRequests::Table, PurchaseRequests::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_requests_request_number")
                        .table(PurchaseRequests::Table)
                        .col(PurchaseRequests::RequestNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_requests_status")
                        .table(PurchaseRequests::Table)
                        .col(PurchaseRequests::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_requests_created_at")
                        .table(PurchaseRequests::Table)
                        .col(PurchaseRequests::CreatedAt)
                        .to_owned(),
                )
                .await?;

            // One open request per product. Partial unique indexes have the
            // same syntax on PostgreSQL and SQLite, but sea-query cannot
            // express the WHERE clause, hence raw SQL.
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_purchase_requests_open_product \
                     ON purchase_requests (product_id) \
                     WHERE status IN ('PENDING', 'APPROVED')",
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseRequests {
        Table,
        Id,
        RequestNumber,
        ProductId,
        SupplierId,
        RequestedQty,
        CurrentStock,
        ReorderPoint,
        EstimatedCost,
        Priority,
        Source,
        Status,
        Notes,
        ApprovedBy,
        ApprovedAt,
        PurchaseOrderId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000006_create_purchase_orders_tables {

    use sea_orm_migration::prelude::*;

    use super::m20250301_000001_create_products_table::Products;
    use super::m20250301_000004_create_suppliers_tables::Suppliers;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000006_create_purchase_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
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
                        .col(
                            ColumnDef::new(PurchaseOrders::OrderNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::Status).string().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::OrderDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::TaxAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::ShippingAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::DiscountAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::NetAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PurchaseOrders::Notes).string().null())
                        .col(ColumnDef::new(PurchaseOrders::CreatedBy).uuid().null())
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
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_orders_supplier_id")
                                .from(PurchaseOrders::Table, PurchaseOrders::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_orders_order_number")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_orders_status")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_orders_supplier_id")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::SupplierId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::TotalPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_items_purchase_order_id")
                                .from(
                                    PurchaseOrderItems::Table,
                                    PurchaseOrderItems::PurchaseOrderId,
                                )
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_items_product_id")
                                .from(PurchaseOrderItems::Table, PurchaseOrderItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_order_items_purchase_order_id")
                        .table(PurchaseOrderItems::Table)
                        .col(PurchaseOrderItems::PurchaseOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseOrders {
        Table,
        Id,
        OrderNumber,
        SupplierId,
        Status,
        OrderDate,
        TotalAmount,
        TaxAmount,
        ShippingAmount,
        DiscountAmount,
        NetAmount,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseOrderItems {
        Table,
        Id,
        PurchaseOrderId,
        ProductId,
        Quantity,
        UnitPrice,
        TotalPrice,
        CreatedAt,
    }
}
