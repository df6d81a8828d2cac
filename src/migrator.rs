use sea_orm::{EntityName, Schema};
use sea_orm_migration::prelude::*;

use crate::entity::{AuditLogs, Carts, Categories, OrderItems, Orders, Payments, Products, Users};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_core_tables::Migration),
            Box::new(m20250101_000002_add_lookup_indexes::Migration),
        ]
    }
}

mod m20250101_000001_create_core_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_core_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());
            // Referenced tables first; Postgres rejects dangling foreign keys.
            let tables = [
                schema.create_table_from_entity(Users),
                schema.create_table_from_entity(Categories),
                schema.create_table_from_entity(Products),
                schema.create_table_from_entity(Carts),
                schema.create_table_from_entity(Orders),
                schema.create_table_from_entity(OrderItems),
                schema.create_table_from_entity(Payments),
                schema.create_table_from_entity(AuditLogs),
            ];
            for mut table in tables {
                manager.create_table(table.if_not_exists().to_owned()).await?;
            }
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let tables = [
                AuditLogs.table_ref(),
                Payments.table_ref(),
                OrderItems.table_ref(),
                Orders.table_ref(),
                Carts.table_ref(),
                Products.table_ref(),
                Categories.table_ref(),
                Users.table_ref(),
            ];
            for table in tables {
                manager
                    .drop_table(Table::drop().table(table).if_exists().to_owned())
                    .await?;
            }
            Ok(())
        }
    }
}

mod m20250101_000002_add_lookup_indexes {
    use super::*;
    use crate::entity::{order_items, orders, payments};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_add_lookup_indexes"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_user_id")
                        .table(Orders)
                        .col(orders::Column::UserId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_payment_ref")
                        .table(Orders)
                        .col(orders::Column::PaymentRef)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_order_id")
                        .table(OrderItems)
                        .col(order_items::Column::OrderId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_payments_order_id")
                        .table(Payments)
                        .col(payments::Column::OrderId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for (name, table) in [
                ("idx_payments_order_id", Payments.table_ref()),
                ("idx_order_items_order_id", OrderItems.table_ref()),
                ("idx_orders_payment_ref", Orders.table_ref()),
                ("idx_orders_user_id", Orders.table_ref()),
            ] {
                manager
                    .drop_index(Index::drop().name(name).table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }
}
