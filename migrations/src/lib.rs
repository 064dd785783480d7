pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users_table;
mod m20240101_000002_create_catalog_tables;
mod m20240101_000003_create_fee_tables;
mod m20240101_000004_create_carts_table;
mod m20240101_000005_create_transactions_table;
mod m20240101_000006_create_transaction_items_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_fee_tables::Migration),
            Box::new(m20240101_000004_create_carts_table::Migration),
            Box::new(m20240101_000005_create_transactions_table::Migration),
            Box::new(m20240101_000006_create_transaction_items_table::Migration),
        ]
    }
}
