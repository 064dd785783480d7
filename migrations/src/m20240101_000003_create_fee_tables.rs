use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // A NULL fee means the method is free of charge.
        manager
            .create_table(
                Table::create()
                    .table(OrderMethods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderMethods::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderMethods::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(OrderMethods::DeliveryFee)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentMethods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentMethods::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::Name)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::AdminFee)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderMethods::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum OrderMethods {
    Table,
    Id,
    Name,
    DeliveryFee,
}

#[derive(DeriveIden)]
pub enum PaymentMethods {
    Table,
    Id,
    Name,
    AdminFee,
}
