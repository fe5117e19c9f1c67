use sea_orm_migration::prelude::*;

/// 配送信息（只追加）
#[derive(DeriveIden)]
enum ShippingRecords {
    Table,
    Id,
    Name,
    Phone,
    Address,
    Prizes,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShippingRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShippingRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShippingRecords::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShippingRecords::Phone)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShippingRecords::Address)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    // [{rank, name, count}]
                    .col(ColumnDef::new(ShippingRecords::Prizes).json_binary().not_null())
                    .col(
                        ColumnDef::new(ShippingRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shipping_records_created_at")
                    .table(ShippingRecords::Table)
                    .col(ShippingRecords::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ShippingRecords::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
