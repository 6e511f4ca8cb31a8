//! Create item table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Item::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Item::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Item::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(Item::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Item::ImageUrl).text())
                    .col(ColumnDef::new(Item::OrderIndex).integer().not_null())
                    .col(
                        ColumnDef::new(Item::VoteCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Item::TotalScore)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_item_post")
                            .from(Item::Table, Item::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (post_id, order_index) for ordered item listings
        manager
            .create_index(
                Index::create()
                    .name("idx_item_post_order")
                    .table(Item::Table)
                    .col(Item::PostId)
                    .col(Item::OrderIndex)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Item::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Item {
    Table,
    Id,
    PostId,
    Name,
    ImageUrl,
    OrderIndex,
    VoteCount,
    TotalScore,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}
