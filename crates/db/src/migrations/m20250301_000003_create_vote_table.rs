//! Create vote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::ItemId).string_len(32))
                    .col(ColumnDef::new(Vote::Ratings).json_binary())
                    .col(ColumnDef::new(Vote::Ranking).json_binary())
                    .col(ColumnDef::new(Vote::IpHash).string_len(64).not_null())
                    .col(ColumnDef::new(Vote::BrowserId).string_len(64))
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_post")
                            .from(Vote::Table, Vote::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_item")
                            .from(Vote::Table, Vote::ItemId)
                            .to(Item::Table, Item::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (post_id, browser_id) for device-priority "has voted" lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_post_browser")
                    .table(Vote::Table)
                    .col(Vote::PostId)
                    .col(Vote::BrowserId)
                    .to_owned(),
            )
            .await?;

        // Index: item_id (ratings aggregation per item)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_item_id")
                    .table(Vote::Table)
                    .col(Vote::ItemId)
                    .to_owned(),
            )
            .await?;

        // Index: (post_id, created_at) for recent-vote trending counts
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_post_created_at")
                    .table(Vote::Table)
                    .col(Vote::PostId)
                    .col(Vote::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    PostId,
    ItemId,
    Ratings,
    Ranking,
    IpHash,
    BrowserId,
    CreatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}

#[derive(Iden)]
enum Item {
    Table,
    Id,
}
