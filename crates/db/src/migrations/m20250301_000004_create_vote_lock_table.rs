//! Create vote lock table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Composite primary key (ip_hash, post_id): one vote per identity
        // per post, enforced by the storage layer inside the vote
        // transaction. A concurrent duplicate insert fails with a
        // uniqueness violation.
        manager
            .create_table(
                Table::create()
                    .table(VoteLock::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(VoteLock::IpHash).string_len(64).not_null())
                    .col(ColumnDef::new(VoteLock::PostId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(VoteLock::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_vote_lock")
                            .col(VoteLock::IpHash)
                            .col(VoteLock::PostId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_lock_post")
                            .from(VoteLock::Table, VoteLock::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: post_id (counting locks per post)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_lock_post_id")
                    .table(VoteLock::Table)
                    .col(VoteLock::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VoteLock::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum VoteLock {
    Table,
    IpHash,
    PostId,
    CreatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}
