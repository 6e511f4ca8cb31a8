//! Vote repository.
//!
//! Owns the vote-ledger transaction: the lock insert, the denormalized
//! counter updates, and the vote detail rows commit or roll back as a unit.

use std::sync::Arc;

use crate::entities::{Item, Post, Vote, VoteLock, item, post, vote, vote_lock};
use chrono::{DateTime, Utc};
use rateit_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a vote cast by this device on this post.
    ///
    /// Device lookups use the `(post_id, browser_id)` pair directly, not
    /// the identity hash, so a device is recognized across IP changes.
    pub async fn find_device_vote(
        &self,
        post_id: &str,
        browser_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::PostId.eq(post_id))
            .filter(vote::Column::BrowserId.eq(browser_id))
            .order_by_asc(vote::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the vote lock for an identity hash on a post.
    pub async fn find_lock(
        &self,
        ip_hash: &str,
        post_id: &str,
    ) -> AppResult<Option<vote_lock::Model>> {
        VoteLock::find_by_id((ip_hash.to_string(), post_id.to_string()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List a post's rank ballots (votes carrying a ranking).
    pub async fn find_rankings(&self, post_id: &str) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::PostId.eq(post_id))
            .filter(vote::Column::Ranking.is_not_null())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List an item's rated votes (votes carrying ratings).
    pub async fn find_ratings_by_item(&self, item_id: &str) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::ItemId.eq(item_id))
            .filter(vote::Column::Ratings.is_not_null())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count votes on a post since a point in time.
    ///
    /// Feeds the trending ranker's recent-burst signal; computed at query
    /// time, never denormalized.
    pub async fn count_recent(&self, post_id: &str, since: DateTime<Utc>) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::PostId.eq(post_id))
            .filter(vote::Column::CreatedAt.gt(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count vote-lock rows for a post.
    pub async fn count_locks(&self, post_id: &str) -> AppResult<u64> {
        VoteLock::find()
            .filter(vote_lock::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count vote rows referencing an item.
    pub async fn count_for_item(&self, item_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::ItemId.eq(item_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record one ballot atomically.
    ///
    /// Inserts the vote lock, increments the post's vote count, inserts the
    /// vote detail rows, and applies each item's `(vote_count, total_score)`
    /// delta — all in a single transaction. A duplicate lock (a concurrent
    /// submission from the same identity) surfaces as [`AppError::AlreadyVoted`]
    /// with nothing applied; any other storage failure rolls back and
    /// surfaces as [`AppError::Transaction`], safe to retry as a whole.
    pub async fn record_ballot(
        &self,
        lock: vote_lock::ActiveModel,
        post_id: &str,
        votes: Vec<vote::ActiveModel>,
        item_updates: &[(String, i64)],
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Transaction(e.to_string()))?;

        match Self::apply_ballot(&txn, lock, post_id, votes, item_updates).await {
            Ok(()) => txn
                .commit()
                .await
                .map_err(|e| AppError::Transaction(e.to_string())),
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(error = %rollback_err, "Vote transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply_ballot(
        txn: &DatabaseTransaction,
        lock: vote_lock::ActiveModel,
        post_id: &str,
        votes: Vec<vote::ActiveModel>,
        item_updates: &[(String, i64)],
    ) -> AppResult<()> {
        lock.insert(txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::AlreadyVoted
            } else {
                AppError::Transaction(e.to_string())
            }
        })?;

        Post::update_many()
            .col_expr(
                post::Column::VoteCount,
                Expr::col(post::Column::VoteCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(txn)
            .await
            .map_err(|e| AppError::Transaction(e.to_string()))?;

        for vote in votes {
            vote.insert(txn)
                .await
                .map_err(|e| AppError::Transaction(e.to_string()))?;
        }

        for (item_id, rating_sum) in item_updates {
            Item::update_many()
                .col_expr(
                    item::Column::VoteCount,
                    Expr::col(item::Column::VoteCount).add(1),
                )
                .col_expr(
                    item::Column::TotalScore,
                    Expr::col(item::Column::TotalScore).add(*rating_sum),
                )
                .filter(item::Column::Id.eq(item_id))
                .exec(txn)
                .await
                .map_err(|e| AppError::Transaction(e.to_string()))?;
        }

        Ok(())
    }
}
