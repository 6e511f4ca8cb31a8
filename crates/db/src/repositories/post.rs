//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, item, post};
use chrono::{DateTime, Utc};
use rateit_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post not found: {id}")))
    }

    /// Create a post together with its items, atomically.
    ///
    /// Items are never re-created later; the item set is fixed here.
    pub async fn create_with_items(
        &self,
        post: post::ActiveModel,
        items: Vec<item::ActiveModel>,
    ) -> AppResult<post::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = post
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for item in items {
            item.insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Soft-remove a post owned by this device identity.
    ///
    /// Returns whether a row was updated. Votes are never deleted.
    pub async fn soft_remove_by_browser(&self, id: &str, browser_id: &str) -> AppResult<bool> {
        let result = Post::update_many()
            .col_expr(post::Column::IsRemoved, Expr::value(true))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::BrowserId.eq(browser_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Soft-remove a post via its creator token (legacy deletion).
    pub async fn soft_remove_by_token(&self, id: &str, creator_token: &str) -> AppResult<bool> {
        let result = Post::update_many()
            .col_expr(post::Column::IsRemoved, Expr::value(true))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::CreatorToken.eq(creator_token))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// List live posts (not removed, not expired), newest first.
    pub async fn list_live(&self, now: DateTime<Utc>) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::IsRemoved.eq(false))
            .filter(
                Condition::any()
                    .add(post::Column::ExpiresAt.is_null())
                    .add(post::Column::ExpiresAt.gt(now)),
            )
            .order_by_desc(post::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count live posts.
    pub async fn count_live(&self, now: DateTime<Utc>) -> AppResult<u64> {
        Post::find()
            .filter(post::Column::IsRemoved.eq(false))
            .filter(
                Condition::any()
                    .add(post::Column::ExpiresAt.is_null())
                    .add(post::Column::ExpiresAt.gt(now)),
            )
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
