//! Item repository.

use std::sync::Arc;

use crate::entities::{Item, item};
use rateit_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Item repository for database operations.
#[derive(Clone)]
pub struct ItemRepository {
    db: Arc<DatabaseConnection>,
}

impl ItemRepository {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// List a post's items in display order.
    pub async fn find_by_post(&self, post_id: &str) -> AppResult<Vec<item::Model>> {
        Item::find()
            .filter(item::Column::PostId.eq(post_id))
            .order_by_asc(item::Column::OrderIndex)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
