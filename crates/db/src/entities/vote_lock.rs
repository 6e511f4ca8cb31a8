//! Vote lock entity.
//!
//! The composite primary key `(ip_hash, post_id)` is the authoritative
//! "has voted" fact for an (identity, post) pair. Rows are created once by
//! the vote transaction and never updated or deleted; the key constraint
//! turns a concurrent duplicate submission into one winner and one loser.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote_lock")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ip_hash: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub post_id: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
