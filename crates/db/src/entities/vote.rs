//! Vote entity: one detail row of a ballot.
//!
//! Most ballots write exactly one row. A multi-item compare ballot writes
//! one row per rated item, all sharing the same identity hash.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub post_id: String,

    /// Selected item, for selection-style and rating-style ballots.
    #[sea_orm(indexed)]
    pub item_id: Option<String>,

    /// Attribute name → score 1..10 (JSON map), for rate/compare ballots.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub ratings: Option<Json>,

    /// Full finishing order of item IDs (JSON array), for rank ballots.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub ranking: Option<Json>,

    /// Storage identity hash (device-aware when available).
    pub ip_hash: String,

    /// Device identity, when the client supplied one.
    #[sea_orm(indexed)]
    pub browser_id: Option<String>,

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

    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
