//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Post types, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PostType {
    /// Pick one of 2-4 options.
    #[sea_orm(string_value = "poll")]
    #[serde(rename = "poll")]
    Poll,
    /// "Would you rather": exactly 2 options.
    #[sea_orm(string_value = "wyr")]
    #[serde(rename = "wyr")]
    WouldYouRather,
    /// Rate a single item on one or more attributes.
    #[sea_orm(string_value = "rate")]
    #[serde(rename = "rate")]
    Rate,
    /// Order all items into a full ranking.
    #[sea_orm(string_value = "rank")]
    #[serde(rename = "rank")]
    Rank,
    /// Rate several items on shared attributes.
    #[sea_orm(string_value = "compare")]
    #[serde(rename = "compare")]
    Compare,
}

impl PostType {
    /// Whether this post type carries per-attribute ratings.
    #[must_use]
    pub const fn is_rated(self) -> bool {
        matches!(self, Self::Rate | Self::Compare)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub post_type: PostType,

    pub caption: Option<String>,

    /// Rating-dimension names (JSON array), only for rate/compare posts.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub attributes: Option<Json>,

    /// Denormalized: equals the number of vote-lock rows for this post.
    pub vote_count: i32,

    pub comment_count: i32,

    pub report_count: i32,

    /// Opaque secret for legacy deletion.
    pub creator_token: String,

    /// Creator's device identity, if the client supplied one.
    #[sea_orm(indexed)]
    pub browser_id: Option<String>,

    pub is_removed: bool,

    pub expires_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item::Entity")]
    Item,

    #[sea_orm(has_many = "super::vote::Entity")]
    Vote,

    #[sea_orm(has_many = "super::vote_lock::Entity")]
    VoteLock,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl Related<super::vote_lock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoteLock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
