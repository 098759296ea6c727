//! Activity entity: append-only audit log.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fixed tag describing what produced an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[sea_orm(string_value = "user_created")]
    UserCreated,
    #[sea_orm(string_value = "user_updated")]
    UserUpdated,
    #[sea_orm(string_value = "poll_created")]
    PollCreated,
    #[sea_orm(string_value = "poll_updated")]
    PollUpdated,
    #[sea_orm(string_value = "vote_cast")]
    VoteCast,
    #[sea_orm(string_value = "comment_created")]
    CommentCreated,
}

impl ActivityType {
    /// Storage value of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserCreated => "user_created",
            Self::UserUpdated => "user_updated",
            Self::PollCreated => "poll_created",
            Self::PollUpdated => "poll_updated",
            Self::VoteCast => "vote_cast",
            Self::CommentCreated => "comment_created",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Weak reference; cleared when the user is deleted
    #[sea_orm(indexed, nullable)]
    pub user_id: Option<String>,

    #[sea_orm(indexed)]
    pub activity_type: ActivityType,

    #[sea_orm(column_type = "Text")]
    pub details: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
