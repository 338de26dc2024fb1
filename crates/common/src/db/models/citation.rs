//! Citation row entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "citations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub entry_type_id: i64,

    #[sea_orm(column_type = "Text", unique)]
    pub citation_key: String,

    /// Bibliographic metadata as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub fields: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entry_type::Entity",
        from = "Column::EntryTypeId",
        to = "super::entry_type::Column::Id"
    )]
    EntryType,
}

impl Related<super::entry_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EntryType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
