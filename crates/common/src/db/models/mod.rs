//! SeaORM entity models
//!
//! Row entities for the citation store. The label namespaces (tags,
//! categories) and their join tables are managed by [`crate::db::labels`]
//! through parameterized statements.

mod citation;
mod entry_type;

pub use citation::{
    ActiveModel as CitationActiveModel, Column as CitationColumn, Entity as CitationEntity,
    Model as CitationRow,
};

pub use entry_type::{
    Column as EntryTypeColumn, Entity as EntryTypeEntity, Model as EntryType,
};
