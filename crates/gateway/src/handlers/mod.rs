//! API handlers module

pub mod citations;
pub mod doi;
pub mod entry_types;
pub mod export;
pub mod health;
pub mod labels;
pub mod search;
