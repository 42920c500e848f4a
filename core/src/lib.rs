pub mod context;
pub mod database_info;
pub mod db_pool;
pub mod entity;
pub mod error;
pub mod macros_api;
pub mod modifying;
pub mod utils;

pub use context::MappingContext;
pub use error::{MappingError, Result};
pub use database_info::DatabaseInfo;
pub use db_pool::{DbDriver, DbPool, FromDriverRow, StatementOutcome};
pub use entity::{EntityMetadata, PersistentProperty, VerificationState};
pub use macros_api::{Entity, EntityAnnotation, EntitySchema, EntityType, PropertyDef};
pub use modifying::ModifyingKind;

// 重新导出 derive 的所有公共 API（宏）
pub use sqlxmeta_derive::*;
