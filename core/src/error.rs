use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// 实体没有任何可持久化的属性
    #[error("Entity {0} has no persistent properties")]
    NoProperties(String),
    /// 两个属性映射到同一列（列名不区分大小写）
    #[error("Entity {entity} maps column {column} more than once")]
    DuplicateColumn { entity: String, column: String },
    #[error("Entity {entity} declares property {property} more than once")]
    DuplicateProperty { entity: String, property: String },
    #[error("Entity {entity} declares more than one id property: {first}, {second}")]
    MultipleIdProperties {
        entity: String,
        first: String,
        second: String,
    },
    /// 表名、schema 或列名含有非法字符
    #[error("Entity {entity} uses an invalid identifier: {identifier}")]
    InvalidIdentifier { entity: String, identifier: String },
    /// 等待方看到的校验失败（原始错误已返回给调用 verify 的一方）
    #[error("Verification of entity {entity} failed: {reason}")]
    VerificationFailed { entity: String, reason: String },
    #[error("Timed out waiting for entity {0} to complete verification")]
    Timeout(String),
    #[error("Entity {0} is already registered")]
    DuplicateEntity(String),
    #[error("Unknown modifying kind: {0}")]
    UnknownModifyingKind(String),
    #[error("Statement declared as {declared} but SQL starts with {actual}")]
    MismatchedStatement { declared: String, actual: String },
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),
    #[error("No connection pool available for driver")]
    NoPoolAvailable,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Invalid entity schema: {0}")]
    Schema(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MappingError>;
