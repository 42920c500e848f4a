//! 数据库信息抽象层
//!
//! 把 sqlx 的数据库类型映射到 `DbDriver`，以便按方言生成带引号的表名和序列 SQL。

use crate::db_pool::DbDriver;
use sqlx::Database;

/// 数据库信息 trait
///
/// 每个数据库类型（`sqlx::MySql`, `sqlx::Postgres`, `sqlx::Sqlite`）只需给出驱动类型，
/// 其余方法按驱动的方言实现。
pub trait DatabaseInfo: Database {
    /// 获取数据库驱动类型
    fn get_driver() -> DbDriver;

    /// 转义 SQL 标识符（表名、列名等）
    ///
    /// ```rust,ignore
    /// assert_eq!(<sqlx::MySql as DatabaseInfo>::escape_identifier("user"), "`user`");
    /// assert_eq!(<sqlx::Postgres as DatabaseInfo>::escape_identifier("user"), "\"user\"");
    /// ```
    fn escape_identifier(name: &str) -> String {
        Self::get_driver().escape_identifier(name)
    }

    /// 转义带 schema 前缀的名称
    fn qualify(name: &str) -> String {
        Self::get_driver().qualify(name)
    }
}

#[cfg(feature = "mysql")]
impl DatabaseInfo for sqlx::MySql {
    fn get_driver() -> DbDriver {
        DbDriver::MySql
    }
}

#[cfg(feature = "postgres")]
impl DatabaseInfo for sqlx::Postgres {
    fn get_driver() -> DbDriver {
        DbDriver::Postgres
    }
}

#[cfg(feature = "sqlite")]
impl DatabaseInfo for sqlx::Sqlite {
    fn get_driver() -> DbDriver {
        DbDriver::Sqlite
    }
}
