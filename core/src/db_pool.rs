use crate::error::{MappingError, Result};
use crate::modifying::ModifyingKind;
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use sqlx::Pool;
use std::str::FromStr;
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    MySql,
    Postgres,
    Sqlite,
}

impl DbDriver {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(DbDriver::MySql)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbDriver::Postgres)
        } else if url.starts_with("sqlite://") || url.starts_with("sqlite:") {
            Ok(DbDriver::Sqlite)
        } else {
            Err(MappingError::UnsupportedDatabase(url.to_string()))
        }
    }

    /// 把 `?` 占位符转换为驱动的格式（PostgreSQL 为 `$1`, `$2`, ...）
    ///
    /// 单引号字符串和双引号标识符中的 `?` 保持不变。
    pub fn convert_placeholders(&self, sql: &str) -> String {
        match self {
            DbDriver::MySql | DbDriver::Sqlite => sql.to_string(),
            DbDriver::Postgres => {
                let mut result = String::with_capacity(sql.len());
                let mut index = 0;
                let mut quote: Option<char> = None;
                for ch in sql.chars() {
                    match quote {
                        // 转义的 '' 或 "" 相当于先关闭再打开，结果一致
                        Some(q) if ch == q => quote = None,
                        Some(_) => {}
                        None if ch == '\'' || ch == '"' => quote = Some(ch),
                        None if ch == '?' => {
                            index += 1;
                            result.push_str(&format!("${}", index));
                            continue;
                        }
                        None => {}
                    }
                    result.push(ch);
                }
                result
            }
        }
    }

    /// 转义单个 SQL 标识符
    pub fn escape_identifier(&self, name: &str) -> String {
        match self {
            DbDriver::MySql => format!("`{}`", name),
            DbDriver::Postgres | DbDriver::Sqlite => format!("\"{}\"", name),
        }
    }

    /// 转义带 schema 的名称，逐段转义：`sales.cust_tbl` -> `"sales"."cust_tbl"`
    pub fn qualify(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.escape_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// 取序列下一个值的 SQL，SQLite 没有序列
    pub fn next_sequence_sql(&self, sequence: &str) -> Option<String> {
        match self {
            DbDriver::Postgres => Some(format!("SELECT nextval('{}')", sequence)),
            // MariaDB 10.3+
            DbDriver::MySql => Some(format!("SELECT NEXTVAL({})", self.qualify(sequence))),
            DbDriver::Sqlite => None,
        }
    }
}

impl FromStr for DbDriver {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DbDriver::MySql),
            "postgres" | "postgresql" | "pg" => Ok(DbDriver::Postgres),
            "sqlite" => Ok(DbDriver::Sqlite),
            _ => Err(MappingError::UnsupportedDatabase(s.to_string())),
        }
    }
}

// 按已启用的驱动约束 FromRow，未启用的驱动不参与约束

#[cfg(feature = "mysql")]
pub trait FromMySqlRow: for<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> {}
#[cfg(feature = "mysql")]
impl<T> FromMySqlRow for T where T: for<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> {}
#[cfg(not(feature = "mysql"))]
pub trait FromMySqlRow {}
#[cfg(not(feature = "mysql"))]
impl<T> FromMySqlRow for T {}

#[cfg(feature = "postgres")]
pub trait FromPgRow: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> {}
#[cfg(feature = "postgres")]
impl<T> FromPgRow for T where T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> {}
#[cfg(not(feature = "postgres"))]
pub trait FromPgRow {}
#[cfg(not(feature = "postgres"))]
impl<T> FromPgRow for T {}

#[cfg(feature = "sqlite")]
pub trait FromSqliteRow: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> {}
#[cfg(feature = "sqlite")]
impl<T> FromSqliteRow for T where T: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> {}
#[cfg(not(feature = "sqlite"))]
pub trait FromSqliteRow {}
#[cfg(not(feature = "sqlite"))]
impl<T> FromSqliteRow for T {}

/// 可以从所有已启用驱动的行解码的类型
pub trait FromDriverRow: FromMySqlRow + FromPgRow + FromSqliteRow + Send + Unpin {}
impl<T> FromDriverRow for T where T: FromMySqlRow + FromPgRow + FromSqliteRow + Send + Unpin {}

/// 按声明的语句类型执行后的结果
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome<T> {
    /// 查询返回的行
    Rows(Vec<T>),
    /// 写操作影响的行数
    Affected(u64),
}

impl<T> StatementOutcome<T> {
    pub fn rows(self) -> Option<Vec<T>> {
        match self {
            StatementOutcome::Rows(rows) => Some(rows),
            StatementOutcome::Affected(_) => None,
        }
    }

    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            StatementOutcome::Rows(_) => None,
            StatementOutcome::Affected(n) => Some(*n),
        }
    }
}

/// 连接池
///
/// `execute`、`query_as` 和 `run_annotated` 不绑定参数，SQL 原样发送；
/// 只有内部带参数的查询（`table_columns`）才做占位符转换。
#[derive(Debug, Clone)]
pub struct DbPool {
    driver: DbDriver,
    #[cfg(feature = "mysql")]
    mysql: Option<Arc<Pool<sqlx::MySql>>>,
    #[cfg(feature = "postgres")]
    pg: Option<Arc<Pool<sqlx::Postgres>>>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<Arc<Pool<sqlx::Sqlite>>>,
}

impl DbPool {
    /// 从数据库 URL 连接并创建 DbPool
    pub async fn connect(url: &str) -> Result<Self> {
        let driver = DbDriver::from_url(url)?;

        match driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = Pool::<sqlx::MySql>::connect(url).await?;
                Ok(Self::from_mysql_pool(Arc::new(pool)))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = Pool::<sqlx::Postgres>::connect(url).await?;
                Ok(Self::from_postgres_pool(Arc::new(pool)))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = Pool::<sqlx::Sqlite>::connect(url).await?;
                Ok(Self::from_sqlite_pool(Arc::new(pool)))
            }
            #[allow(unreachable_patterns)]
            _ => Err(MappingError::UnsupportedDatabase(format!(
                "driver {:?} is not enabled",
                driver
            ))),
        }
    }

    #[cfg(feature = "mysql")]
    pub fn from_mysql_pool(pool: Arc<Pool<sqlx::MySql>>) -> Self {
        Self {
            driver: DbDriver::MySql,
            mysql: Some(pool),
            #[cfg(feature = "postgres")]
            pg: None,
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    #[cfg(feature = "postgres")]
    pub fn from_postgres_pool(pool: Arc<Pool<sqlx::Postgres>>) -> Self {
        Self {
            driver: DbDriver::Postgres,
            #[cfg(feature = "mysql")]
            mysql: None,
            pg: Some(pool),
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn from_sqlite_pool(pool: Arc<Pool<sqlx::Sqlite>>) -> Self {
        Self {
            driver: DbDriver::Sqlite,
            #[cfg(feature = "mysql")]
            mysql: None,
            #[cfg(feature = "postgres")]
            pg: None,
            sqlite: Some(pool),
        }
    }

    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    pub async fn execute(&self, sql: &str) -> Result<u64> {
        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let result = sqlx::query(sql).execute(pool).await?;
                Ok(result.rows_affected())
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let result = sqlx::query(sql).execute(pool).await?;
                Ok(result.rows_affected())
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let result = sqlx::query(sql).execute(pool).await?;
                Ok(result.rows_affected())
            }
            #[allow(unreachable_patterns)]
            _ => Err(MappingError::NoPoolAvailable),
        }
    }

    /// 在单独的事务中执行写操作
    async fn execute_in_transaction(&self, sql: &str) -> Result<u64> {
        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let mut tx = pool.begin().await?;
                let result = sqlx::query(sql).execute(&mut *tx).await?;
                tx.commit().await?;
                Ok(result.rows_affected())
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let mut tx = pool.begin().await?;
                let result = sqlx::query(sql).execute(&mut *tx).await?;
                tx.commit().await?;
                Ok(result.rows_affected())
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let mut tx = pool.begin().await?;
                let result = sqlx::query(sql).execute(&mut *tx).await?;
                tx.commit().await?;
                Ok(result.rows_affected())
            }
            #[allow(unreachable_patterns)]
            _ => Err(MappingError::NoPoolAvailable),
        }
    }

    pub async fn query_as<T: FromDriverRow>(&self, sql: &str) -> Result<Vec<T>> {
        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let rows: Vec<T> = sqlx::query_as(sql).fetch_all(pool).await?;
                Ok(rows)
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let rows: Vec<T> = sqlx::query_as(sql).fetch_all(pool).await?;
                Ok(rows)
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let rows: Vec<T> = sqlx::query_as(sql).fetch_all(pool).await?;
                Ok(rows)
            }
            #[allow(unreachable_patterns)]
            _ => Err(MappingError::NoPoolAvailable),
        }
    }

    /// 按 `#[modifying]` 声明的语句类型执行 SQL
    ///
    /// - `select`：`fetch_all`，返回 `StatementOutcome::Rows`；
    /// - `insert` / `update` / `delete`：在事务中执行，返回影响行数。
    ///
    /// SQL 首个关键字与声明类型不一致时返回 `MismatchedStatement`。
    pub async fn run_annotated<T: FromDriverRow>(
        &self,
        kind: ModifyingKind,
        sql: &str,
    ) -> Result<StatementOutcome<T>> {
        kind.check_sql(sql)?;
        tracing::debug!(kind = %kind, driver = ?self.driver, "run annotated statement");

        if kind.is_modifying() {
            let affected = self.execute_in_transaction(sql).await?;
            Ok(StatementOutcome::Affected(affected))
        } else {
            let rows = self.query_as::<T>(sql).await?;
            Ok(StatementOutcome::Rows(rows))
        }
    }

    /// 获取表的列名（按定义顺序），表不存在时返回空列表
    ///
    /// `schema` 为 None 时使用当前库（MySQL）或 `public`（PostgreSQL）；SQLite 忽略 schema。
    pub async fn table_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<String>> {
        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let columns = sqlx::query_scalar::<_, String>(
                    "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
                )
                .bind(schema)
                .bind(table)
                .fetch_all(pool)
                .await?;
                Ok(columns)
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let sql = self.driver.convert_placeholders(
                    "SELECT column_name::text FROM information_schema.columns WHERE table_schema = COALESCE(?, 'public') AND table_name = ? ORDER BY ordinal_position",
                );
                let columns = sqlx::query_scalar::<_, String>(&sql)
                    .bind(schema)
                    .bind(table)
                    .fetch_all(pool)
                    .await?;
                Ok(columns)
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or(MappingError::NoPoolAvailable)?;
                let columns = sqlx::query_scalar::<_, String>(
                    "SELECT name FROM pragma_table_info(?) ORDER BY cid",
                )
                .bind(table)
                .fetch_all(pool)
                .await?;
                Ok(columns)
            }
            #[allow(unreachable_patterns)]
            _ => Err(MappingError::NoPoolAvailable),
        }
    }
}
