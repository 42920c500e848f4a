//! 语句意图标记
//!
//! 仓储方法通过 `#[modifying("update")]` 声明自己执行的是写操作还是查询，
//! 执行层据此决定用 `fetch_all` 还是在事务中 `execute`。

use crate::error::{MappingError, Result};
use std::fmt;
use std::str::FromStr;

/// 语句类型：select、insert、update、delete，默认 select
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModifyingKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
}

impl ModifyingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifyingKind::Select => "select",
            ModifyingKind::Insert => "insert",
            ModifyingKind::Update => "update",
            ModifyingKind::Delete => "delete",
        }
    }

    /// 是否为写操作
    pub fn is_modifying(&self) -> bool {
        !matches!(self, ModifyingKind::Select)
    }

    /// 根据 SQL 的首个关键字推断语句类型，无法识别时返回 None
    pub fn infer(sql: &str) -> Option<Self> {
        let keyword = sql
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()?;
        keyword.parse().ok()
    }

    /// 检查 SQL 与声明的类型是否一致（无法识别首个关键字时放行）
    pub fn check_sql(&self, sql: &str) -> Result<()> {
        match Self::infer(sql) {
            Some(actual) if actual != *self => Err(MappingError::MismatchedStatement {
                declared: self.to_string(),
                actual: actual.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ModifyingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModifyingKind {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "select" => Ok(ModifyingKind::Select),
            "insert" => Ok(ModifyingKind::Insert),
            "update" => Ok(ModifyingKind::Update),
            "delete" => Ok(ModifyingKind::Delete),
            _ => Err(MappingError::UnknownModifyingKind(s.to_string())),
        }
    }
}
