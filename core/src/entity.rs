//! 实体元数据
//!
//! `EntityMetadata` 由 `MappingContext` 在启动时为每个实体类型创建一次，
//! 名称按注解优先、命名约定兜底的规则推导；`verify` 完成后状态只会单向变为
//! `Verified` 或 `Failed`，等待方在两种结局下都会被唤醒。

use crate::database_info::DatabaseInfo;
use crate::error::{MappingError, Result};
use crate::macros_api::{EntityAnnotation, EntityType, PropertyDef};
use crate::utils::{
    is_safe_identifier, non_blank, reconcatenate_camel_case, to_snake_case, uncapitalize,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const UNVERIFIED: u8 = 0;
const VERIFIED: u8 = 1;
const FAILED: u8 = 2;

/// 已解析的持久化属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentProperty {
    name: String,
    column: String,
    is_id: bool,
}

impl PersistentProperty {
    fn resolve(def: &PropertyDef) -> Self {
        let column = match non_blank(def.column.as_deref()) {
            Some(column) => column.to_string(),
            None => to_snake_case(&def.name),
        };
        Self {
            name: def.name.clone(),
            column,
            is_id: def.id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_name(&self) -> &str {
        &self.column
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }
}

/// 校验状态：`Unverified` -> `Verified` | `Failed`，终态不可回退
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Unverified,
    Verified,
    Failed(String),
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationState::Unverified)
    }
}

/// 单个实体类型的映射元数据
#[derive(Debug)]
pub struct EntityMetadata {
    entity_type: EntityType,
    properties: Vec<PersistentProperty>,
    /// 状态镜像，供 `is_completed` 无锁读取
    completed: AtomicU8,
    state: Mutex<VerificationState>,
    ready: Condvar,
}

impl EntityMetadata {
    pub fn new(entity_type: EntityType) -> Self {
        let properties = entity_type
            .properties
            .iter()
            .map(PersistentProperty::resolve)
            .collect();
        Self {
            entity_type,
            properties,
            completed: AtomicU8::new(UNVERIFIED),
            state: Mutex::new(VerificationState::Unverified),
            ready: Condvar::new(),
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// 类型名，如 `OrderItem`
    pub fn simple_name(&self) -> &str {
        &self.entity_type.simple_name
    }

    fn annotated(&self, pick: fn(&EntityAnnotation) -> Option<&str>) -> Option<&str> {
        self.entity_type
            .annotation
            .as_ref()
            .and_then(|a| non_blank(pick(a)))
    }

    /// 实体名：注解 `name`，否则类型名首字母小写
    pub fn entity_name(&self) -> String {
        match self.annotated(|a| a.name.as_deref()) {
            Some(name) => name.to_string(),
            None => uncapitalize(self.simple_name()),
        }
    }

    /// 声明的 schema
    pub fn schema(&self) -> Option<&str> {
        self.annotated(|a| a.schema.as_deref())
    }

    /// 不带 schema 的表名
    pub fn unqualified_table_name(&self) -> String {
        match self.annotated(|a| a.table.as_deref()) {
            Some(table) => table.to_string(),
            None => reconcatenate_camel_case(self.simple_name(), "_"),
        }
    }

    /// 表名：注解 `table`，否则类型名驼峰转下划线；声明了 schema 时为 `schema.table`
    pub fn table_name(&self) -> String {
        let table = self.unqualified_table_name();
        match self.schema() {
            Some(schema) => format!("{}.{}", schema, table),
            None => table,
        }
    }

    /// 序列名：`seq_<table>`，声明了 schema 时为 `schema.seq_<table>`
    pub fn sequence_name(&self) -> String {
        let table = self.unqualified_table_name();
        match self.schema() {
            Some(schema) => format!("{}.seq_{}", schema, table),
            None => format!("seq_{}", table),
        }
    }

    /// 按目标数据库转义后的表名
    pub fn quoted_table_name<DB: DatabaseInfo>(&self) -> String {
        DB::qualify(&self.table_name())
    }

    /// 取下一个序列值的 SQL，数据库不支持序列时为 None
    pub fn next_sequence_sql<DB: DatabaseInfo>(&self) -> Option<String> {
        DB::get_driver().next_sequence_sql(&self.sequence_name())
    }

    /// 按声明顺序排列的属性
    pub fn properties(&self) -> &[PersistentProperty] {
        &self.properties
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.column_name()).collect()
    }

    pub fn id_property(&self) -> Option<&PersistentProperty> {
        self.properties.iter().find(|p| p.is_id)
    }

    /// 按列名查找属性（不区分大小写），返回第一个匹配项
    pub fn find_by_column_name(&self, column_name: &str) -> Option<&PersistentProperty> {
        let wanted = column_name.to_lowercase();
        self.properties
            .iter()
            .find(|p| p.column.to_lowercase() == wanted)
    }

    pub fn find_by_property_name(&self, name: &str) -> Option<&PersistentProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// 是否已完成校验（无锁）
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire) == VERIFIED
    }

    /// 当前状态快照
    pub fn state(&self) -> VerificationState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, VerificationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 校验实体结构并发布结果
    ///
    /// 同一实例上的调用串行执行。成功或失败都会唤醒所有等待方；
    /// 已到达终态时直接返回记录的结果，不再重复校验。
    pub fn verify(&self) -> Result<()> {
        let mut state = self.lock_state();
        if state.is_terminal() {
            return self.outcome(&state);
        }

        let result = self.check();
        match &result {
            Ok(()) => {
                *state = VerificationState::Verified;
                self.completed.store(VERIFIED, Ordering::Release);
                tracing::info!("create persistent entity {} done", self.entity_name());
            }
            Err(e) => {
                *state = VerificationState::Failed(e.to_string());
                self.completed.store(FAILED, Ordering::Release);
                tracing::warn!(entity = %self.entity_name(), error = %e, "persistent entity verification failed");
            }
        }
        self.ready.notify_all();
        result
    }

    /// 阻塞直到校验结束
    pub fn wait_completed(&self) -> Result<()> {
        let state = self
            .ready
            .wait_while(self.lock_state(), |s| !s.is_terminal())
            .unwrap_or_else(PoisonError::into_inner);
        self.outcome(&state)
    }

    /// 带超时的等待，超时仍未结束时返回 `Timeout`
    pub fn wait_completed_timeout(&self, timeout: Duration) -> Result<()> {
        let (state, _) = self
            .ready
            .wait_timeout_while(self.lock_state(), timeout, |s| !s.is_terminal())
            .unwrap_or_else(PoisonError::into_inner);
        if !state.is_terminal() {
            return Err(MappingError::Timeout(self.entity_name()));
        }
        self.outcome(&state)
    }

    fn outcome(&self, state: &VerificationState) -> Result<()> {
        match state {
            VerificationState::Verified => Ok(()),
            VerificationState::Failed(reason) => Err(MappingError::VerificationFailed {
                entity: self.entity_name(),
                reason: reason.clone(),
            }),
            VerificationState::Unverified => Err(MappingError::Timeout(self.entity_name())),
        }
    }

    /// 结构检查：属性非空、标识符合法、属性名和列名不重复、最多一个主键
    fn check(&self) -> Result<()> {
        let entity = self.entity_name();
        if self.properties.is_empty() {
            return Err(MappingError::NoProperties(entity));
        }

        let table = self.unqualified_table_name();
        let identifiers = self
            .schema()
            .into_iter()
            .chain(std::iter::once(table.as_str()))
            .chain(self.properties.iter().map(|p| p.column_name()));
        for identifier in identifiers {
            if !is_safe_identifier(identifier) {
                return Err(MappingError::InvalidIdentifier {
                    entity,
                    identifier: identifier.to_string(),
                });
            }
        }

        let mut names = HashSet::new();
        let mut columns = HashSet::new();
        let mut id: Option<&PersistentProperty> = None;
        for property in &self.properties {
            if !names.insert(property.name.as_str()) {
                return Err(MappingError::DuplicateProperty {
                    entity,
                    property: property.name.clone(),
                });
            }
            if !columns.insert(property.column.to_lowercase()) {
                return Err(MappingError::DuplicateColumn {
                    entity,
                    column: property.column.clone(),
                });
            }
            if property.is_id {
                if let Some(first) = id {
                    return Err(MappingError::MultipleIdProperties {
                        entity,
                        first: first.name.clone(),
                        second: property.name.clone(),
                    });
                }
                id = Some(property);
            }
        }
        Ok(())
    }
}
