//! 映射上下文
//!
//! 持有所有实体元数据，负责注册、查找和统一校验。

use crate::entity::EntityMetadata;
use crate::error::{MappingError, Result};
use crate::macros_api::{Entity, EntitySchema, EntityType};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Default)]
pub struct MappingContext {
    /// 注册顺序
    entities: Vec<Arc<EntityMetadata>>,
    /// 实体名 -> entities 下标
    by_name: HashMap<String, usize>,
}

impl MappingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON schema 字符串创建上下文
    ///
    /// ```rust,ignore
    /// let ctx = MappingContext::from_schema_str(r#"{
    ///     "entities": [
    ///         { "simple_name": "Customer", "properties": [{ "name": "id", "id": true }] }
    ///     ]
    /// }"#)?;
    /// ```
    pub fn from_schema_str(json: &str) -> Result<Self> {
        let schema: EntitySchema = serde_json::from_str(json)?;
        let mut ctx = Self::new();
        for entity_type in schema.entities {
            ctx.add_type(entity_type)?;
        }
        Ok(ctx)
    }

    pub fn from_schema_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_schema_str(&json)
    }

    /// 注册 derive(Entity) 的类型
    pub fn add<T: Entity>(&mut self) -> Result<Arc<EntityMetadata>> {
        self.add_type(T::entity_type())
    }

    /// 注册实体类型，实体名重复时返回 `DuplicateEntity`
    pub fn add_type(&mut self, entity_type: EntityType) -> Result<Arc<EntityMetadata>> {
        let metadata = Arc::new(EntityMetadata::new(entity_type));
        let name = metadata.entity_name();
        if self.by_name.contains_key(&name) {
            return Err(MappingError::DuplicateEntity(name));
        }

        tracing::debug!(entity = %name, table = %metadata.table_name(), "register persistent entity");
        self.by_name.insert(name, self.entities.len());
        self.entities.push(Arc::clone(&metadata));
        Ok(metadata)
    }

    /// 按实体名查找
    pub fn entity(&self, name: &str) -> Option<Arc<EntityMetadata>> {
        self.by_name
            .get(name)
            .map(|&index| Arc::clone(&self.entities[index]))
    }

    /// 按表名查找（不区分大小写，带 schema 时需写全）
    pub fn entity_by_table(&self, table: &str) -> Option<Arc<EntityMetadata>> {
        self.entities
            .iter()
            .find(|e| e.table_name().eq_ignore_ascii_case(table))
            .cloned()
    }

    /// 按类型查找已注册的元数据
    pub fn entity_for<T: Entity>(&self) -> Option<Arc<EntityMetadata>> {
        let entity_type = T::entity_type();
        self.entities
            .iter()
            .find(|e| *e.entity_type() == entity_type)
            .cloned()
    }

    /// 按注册顺序返回所有实体
    pub fn entities(&self) -> &[Arc<EntityMetadata>] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// 并发校验所有实体，返回注册顺序中第一个失败
    ///
    /// 工作线程数不超过 `available_parallelism`。
    pub fn verify_all(&self) -> Result<()> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.verify_all_with_workers(workers)
    }

    /// 用最多 `workers` 个线程校验所有实体
    ///
    /// 实体按注册顺序分块，每块一个线程；线程创建失败时该块在当前线程校验。
    pub fn verify_all_with_workers(&self, workers: usize) -> Result<()> {
        if self.entities.is_empty() {
            tracing::info!("verified 0 persistent entities");
            return Ok(());
        }
        let chunk_size = self.entities.len().div_ceil(workers.max(1));

        let results: Vec<Result<()>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .entities
                .chunks(chunk_size)
                .map(|chunk| {
                    let spawned = thread::Builder::new()
                        .name("sqlxmeta-verify".to_string())
                        .spawn_scoped(scope, move || verify_chunk(chunk));
                    match spawned {
                        Ok(handle) => (chunk, Some(handle)),
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to spawn verification thread, verifying inline");
                            (chunk, None)
                        }
                    }
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|(chunk, handle)| match handle {
                    Some(handle) => handle.join().unwrap_or_else(|_| {
                        chunk
                            .iter()
                            .map(|entity| {
                                if entity.is_completed() {
                                    Ok(())
                                } else {
                                    Err(MappingError::VerificationFailed {
                                        entity: entity.entity_name(),
                                        reason: "verification thread panicked".to_string(),
                                    })
                                }
                            })
                            .collect()
                    }),
                    None => verify_chunk(chunk),
                })
                .collect()
        });

        let total = results.len();
        for result in results {
            result?;
        }
        tracing::info!("verified {} persistent entities", total);
        Ok(())
    }
}

fn verify_chunk(chunk: &[Arc<EntityMetadata>]) -> Vec<Result<()>> {
    chunk.iter().map(|entity| entity.verify()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::VerificationState;
    use crate::macros_api::{EntityAnnotation, PropertyDef};
    use std::io::Write;
    use std::time::Duration;

    const SCHEMA: &str = r#"{
        "entities": [
            {
                "simple_name": "Customer",
                "properties": [
                    { "name": "id", "id": true },
                    { "name": "userId" }
                ]
            },
            {
                "simple_name": "OrderItem",
                "annotation": { "name": "item", "table": "cust_tbl", "schema": "sales" },
                "properties": [
                    { "name": "id", "id": true },
                    { "name": "sku", "column": "SKU_CODE" }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_from_schema_str() {
        let ctx = MappingContext::from_schema_str(SCHEMA).unwrap();
        assert_eq!(ctx.len(), 2);

        let customer = ctx.entity("customer").unwrap();
        assert_eq!(customer.table_name(), "customer");
        assert_eq!(customer.sequence_name(), "seq_customer");

        let item = ctx.entity("item").unwrap();
        assert_eq!(item.table_name(), "sales.cust_tbl");
        assert_eq!(item.sequence_name(), "sales.seq_cust_tbl");
        assert_eq!(item.find_by_column_name("sku_code").unwrap().name(), "sku");

        assert!(ctx.entity("orderItem").is_none());
    }

    #[test]
    fn test_from_schema_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCHEMA.as_bytes()).unwrap();
        let ctx = MappingContext::from_schema_file(file.path()).unwrap();
        assert_eq!(ctx.entities()[1].entity_name(), "item");
    }

    #[test]
    fn test_invalid_schema() {
        assert!(matches!(
            MappingContext::from_schema_str("{ \"entities\": 3 }"),
            Err(MappingError::Schema(_))
        ));
        assert!(matches!(
            MappingContext::from_schema_file("/nonexistent/schema.json"),
            Err(MappingError::Io(_))
        ));
    }

    #[test]
    fn test_duplicate_entity() {
        let mut ctx = MappingContext::new();
        ctx.add_type(EntityType::new("Customer")).unwrap();
        let annotated = EntityType::new("Client").annotation(EntityAnnotation {
            name: Some("customer".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            ctx.add_type(annotated),
            Err(MappingError::DuplicateEntity(ref name)) if name == "customer"
        ));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_entity_by_table() {
        let ctx = MappingContext::from_schema_str(SCHEMA).unwrap();
        assert_eq!(
            ctx.entity_by_table("SALES.CUST_TBL").unwrap().entity_name(),
            "item"
        );
        assert!(ctx.entity_by_table("cust_tbl").is_none());
    }

    #[test]
    fn test_verify_all() {
        let ctx = MappingContext::from_schema_str(SCHEMA).unwrap();
        assert!(ctx.entities().iter().all(|e| !e.is_completed()));
        ctx.verify_all().unwrap();
        assert!(ctx.entities().iter().all(|e| e.is_completed()));
    }

    #[test]
    fn test_verify_all_reports_failure() {
        let mut ctx = MappingContext::new();
        ctx.add_type(EntityType::new("Customer").property(PropertyDef::new("id").id()))
            .unwrap();
        let broken = ctx.add_type(EntityType::new("Broken")).unwrap();

        assert!(matches!(
            ctx.verify_all(),
            Err(MappingError::NoProperties(ref name)) if name == "broken"
        ));
        assert!(ctx.entity("customer").unwrap().is_completed());
        assert!(matches!(broken.state(), VerificationState::Failed(_)));
        // 等待方不会被挂起
        assert!(broken.wait_completed_timeout(Duration::from_millis(10)).is_err());
    }

    fn many_entities(count: usize) -> MappingContext {
        let mut ctx = MappingContext::new();
        for i in 0..count {
            let entity_type =
                EntityType::new(format!("Entity{}", i)).property(PropertyDef::new("id").id());
            ctx.add_type(entity_type).unwrap();
        }
        ctx
    }

    #[test]
    fn test_verify_all_with_workers() {
        for workers in [0, 1, 3, 64] {
            let ctx = many_entities(50);
            ctx.verify_all_with_workers(workers).unwrap();
            assert!(ctx.entities().iter().all(|e| e.is_completed()));
        }

        MappingContext::new().verify_all_with_workers(4).unwrap();
    }

    #[test]
    fn test_verify_all_with_workers_reports_first_failure() {
        let mut ctx = many_entities(10);
        ctx.add_type(EntityType::new("FirstBroken")).unwrap();
        ctx.add_type(
            EntityType::new("SecondBroken")
                .property(PropertyDef::new("id").id())
                .property(PropertyDef::new("code").id()),
        )
        .unwrap();

        assert!(matches!(
            ctx.verify_all_with_workers(3),
            Err(MappingError::NoProperties(ref name)) if name == "firstBroken"
        ));
        // 其余实体仍然全部校验过
        assert!(ctx.entities()[..10].iter().all(|e| e.is_completed()));
        assert!(matches!(
            ctx.entity("secondBroken").unwrap().state(),
            VerificationState::Failed(_)
        ));
    }
}
