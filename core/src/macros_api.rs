//! 宏接口模块，供 proc-macro crate 使用
//!
//! `derive(Entity)` 生成的代码只构造这里的纯数据类型；
//! 同样的结构也可以从 JSON schema 文件反序列化得到。

use serde::{Deserialize, Serialize};

/// 实体注解，对应 `#[entity(name = "...", table = "...", schema = "...")]`
///
/// 空串或纯空白的值等同于未声明，会回退到命名约定。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

/// 字段声明，由 derive(Entity) 生成
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// 字段名
    pub name: String,
    /// 列名：None 表示使用字段名的蛇形命名
    #[serde(default)]
    pub column: Option<String>,
    /// 是否主键
    #[serde(default)]
    pub id: bool,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
            id: false,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }
}

/// 实体类型信息，由 derive(Entity) 生成
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    /// 类型名（不含路径），如 `OrderItem`
    pub simple_name: String,
    #[serde(default)]
    pub annotation: Option<EntityAnnotation>,
    /// 字段列表，保持声明顺序
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

impl EntityType {
    pub fn new(simple_name: impl Into<String>) -> Self {
        Self {
            simple_name: simple_name.into(),
            annotation: None,
            properties: Vec::new(),
        }
    }

    pub fn annotation(mut self, annotation: EntityAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }
}

/// 实体 schema 文件的顶层结构：`{ "entities": [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySchema {
    #[serde(default)]
    pub entities: Vec<EntityType>,
}

/// 可映射实体，由 `#[derive(Entity)]` 实现
pub trait Entity {
    fn entity_type() -> EntityType;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defaults() {
        let schema: EntitySchema = serde_json::from_str(
            r#"{ "entities": [ { "simple_name": "Customer", "properties": [ { "name": "id", "id": true } ] } ] }"#,
        )
        .unwrap();
        let customer = &schema.entities[0];
        assert_eq!(customer.simple_name, "Customer");
        assert!(customer.annotation.is_none());
        assert_eq!(customer.properties, vec![PropertyDef::new("id").id()]);
    }

    #[test]
    fn test_annotation_partial_fields() {
        let annotation: EntityAnnotation =
            serde_json::from_str(r#"{ "table": "cust_tbl" }"#).unwrap();
        assert_eq!(annotation.table.as_deref(), Some("cust_tbl"));
        assert_eq!(annotation.name, None);
        assert_eq!(annotation.schema, None);
    }
}
