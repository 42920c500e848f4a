use serde::Serialize;
use sqlxmeta::{DbDriver, EntityMetadata};

/// 单个实体的映射信息
#[derive(Debug, Serialize)]
pub struct EntityReport {
    pub entity: String,
    pub simple_name: String,
    pub table: String,
    pub sequence: String,
    pub quoted_table: String,
    pub next_sequence_sql: Option<String>,
    pub id_column: Option<String>,
    pub columns: Vec<ColumnReport>,
}

#[derive(Debug, Serialize)]
pub struct ColumnReport {
    pub property: String,
    pub column: String,
    pub id: bool,
}

impl EntityReport {
    pub fn new(meta: &EntityMetadata, driver: DbDriver) -> Self {
        let table = meta.table_name();
        let sequence = meta.sequence_name();
        Self {
            entity: meta.entity_name(),
            simple_name: meta.simple_name().to_string(),
            quoted_table: driver.qualify(&table),
            next_sequence_sql: driver.next_sequence_sql(&sequence),
            table,
            sequence,
            id_column: meta.id_property().map(|p| p.column_name().to_string()),
            columns: meta
                .properties()
                .iter()
                .map(|p| ColumnReport {
                    property: p.name().to_string(),
                    column: p.column_name().to_string(),
                    id: p.is_id(),
                })
                .collect(),
        }
    }

    pub fn print(&self) {
        println!("\n📦 {} ({})", self.entity, self.simple_name);
        println!("   Table:    {}", self.table);
        println!("   Quoted:   {}", self.quoted_table);
        println!("   Sequence: {}", self.sequence);
        if let Some(sql) = &self.next_sequence_sql {
            println!("   Next id:  {}", sql);
        }
        println!("   Columns:");
        for column in &self.columns {
            let marker = if column.id { " (id)" } else { "" };
            println!("     - {} -> {}{}", column.property, column.column, marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlxmeta::{EntityAnnotation, EntityType, PropertyDef};

    #[test]
    fn test_report_for_annotated_entity() {
        let meta = EntityMetadata::new(
            EntityType::new("Customer")
                .annotation(EntityAnnotation {
                    table: Some("cust_tbl".to_string()),
                    schema: Some("sales".to_string()),
                    ..Default::default()
                })
                .property(PropertyDef::new("id").id())
                .property(PropertyDef::new("userId")),
        );

        let report = EntityReport::new(&meta, DbDriver::Postgres);
        assert_eq!(report.entity, "customer");
        assert_eq!(report.table, "sales.cust_tbl");
        assert_eq!(report.quoted_table, "\"sales\".\"cust_tbl\"");
        assert_eq!(report.sequence, "sales.seq_cust_tbl");
        assert_eq!(report.id_column.as_deref(), Some("id"));
        assert_eq!(report.columns[1].column, "user_id");

        let sqlite = EntityReport::new(&meta, DbDriver::Sqlite);
        assert_eq!(sqlite.next_sequence_sql, None);
    }
}
