//! 命名约定工具函数
//!
//! 当实体没有显式声明名称时，实体名、表名和列名都由类型名/字段名推导。

/// 字符串是否包含非空白字符（`None`、空串和纯空白都视为未声明）
pub fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// 返回有内容的值，否则返回 `None`
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// 首字母小写：`OrderItem` -> `orderItem`
pub fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 按驼峰拆分
///
/// 拆分点：
/// - 大写字母前面不是大写字母（也不是开头）；
/// - 连续大写字母中，后面紧跟小写字母的那个大写字母之前。
///
/// ```rust,ignore
/// assert_eq!(split_camel_case("OrderItem"), vec!["Order", "Item"]);
/// assert_eq!(split_camel_case("HTTPServer"), vec!["HTTP", "Server"]);
/// assert_eq!(split_camel_case("userID"), vec!["user", "ID"]);
/// ```
pub fn split_camel_case(source: &str) -> Vec<String> {
    let chars: Vec<char> = source.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev_upper = chars[i - 1].is_uppercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if (!prev_upper || next_lower) && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// 驼峰转为小写并用分隔符连接：`OrderItem` + `_` -> `order_item`
pub fn reconcatenate_camel_case(source: &str, delimiter: &str) -> String {
    split_camel_case(source)
        .iter()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// 驼峰转蛇形，列名推导使用
pub fn to_snake_case(source: &str) -> String {
    reconcatenate_camel_case(source, "_")
}

/// 验证标识符（表名、schema、列名）是否安全：非空且只含 `[A-Za-z0-9_]`
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_text() {
        assert!(has_text(Some("users")));
        assert!(!has_text(Some("")));
        assert!(!has_text(Some("   ")));
        assert!(!has_text(None));
        assert_eq!(non_blank(Some(" \t")), None);
        assert_eq!(non_blank(Some("sales")), Some("sales"));
    }

    #[test]
    fn test_uncapitalize() {
        assert_eq!(uncapitalize("Customer"), "customer");
        assert_eq!(uncapitalize("OrderItem"), "orderItem");
        assert_eq!(uncapitalize("URL"), "uRL");
        assert_eq!(uncapitalize(""), "");
    }

    #[test]
    fn test_split_camel_case() {
        assert_eq!(split_camel_case("OrderItem"), vec!["Order", "Item"]);
        assert_eq!(split_camel_case("HTTPServer"), vec!["HTTP", "Server"]);
        assert_eq!(split_camel_case("userID"), vec!["user", "ID"]);
        assert_eq!(split_camel_case("Customer"), vec!["Customer"]);
        assert!(split_camel_case("").is_empty());
    }

    #[test]
    fn test_reconcatenate_camel_case() {
        assert_eq!(reconcatenate_camel_case("OrderItem", "_"), "order_item");
        assert_eq!(reconcatenate_camel_case("Customer", "_"), "customer");
        assert_eq!(reconcatenate_camel_case("HTTPServerLog", "_"), "http_server_log");
        assert_eq!(reconcatenate_camel_case("Order2Item", "_"), "order2_item");
        assert_eq!(reconcatenate_camel_case("OrderItem", "-"), "order-item");
        assert_eq!(to_snake_case("createTime"), "create_time");
        assert_eq!(to_snake_case("user_id"), "user_id");
    }

    #[test]
    fn test_is_safe_identifier() {
        assert!(is_safe_identifier("order_item"));
        assert!(is_safe_identifier("Seq1"));
        assert!(!is_safe_identifier("users; drop table x"));
        assert!(!is_safe_identifier("sales.customer"));
        assert!(!is_safe_identifier(""));
    }

    #[test]
    fn test_is_safe_identifier_ascii_only() {
        assert!(!is_safe_identifier("客户"));
        assert!(!is_safe_identifier("naïve"));
        assert!(!is_safe_identifier("col１"));
    }
}
