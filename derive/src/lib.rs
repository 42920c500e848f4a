use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse::Parser, parse_macro_input, punctuated::Punctuated, Data, DataStruct, DeriveInput,
    Fields, Meta,
};

/// 生成 Entity trait 的实现
///
/// 只收集声明信息（类型名、注解、字段），名称推导在运行时由 `EntityMetadata` 完成。
///
/// 使用示例：
/// ```ignore
/// // 全部使用命名约定：实体名 customer，表名 customer，序列 seq_customer
/// #[derive(Entity)]
/// struct Customer {
///     #[id]
///     id: i64,
///     user_id: i64,
/// }
///
/// // 显式声明表名和 schema：表名 sales.cust_tbl，序列 sales.seq_cust_tbl
/// #[derive(Entity)]
/// #[entity(table = "cust_tbl", schema = "sales")]
/// struct SalesCustomer {
///     #[id]
///     id: i64,
///     #[column(name = "full_name")]
///     name: String,
///     #[skip]
///     cache: Option<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, column, id, skip))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_entity(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let simple_name = unraw(name);

    // 解析 #[entity(name = "...", table = "...", schema = "...")]
    let mut annotated = false;
    let mut entity_name = None;
    let mut table_name = None;
    let mut schema_name = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        annotated = true;
        // 允许 #[entity] 不带参数
        if let Meta::Path(_) = &attr.meta {
            continue;
        }
        for meta in parse_list(&attr.meta)? {
            let Meta::NameValue(nv) = &meta else {
                return Err(syn::Error::new_spanned(&meta, "expected `key = \"value\"`"));
            };
            let value = lit_str(&nv.value)?;
            if nv.path.is_ident("name") {
                entity_name = Some(value);
            } else if nv.path.is_ident("table") {
                table_name = Some(value);
            } else if nv.path.is_ident("schema") {
                schema_name = Some(value);
            } else {
                return Err(syn::Error::new_spanned(
                    &nv.path,
                    "unknown entity attribute, expected `name`, `table` or `schema`",
                ));
            }
        }
    }

    let annotation = if annotated {
        let entity_name = opt_string(entity_name);
        let table_name = opt_string(table_name);
        let schema_name = opt_string(schema_name);
        quote! {
            Some(sqlxmeta::EntityAnnotation {
                name: #entity_name,
                table: #table_name,
                schema: #schema_name,
            })
        }
    } else {
        quote! { None }
    };

    // 获取字段列表（必须是具名字段的结构体）
    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Entity derive only supports structs with named fields",
            ));
        }
    };

    let mut properties = Vec::new();
    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };

        let mut skip = false;
        let mut is_id = false;
        let mut column = None;
        for attr in &field.attrs {
            if attr.path().is_ident("skip") {
                skip = true;
            } else if attr.path().is_ident("id") {
                is_id = true;
            } else if attr.path().is_ident("column") {
                for meta in parse_list(&attr.meta)? {
                    match &meta {
                        Meta::NameValue(nv) if nv.path.is_ident("name") => {
                            column = Some(lit_str(&nv.value)?);
                        }
                        Meta::Path(path) if path.is_ident("id") => is_id = true,
                        Meta::Path(path) if path.is_ident("skip") => skip = true,
                        _ => {
                            return Err(syn::Error::new_spanned(
                                &meta,
                                "unknown column attribute, expected `name = \"...\"`, `id` or `skip`",
                            ));
                        }
                    }
                }
            }
        }
        if skip {
            continue;
        }

        let property_name = unraw(field_ident);
        let column = opt_string(column);
        properties.push(quote! {
            sqlxmeta::PropertyDef {
                name: #property_name.to_string(),
                column: #column,
                id: #is_id,
            }
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics sqlxmeta::Entity for #name #ty_generics #where_clause {
            fn entity_type() -> sqlxmeta::EntityType {
                sqlxmeta::EntityType {
                    simple_name: #simple_name.to_string(),
                    annotation: #annotation,
                    properties: vec![#(#properties),*],
                }
            }
        }
    })
}

/// 声明方法执行的语句类型
///
/// 可选值：select（默认）、insert、update、delete，不区分大小写，非法值在编译期报错。
/// 展开后保留原函数，并在同一作用域生成常量 `<FN_NAME>_MODIFYING`，
/// 执行层据此选择查询或写操作。适用于自由函数、固有 impl 方法和 trait 声明。
///
/// 使用示例：
/// ```ignore
/// impl CustomerRepository {
///     #[modifying("update")]
///     async fn deactivate(&self, id: i64) -> sqlxmeta::Result<u64> { ... }
/// }
///
/// assert_eq!(CustomerRepository::DEACTIVATE_MODIFYING, ModifyingKind::Update);
/// ```
#[proc_macro_attribute]
pub fn modifying(attr: TokenStream, item: TokenStream) -> TokenStream {
    match expand_modifying(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_modifying(
    attr: proc_macro2::TokenStream,
    item: proc_macro2::TokenStream,
) -> syn::Result<proc_macro2::TokenStream> {
    let kind = parse_modifying_kind(attr)?;

    // 带函数体的函数/方法，或不带函数体的 trait 方法声明
    let (vis, ident) = if let Ok(func) = syn::parse2::<syn::ItemFn>(item.clone()) {
        (func.vis, func.sig.ident)
    } else {
        let func = syn::parse2::<syn::TraitItemFn>(item.clone())?;
        (syn::Visibility::Inherited, func.sig.ident)
    };

    let const_name = format_ident!("{}_MODIFYING", unraw(&ident).to_uppercase());
    let variant = format_ident!("{}", kind);
    Ok(quote! {
        #item
        #[allow(dead_code)]
        #vis const #const_name: sqlxmeta::ModifyingKind = sqlxmeta::ModifyingKind::#variant;
    })
}

/// 解析 `("update")` 或 `(value = "update")`，为空时为 select
fn parse_modifying_kind(attr: proc_macro2::TokenStream) -> syn::Result<&'static str> {
    if attr.is_empty() {
        return Ok("Select");
    }

    let lit = if let Ok(lit) = syn::parse2::<syn::LitStr>(attr.clone()) {
        lit
    } else {
        let nv = syn::parse2::<syn::MetaNameValue>(attr)?;
        if !nv.path.is_ident("value") {
            return Err(syn::Error::new_spanned(&nv.path, "expected `value = \"...\"`"));
        }
        match &nv.value {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(s),
                ..
            }) => s.clone(),
            other => return Err(syn::Error::new_spanned(other, "expected a string literal")),
        }
    };

    match lit.value().to_ascii_lowercase().as_str() {
        "select" => Ok("Select"),
        "insert" => Ok("Insert"),
        "update" => Ok("Update"),
        "delete" => Ok("Delete"),
        _ => Err(syn::Error::new_spanned(
            lit,
            "expected one of \"select\", \"insert\", \"update\", \"delete\"",
        )),
    }
}

/// 解析 `#[attr(a = "..", b)]` 的参数列表
fn parse_list(meta: &Meta) -> syn::Result<Punctuated<Meta, syn::Token![,]>> {
    match meta {
        Meta::List(list) => {
            let parser = Punctuated::<Meta, syn::Token![,]>::parse_terminated;
            parser.parse2(list.tokens.clone())
        }
        _ => Err(syn::Error::new_spanned(meta, "expected a parenthesized list")),
    }
}

fn lit_str(expr: &syn::Expr) -> syn::Result<String> {
    if let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Str(s),
        ..
    }) = expr
    {
        Ok(s.value())
    } else {
        Err(syn::Error::new_spanned(expr, "expected a string literal"))
    }
}

fn opt_string(value: Option<String>) -> proc_macro2::TokenStream {
    match value {
        Some(v) => quote! { Some(#v.to_string()) },
        None => quote! { None },
    }
}

/// 去掉原始标识符的 `r#` 前缀
fn unraw(ident: &syn::Ident) -> String {
    let s = ident.to_string();
    s.strip_prefix("r#").map(str::to_string).unwrap_or(s)
}
