mod derive_utils;
mod entity;
mod entity_id;
mod field_utils;

use proc_macro::TokenStream;

/// 实体映射宏
///
/// 将具名字段结构体映射为一张表：
/// - 追加（或前置）字段 `pub id: Option<IdType>`；
/// - 其余字段按声明顺序映射为列，可用 `#[column(name = "...")]` 改名，
///   `#[column(skip)]` 的字段不参与持久化，读取时取 `Default`；
/// - 派生 `Debug`（`debug = false` 时不派生）、`Clone`、`Default`；
/// - 实现 `::persistence_core::persistable::Persistable` 与 `sqlx::FromRow<AnyRow>`。
///
/// 参数：`#[entity(table = "users", id = i64, generated = true, debug = true)]`，
/// 其中 `table` 必填，`id` 默认 `i64`，`generated` 默认 `true`。
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 实体 ID 宏
///
/// 用于单字段 `tuple struct` 形式的标识类型（例如 `struct UserId(i64);`），
/// 在内部类型已是标识类型的前提下实现：
/// - `Identifier`、`ValueType` 与 `From<X> for Value`；
/// - `sqlx::Type<Any>` 与 `sqlx::Decode<Any>`（委托给内部类型）；
/// - `Display`、`FromStr` 与内外类型之间的 `From`。
#[proc_macro_attribute]
pub fn entity_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_id::expand(attr, item)
}
