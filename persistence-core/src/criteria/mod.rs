//! 条件查询（criteria）
//!
//! 以类型化的条件树描述单实体查询：
//! - `Restrictions` 构造 `Criterion`（比较、LIKE/ILIKE、空值、IN、区间、逻辑组合、原生 SQL）；
//! - `Criteria<T>` 组合条件、排序、分页、缓存标记与行数投影；
//! - 渲染时按 `Persistable` 映射解析属性名，并按 `Dialect` 生成占位符。
//!
mod builder;
mod criterion;
mod restrictions;

pub use builder::{Criteria, Projection, ResultTransformer};
pub use criterion::{Comparison, Criterion, MatchMode, Order};
pub use restrictions::Restrictions;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::sql::Dialect;
    use crate::value::Value;
    use crate::{named_params, params};
    use persistence_macros::entity;

    #[entity(table = "users", id = i64)]
    struct User {
        name: String,
        age: i64,
        manager_id: Option<i64>,
    }

    #[test]
    fn match_mode_patterns() {
        assert_eq!(MatchMode::Exact.to_match_string("ab"), "ab");
        assert_eq!(MatchMode::Start.to_match_string("ab"), "ab%");
        assert_eq!(MatchMode::End.to_match_string("ab"), "%ab");
        assert_eq!(MatchMode::Anywhere.to_match_string("ab"), "%ab%");
    }

    #[test]
    fn select_without_criterions() {
        let stmt = Criteria::<User>::for_entity()
            .to_statement(Dialect::Postgres)
            .unwrap();
        assert_eq!(stmt.sql, "SELECT id, name, age, manager_id FROM users");
        assert!(stmt.values.is_empty());
    }

    #[test]
    fn ilike_lowercases_column_and_pattern() {
        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::ilike("name", "ALI", MatchMode::Anywhere))
            .to_statement(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, name, age, manager_id FROM users WHERE lower(name) LIKE ?"
        );
        assert_eq!(stmt.values, vec![Value::Text("%ali%".into())]);
    }

    #[test]
    fn criterions_are_and_ed_with_order_and_range() {
        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::ge("age", 18))
            .add(Restrictions::or(
                Restrictions::is_null("manager_id"),
                Restrictions::eq("manager_id", 1),
            ))
            .add_order(Order::desc("age"))
            .set_first_result(Some(10))
            .set_max_results(Some(5))
            .to_statement(Dialect::Postgres)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, name, age, manager_id FROM users WHERE age >= $1 AND \
             (manager_id IS NULL OR manager_id = $2) ORDER BY age DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(stmt.values, params![18, 1]);
    }

    #[test]
    fn count_projection_uses_transformer() {
        let distinct = Criteria::<User>::for_entity()
            .set_projection(Projection::RowCount)
            .add(Restrictions::in_values("age", [20, 30]))
            .to_statement(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            distinct.sql,
            "SELECT COUNT(DISTINCT id) FROM users WHERE age IN (?, ?)"
        );

        let plain = Criteria::<User>::for_entity()
            .set_projection(Projection::RowCount)
            .set_result_transformer(ResultTransformer::RootEntity)
            .to_statement(Dialect::Sqlite)
            .unwrap();
        assert_eq!(plain.sql, "SELECT COUNT(*) FROM users");
    }

    #[test]
    fn empty_junctions_and_in_lists() {
        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::in_values::<i64>("age", []))
            .add(Restrictions::conjunction([]))
            .add(Restrictions::disjunction([]))
            .to_statement(Dialect::Sqlite)
            .unwrap();
        assert!(stmt.sql.ends_with("WHERE 1=0 AND 1=1 AND 1=0"));
    }

    #[test]
    fn unknown_property_is_rejected() {
        let err = Criteria::<User>::for_entity()
            .add(Restrictions::eq("password", "x"))
            .to_statement(Dialect::Sqlite)
            .unwrap_err();
        match err {
            PersistenceError::UnknownProperty { property, entity } => {
                assert_eq!(property, "password");
                assert_eq!(entity, "User");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn not_between_and_property_comparison() {
        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::not(Restrictions::between("age", 1, 9)))
            .add(Restrictions::ne_property("id", "manager_id"))
            .add(Restrictions::id_eq(3))
            .to_statement(Dialect::Postgres)
            .unwrap();
        assert!(stmt.sql.ends_with(
            "WHERE NOT (age BETWEEN $1 AND $2) AND id <> manager_id AND id = $3"
        ));
    }

    #[test]
    fn all_eq_maps_nulls_to_is_null() {
        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::all_eq(named_params! {
                "name" => "bob",
                "manager_id" => Option::<i64>::None,
            }))
            .to_statement(Dialect::Sqlite)
            .unwrap();
        assert!(stmt.sql.ends_with("WHERE (manager_id IS NULL AND name = ?)"));
    }

    #[test]
    fn sql_restriction_rewrites_placeholders() {
        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::sql_restriction("length(name) > ?", params![3]))
            .to_statement(Dialect::Postgres)
            .unwrap();
        assert!(stmt.sql.ends_with("WHERE (length(name) > $1)"));

        let err = Criteria::<User>::for_entity()
            .add(Restrictions::sql_restriction("age = ? OR age = ?", params![3]))
            .to_statement(Dialect::Postgres)
            .unwrap_err();
        assert!(matches!(err, PersistenceError::QueryParameter { .. }));
    }

    #[test]
    fn sql_restriction_leaves_literals_and_comments_alone() {
        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::sql_restriction(
                "name <> 'who?' AND /* ? */ length(name) > ?",
                params![3],
            ))
            .to_statement(Dialect::Postgres)
            .unwrap();
        assert!(stmt.sql.ends_with("WHERE (name <> 'who?' AND /* ? */ length(name) > $1)"));
        assert_eq!(stmt.values, params![3]);

        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::sql_restriction("age > ? -- adults?", params![17]))
            .add(Restrictions::eq("name", "bob"))
            .to_statement(Dialect::Sqlite)
            .unwrap();
        assert!(stmt.sql.ends_with("WHERE (age > ? -- adults?\n) AND name = ?"));
        assert_eq!(stmt.values, params![17, "bob"]);
    }

    #[test]
    fn greater_than_property_comparisons() {
        let stmt = Criteria::<User>::for_entity()
            .add(Restrictions::gt_property("age", "manager_id"))
            .add(Restrictions::ge_property("id", "manager_id"))
            .to_statement(Dialect::Sqlite)
            .unwrap();
        assert!(stmt.sql.ends_with("WHERE age > manager_id AND id >= manager_id"));

        let err = Criteria::<User>::for_entity()
            .add(Restrictions::gt_property("age", "salary"))
            .to_statement(Dialect::Sqlite)
            .unwrap_err();
        assert!(matches!(err, PersistenceError::UnknownProperty { .. }));
    }
}
