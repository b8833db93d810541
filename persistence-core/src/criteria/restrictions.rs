use super::criterion::{Comparison, Criterion, MatchMode};
use crate::value::Value;
use std::collections::BTreeMap;

/// 条件工厂
pub struct Restrictions;

impl Restrictions {
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        compare(property, Comparison::Eq, value)
    }

    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        compare(property, Comparison::Ne, value)
    }

    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        compare(property, Comparison::Gt, value)
    }

    pub fn ge(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        compare(property, Comparison::Ge, value)
    }

    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        compare(property, Comparison::Lt, value)
    }

    pub fn le(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        compare(property, Comparison::Le, value)
    }

    pub fn id_eq(value: impl Into<Value>) -> Criterion {
        Criterion::IdEq(value.into())
    }

    pub fn eq_property(property: impl Into<String>, other: impl Into<String>) -> Criterion {
        compare_property(property, Comparison::Eq, other)
    }

    pub fn ne_property(property: impl Into<String>, other: impl Into<String>) -> Criterion {
        compare_property(property, Comparison::Ne, other)
    }

    pub fn gt_property(property: impl Into<String>, other: impl Into<String>) -> Criterion {
        compare_property(property, Comparison::Gt, other)
    }

    pub fn ge_property(property: impl Into<String>, other: impl Into<String>) -> Criterion {
        compare_property(property, Comparison::Ge, other)
    }

    pub fn lt_property(property: impl Into<String>, other: impl Into<String>) -> Criterion {
        compare_property(property, Comparison::Lt, other)
    }

    pub fn le_property(property: impl Into<String>, other: impl Into<String>) -> Criterion {
        compare_property(property, Comparison::Le, other)
    }

    /// 大小写敏感的 LIKE，模式原样使用
    pub fn like(property: impl Into<String>, pattern: impl Into<String>) -> Criterion {
        Criterion::Like {
            property: property.into(),
            pattern: pattern.into(),
            ignore_case: false,
        }
    }

    pub fn like_with(property: impl Into<String>, value: &str, mode: MatchMode) -> Criterion {
        Criterion::Like {
            property: property.into(),
            pattern: mode.to_match_string(value),
            ignore_case: false,
        }
    }

    /// 大小写不敏感的 LIKE
    pub fn ilike(property: impl Into<String>, value: &str, mode: MatchMode) -> Criterion {
        Criterion::Like {
            property: property.into(),
            pattern: mode.to_match_string(value),
            ignore_case: true,
        }
    }

    pub fn is_null(property: impl Into<String>) -> Criterion {
        Criterion::IsNull(property.into())
    }

    pub fn is_not_null(property: impl Into<String>) -> Criterion {
        Criterion::IsNotNull(property.into())
    }

    pub fn in_values<V: Into<Value>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Criterion {
        Criterion::In {
            property: property.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn between(
        property: impl Into<String>,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> Criterion {
        Criterion::Between {
            property: property.into(),
            lo: lo.into(),
            hi: hi.into(),
        }
    }

    pub fn and(lhs: Criterion, rhs: Criterion) -> Criterion {
        Criterion::And(vec![lhs, rhs])
    }

    pub fn or(lhs: Criterion, rhs: Criterion) -> Criterion {
        Criterion::Or(vec![lhs, rhs])
    }

    pub fn not(criterion: Criterion) -> Criterion {
        Criterion::Not(Box::new(criterion))
    }

    pub fn conjunction(items: impl IntoIterator<Item = Criterion>) -> Criterion {
        Criterion::And(items.into_iter().collect())
    }

    pub fn disjunction(items: impl IntoIterator<Item = Criterion>) -> Criterion {
        Criterion::Or(items.into_iter().collect())
    }

    /// 属性全部相等（值为 NULL 时渲染为 IS NULL）
    pub fn all_eq(properties: BTreeMap<String, Value>) -> Criterion {
        Criterion::And(
            properties
                .into_iter()
                .map(|(property, value)| {
                    if value.is_null() {
                        Criterion::IsNull(property)
                    } else {
                        compare(property, Comparison::Eq, value)
                    }
                })
                .collect(),
        )
    }

    /// 原生 SQL 条件，参数以 `?` 标记
    pub fn sql_restriction(sql: impl Into<String>, values: Vec<Value>) -> Criterion {
        Criterion::Sql {
            sql: sql.into(),
            values,
        }
    }
}

fn compare(property: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Criterion {
    Criterion::Compare {
        property: property.into(),
        op,
        value: value.into(),
    }
}

fn compare_property(
    property: impl Into<String>,
    op: Comparison,
    other: impl Into<String>,
) -> Criterion {
    Criterion::CompareProperty {
        property: property.into(),
        op,
        other: other.into(),
    }
}
