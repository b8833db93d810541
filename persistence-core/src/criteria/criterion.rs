use crate::error::{PersistenceError, PersistenceResult};
use crate::persistable::Persistable;
use crate::query::copy_literal_or_comment;
use crate::sql::SqlBuilder;
use crate::value::Value;

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    fn as_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => " = ",
            Comparison::Ne => " <> ",
            Comparison::Gt => " > ",
            Comparison::Ge => " >= ",
            Comparison::Lt => " < ",
            Comparison::Le => " <= ",
        }
    }
}

/// LIKE 匹配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    Start,
    End,
    Anywhere,
}

impl MatchMode {
    /// 将普通字符串转换为对应的 LIKE 模式
    pub fn to_match_string(&self, pattern: &str) -> String {
        match self {
            MatchMode::Exact => pattern.to_string(),
            MatchMode::Start => format!("{pattern}%"),
            MatchMode::End => format!("%{pattern}"),
            MatchMode::Anywhere => format!("%{pattern}%"),
        }
    }
}

/// 查询条件
///
/// 属性名在渲染时按实体映射解析，未映射的属性会被拒绝。
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Compare {
        property: String,
        op: Comparison,
        value: Value,
    },
    CompareProperty {
        property: String,
        op: Comparison,
        other: String,
    },
    IdEq(Value),
    Like {
        property: String,
        pattern: String,
        ignore_case: bool,
    },
    IsNull(String),
    IsNotNull(String),
    In {
        property: String,
        values: Vec<Value>,
    },
    Between {
        property: String,
        lo: Value,
        hi: Value,
    },
    And(Vec<Criterion>),
    Or(Vec<Criterion>),
    Not(Box<Criterion>),
    Sql {
        sql: String,
        values: Vec<Value>,
    },
}

impl Criterion {
    /// 渲染为 WHERE 子句片段
    pub fn render<T: Persistable>(&self, b: &mut SqlBuilder) -> PersistenceResult<()> {
        match self {
            Criterion::Compare {
                property,
                op,
                value,
            } => {
                b.push(resolve::<T>(property)?)
                    .push(op.as_sql())
                    .push_bind(value.clone());
            }
            Criterion::CompareProperty {
                property,
                op,
                other,
            } => {
                b.push(resolve::<T>(property)?)
                    .push(op.as_sql())
                    .push(resolve::<T>(other)?);
            }
            Criterion::IdEq(value) => {
                b.push(T::ID_COLUMN).push(" = ").push_bind(value.clone());
            }
            Criterion::Like {
                property,
                pattern,
                ignore_case,
            } => {
                let column = resolve::<T>(property)?;
                if *ignore_case {
                    b.push("lower(")
                        .push(column)
                        .push(") LIKE ")
                        .push_bind(Value::Text(pattern.to_lowercase()));
                } else {
                    b.push(column)
                        .push(" LIKE ")
                        .push_bind(Value::Text(pattern.clone()));
                }
            }
            Criterion::IsNull(property) => {
                b.push(resolve::<T>(property)?).push(" IS NULL");
            }
            Criterion::IsNotNull(property) => {
                b.push(resolve::<T>(property)?).push(" IS NOT NULL");
            }
            Criterion::In { property, values } => {
                let column = resolve::<T>(property)?;
                if values.is_empty() {
                    b.push("1=0");
                } else {
                    b.push(column)
                        .push(" IN (")
                        .push_binds(values.iter().cloned())
                        .push(")");
                }
            }
            Criterion::Between { property, lo, hi } => {
                b.push(resolve::<T>(property)?)
                    .push(" BETWEEN ")
                    .push_bind(lo.clone())
                    .push(" AND ")
                    .push_bind(hi.clone());
            }
            Criterion::And(items) => render_junction::<T>(b, items, " AND ", "1=1")?,
            Criterion::Or(items) => render_junction::<T>(b, items, " OR ", "1=0")?,
            Criterion::Not(inner) => {
                b.push("NOT (");
                inner.render::<T>(b)?;
                b.push(")");
            }
            Criterion::Sql { sql, values } => render_sql_restriction(b, sql, values)?,
        }
        Ok(())
    }
}

fn render_junction<T: Persistable>(
    b: &mut SqlBuilder,
    items: &[Criterion],
    separator: &str,
    empty: &str,
) -> PersistenceResult<()> {
    if items.is_empty() {
        b.push(empty);
        return Ok(());
    }
    b.push("(");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            b.push(separator);
        }
        item.render::<T>(b)?;
    }
    b.push(")");
    Ok(())
}

// 原生 SQL 条件中以 `?` 标记参数，按方言重写占位符；字面量与注释中的 `?` 保持原样
fn render_sql_restriction(b: &mut SqlBuilder, sql: &str, values: &[Value]) -> PersistenceResult<()> {
    let mut remaining = values.iter();
    let mut chars = sql.chars().peekable();
    let mut open_line_comment = false;
    b.push("(");
    while let Some(c) = chars.next() {
        let line_comment = c == '-' && chars.peek() == Some(&'-');
        if copy_literal_or_comment(c, &mut chars, b) {
            open_line_comment = line_comment && chars.peek().is_none() && !sql.ends_with('\n');
            continue;
        }
        if c == '?' {
            let value = remaining.next().ok_or_else(|| PersistenceError::QueryParameter {
                reason: format!("sql restriction has more placeholders than values: {sql}"),
            })?;
            b.push_bind(value.clone());
        } else {
            b.push_char(c);
        }
    }
    b.push(if open_line_comment { "\n)" } else { ")" });
    if remaining.next().is_some() {
        return Err(PersistenceError::QueryParameter {
            reason: format!("sql restriction has more values than placeholders: {sql}"),
        });
    }
    Ok(())
}

fn resolve<T: Persistable>(property: &str) -> PersistenceResult<&str> {
    if T::has_property(property) {
        Ok(property)
    } else {
        Err(PersistenceError::UnknownProperty {
            property: property.to_string(),
            entity: T::ENTITY,
        })
    }
}

/// 排序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub property: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: true,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: false,
        }
    }

    pub(crate) fn render<T: Persistable>(&self, b: &mut SqlBuilder) -> PersistenceResult<()> {
        b.push(resolve::<T>(&self.property)?)
            .push(if self.ascending { " ASC" } else { " DESC" });
        Ok(())
    }
}
