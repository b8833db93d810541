use super::QueryParameters;
use crate::error::{PersistenceError, PersistenceResult};
use crate::sql::{Dialect, SqlBuilder, SqlStatement};
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;

enum Placeholder {
    Sequential(usize),
    Ordinal(usize),
    Named(String),
}

/// 展开查询中的参数占位符
///
/// 支持三种形式：`?`（按出现顺序）、`?N`（从 1 开始的序号）与 `:name`。
/// 字符串字面量、带引号的标识符、注释与 `::` 类型转换中的字符不会被识别为占位符。
/// 每次出现都会生成一个新的方言占位符，重复引用的参数会被重复绑定。
pub fn expand(
    sql: &str,
    params: &QueryParameters,
    dialect: Dialect,
) -> PersistenceResult<SqlStatement> {
    let mut b = SqlBuilder::new(dialect);
    let mut chars = sql.chars().peekable();

    let mut sequential = 0usize;
    let mut saw_ordinal = false;
    let mut used_positions = BTreeSet::new();
    let mut used_names = BTreeSet::new();

    while let Some(c) = chars.next() {
        if copy_literal_or_comment(c, &mut chars, &mut b) {
            continue;
        }
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                b.push("::");
            }
            ':' if chars.peek().is_some_and(|c| c.is_ascii_alphabetic() || *c == '_') => {
                let name = take_while(&mut chars, |c| c.is_ascii_alphanumeric() || c == '_');
                bind(&mut b, params, Placeholder::Named(name.clone()))?;
                used_names.insert(name);
            }
            '?' => {
                let digits = take_while(&mut chars, |c| c.is_ascii_digit());
                if digits.is_empty() {
                    if saw_ordinal {
                        return Err(mixed_positional());
                    }
                    bind(&mut b, params, Placeholder::Sequential(sequential))?;
                    used_positions.insert(sequential);
                    sequential += 1;
                } else {
                    if sequential > 0 {
                        return Err(mixed_positional());
                    }
                    saw_ordinal = true;
                    let ordinal: usize = digits.parse().map_err(|_| PersistenceError::QueryParameter {
                        reason: format!("invalid ordinal parameter ?{digits}"),
                    })?;
                    if ordinal == 0 {
                        return Err(PersistenceError::QueryParameter {
                            reason: "ordinal parameters start at ?1".to_string(),
                        });
                    }
                    bind(&mut b, params, Placeholder::Ordinal(ordinal))?;
                    used_positions.insert(ordinal - 1);
                }
            }
            _ => {
                b.push_char(c);
            }
        }
    }

    check_all_used(params, &used_positions, &used_names)?;
    Ok(b.build())
}

fn bind(b: &mut SqlBuilder, params: &QueryParameters, placeholder: Placeholder) -> PersistenceResult<()> {
    let value = match (&placeholder, params) {
        (Placeholder::Named(name), QueryParameters::Named(map)) => {
            map.get(name).ok_or_else(|| PersistenceError::QueryParameter {
                reason: format!("named parameter :{name} not set"),
            })?
        }
        (Placeholder::Named(name), QueryParameters::Positional(_)) => {
            return Err(PersistenceError::QueryParameter {
                reason: format!("named parameter :{name} used with positional parameters"),
            });
        }
        (Placeholder::Sequential(position), QueryParameters::Positional(values)) => values
            .get(*position)
            .ok_or_else(|| PersistenceError::QueryParameter {
                reason: format!("positional parameter {} not set", position + 1),
            })?,
        (Placeholder::Ordinal(ordinal), QueryParameters::Positional(values)) => values
            .get(ordinal - 1)
            .ok_or_else(|| PersistenceError::QueryParameter {
                reason: format!("ordinal parameter ?{ordinal} not set"),
            })?,
        (_, QueryParameters::Named(_)) => {
            return Err(PersistenceError::QueryParameter {
                reason: "positional placeholder used with named parameters".to_string(),
            });
        }
    };
    b.push_bind(value.clone());
    Ok(())
}

fn check_all_used(
    params: &QueryParameters,
    used_positions: &BTreeSet<usize>,
    used_names: &BTreeSet<String>,
) -> PersistenceResult<()> {
    match params {
        QueryParameters::Positional(values) => {
            if let Some(unused) = (0..values.len()).find(|i| !used_positions.contains(i)) {
                return Err(PersistenceError::QueryParameter {
                    reason: format!(
                        "positional parameter {} was supplied but not referenced",
                        unused + 1
                    ),
                });
            }
        }
        QueryParameters::Named(map) => {
            if let Some(unused) = map.keys().find(|name| !used_names.contains(*name)) {
                return Err(PersistenceError::QueryParameter {
                    reason: format!("could not locate named parameter [{unused}]"),
                });
            }
        }
    }
    Ok(())
}

fn mixed_positional() -> PersistenceError {
    PersistenceError::QueryParameter {
        reason: "cannot mix '?' and '?N' placeholders".to_string(),
    }
}

fn take_while(chars: &mut Peekable<Chars<'_>>, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

/// 原样复制以 `c` 开头的字面量、带引号的标识符或注释
///
/// `c` 不是这些结构的起始字符时不消费任何字符并返回 `false`。
pub(crate) fn copy_literal_or_comment(c: char, chars: &mut Peekable<Chars<'_>>, b: &mut SqlBuilder) -> bool {
    match c {
        '\'' | '"' | '`' => {
            b.push_char(c);
            copy_quoted(chars, b, c);
        }
        '-' if chars.peek() == Some(&'-') => {
            b.push_char(c);
            copy_until(chars, b, |c| c == '\n');
        }
        '/' if chars.peek() == Some(&'*') => {
            b.push_char(c);
            copy_block_comment(chars, b);
        }
        _ => return false,
    }
    true
}

fn copy_quoted(chars: &mut Peekable<Chars<'_>>, b: &mut SqlBuilder, quote: char) {
    while let Some(c) = chars.next() {
        b.push_char(c);
        if c == quote {
            // 连续两个引号表示转义
            if chars.peek() == Some(&quote) {
                chars.next();
                b.push_char(quote);
            } else {
                return;
            }
        }
    }
}

fn copy_until(chars: &mut Peekable<Chars<'_>>, b: &mut SqlBuilder, stop: impl Fn(char) -> bool) {
    for c in chars.by_ref() {
        b.push_char(c);
        if stop(c) {
            return;
        }
    }
}

fn copy_block_comment(chars: &mut Peekable<Chars<'_>>, b: &mut SqlBuilder) {
    let mut prev = '\0';
    for c in chars.by_ref() {
        b.push_char(c);
        if prev == '*' && c == '/' {
            return;
        }
        prev = c;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::{named_params, params};

    fn positional(values: Vec<Value>) -> QueryParameters {
        QueryParameters::Positional(values)
    }

    #[test]
    fn sequential_placeholders_to_postgres() {
        let stmt = expand(
            "SELECT * FROM users WHERE name = ? AND age > ?",
            &positional(params!["alice", 18]),
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users WHERE name = $1 AND age > $2");
        assert_eq!(stmt.values, params!["alice", 18]);
    }

    #[test]
    fn ordinal_placeholders_can_repeat_and_reorder() {
        let stmt = expand(
            "SELECT * FROM t WHERE a = ?2 OR b = ?1 OR c = ?2",
            &positional(params![1, 2]),
            Dialect::Sqlite,
        )
        .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM t WHERE a = ? OR b = ? OR c = ?");
        assert_eq!(stmt.values, params![2, 1, 2]);
    }

    #[test]
    fn named_placeholders() {
        let stmt = expand(
            "SELECT * FROM users WHERE lower(name) LIKE :name AND age >= :age",
            &QueryParameters::Named(named_params! { "name" => "%al%", "age" => 30 }),
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM users WHERE lower(name) LIKE $1 AND age >= $2"
        );
        assert_eq!(stmt.values, params!["%al%", 30]);
    }

    #[test]
    fn literals_comments_and_casts_are_untouched() {
        let stmt = expand(
            "SELECT 'a?b', ':x', id::text FROM t -- why?\nWHERE x = ? /* :y ? */",
            &positional(params![1]),
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT 'a?b', ':x', id::text FROM t -- why?\nWHERE x = $1 /* :y ? */"
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let stmt = expand(
            "SELECT * FROM t WHERE s = 'it''s ?' AND n = ?",
            &positional(params![5]),
            Dialect::Sqlite,
        )
        .unwrap();
        assert_eq!(stmt.values, params![5]);
    }

    #[test]
    fn parameter_mismatches_are_errors() {
        let cases = [
            ("SELECT ? , ?", positional(params![1])),
            ("SELECT ?", positional(params![1, 2])),
            ("SELECT ?1, ?", positional(params![1])),
            ("SELECT ?3", positional(params![1])),
            ("SELECT ?0", positional(params![1])),
            ("SELECT :a", positional(params![1])),
            ("SELECT ?", QueryParameters::Named(named_params! { "a" => 1 })),
            ("SELECT :a", QueryParameters::Named(named_params! { "b" => 1 })),
            (
                "SELECT :a",
                QueryParameters::Named(named_params! { "a" => 1, "b" => 2 }),
            ),
        ];
        for (sql, params) in cases {
            let err = expand(sql, &params, Dialect::Sqlite).unwrap_err();
            assert!(
                matches!(err, PersistenceError::QueryParameter { .. }),
                "{sql}: {err:?}"
            );
        }
    }

    #[test]
    fn no_parameters() {
        let stmt = expand("SELECT COUNT(*) FROM t", &QueryParameters::none(), Dialect::Sqlite).unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM t");
        assert!(stmt.values.is_empty());
    }
}
