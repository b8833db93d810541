use super::{Dialect, SqlBuilder, SqlStatement, is_identifier};
use crate::error::{PersistenceError, PersistenceResult};
use crate::persistable::{Identifier, Persistable};
use std::marker::PhantomData;

/// 按实体映射生成的单表语句（按主键读取、插入、更新、删除）
pub struct EntityStatements<T> {
    dialect: Dialect,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Persistable> EntityStatements<T> {
    pub fn new(dialect: Dialect) -> PersistenceResult<Self> {
        validate_mapping::<T>()?;
        Ok(Self {
            dialect,
            _entity: PhantomData,
        })
    }

    /// `id, col_a, col_b`
    pub fn select_columns() -> String {
        std::iter::once(T::ID_COLUMN)
            .chain(T::COLUMNS.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn select_by_id(&self, id: &T::Id) -> SqlStatement {
        let mut b = SqlBuilder::new(self.dialect);
        b.push("SELECT ")
            .push(&Self::select_columns())
            .push(" FROM ")
            .push(T::TABLE)
            .push(" WHERE ")
            .push(T::ID_COLUMN)
            .push(" = ")
            .push_bind(id.to_value());
        b.build()
    }

    /// 插入语句
    ///
    /// 数据库生成主键时省略主键列，并在方言支持时追加 `RETURNING`；
    /// 调用方分配主键时必须携带标识。
    pub fn insert(&self, entity: &T) -> PersistenceResult<SqlStatement> {
        let mut columns: Vec<&str> = Vec::with_capacity(T::COLUMNS.len() + 1);
        let mut values = Vec::with_capacity(T::COLUMNS.len() + 1);

        if !T::ID_GENERATED {
            let id = entity.id().ok_or(PersistenceError::MissingIdentifier {
                entity: T::ENTITY,
                action: "save",
            })?;
            columns.push(T::ID_COLUMN);
            values.push(id.to_value());
        }
        columns.extend(T::COLUMNS.iter().copied());
        values.extend(entity.values());

        let mut b = SqlBuilder::new(self.dialect);
        b.push("INSERT INTO ").push(T::TABLE);
        if columns.is_empty() {
            b.push(" DEFAULT VALUES");
        } else {
            b.push(" (")
                .push(&columns.join(", "))
                .push(") VALUES (")
                .push_binds(values)
                .push(")");
        }
        if T::ID_GENERATED && self.dialect.supports_returning() {
            b.push(" RETURNING ").push(T::ID_COLUMN);
        }
        Ok(b.build())
    }

    pub fn update(&self, entity: &T) -> PersistenceResult<SqlStatement> {
        let id = entity.id().ok_or(PersistenceError::MissingIdentifier {
            entity: T::ENTITY,
            action: "update",
        })?;

        let mut b = SqlBuilder::new(self.dialect);
        b.push("UPDATE ").push(T::TABLE).push(" SET ");
        if T::COLUMNS.is_empty() {
            b.push(T::ID_COLUMN).push(" = ").push(T::ID_COLUMN);
        } else {
            for (i, (column, value)) in T::COLUMNS.iter().zip(entity.values()).enumerate() {
                if i > 0 {
                    b.push(", ");
                }
                b.push(column).push(" = ").push_bind(value);
            }
        }
        b.push(" WHERE ")
            .push(T::ID_COLUMN)
            .push(" = ")
            .push_bind(id.to_value());
        Ok(b.build())
    }

    pub fn delete_by_id(&self, id: &T::Id) -> SqlStatement {
        let mut b = SqlBuilder::new(self.dialect);
        b.push("DELETE FROM ")
            .push(T::TABLE)
            .push(" WHERE ")
            .push(T::ID_COLUMN)
            .push(" = ")
            .push_bind(id.to_value());
        b.build()
    }
}

/// 校验实体映射中的表名与列名
pub(crate) fn validate_mapping<T: Persistable>() -> PersistenceResult<()> {
    let names = std::iter::once(T::TABLE)
        .chain(std::iter::once(T::ID_COLUMN))
        .chain(T::COLUMNS.iter().copied());
    for name in names {
        if !is_identifier(name) {
            return Err(PersistenceError::Configuration {
                reason: format!("invalid identifier '{name}' in mapping of {}", T::ENTITY),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use persistence_macros::entity;

    #[entity(table = "users", id = i64)]
    struct User {
        name: String,
        email: Option<String>,
    }

    #[entity(table = "tags", id = String, generated = false)]
    struct Tag {
        label: String,
    }

    #[test]
    fn select_by_id_lists_all_columns() {
        let stmts = EntityStatements::<User>::new(Dialect::Postgres).unwrap();
        let stmt = stmts.select_by_id(&5);
        assert_eq!(stmt.sql, "SELECT id, name, email FROM users WHERE id = $1");
        assert_eq!(stmt.values, vec![Value::Int(5)]);
    }

    #[test]
    fn insert_generated_id_returns_key() {
        let stmts = EntityStatements::<User>::new(Dialect::Sqlite).unwrap();
        let user = User {
            id: None,
            name: "alice".into(),
            email: None,
        };
        let stmt = stmts.insert(&user).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO users (name, email) VALUES (?, ?) RETURNING id"
        );
        assert_eq!(stmt.values[1], Value::Null(crate::value::ValueKind::Text));
    }

    #[test]
    fn insert_without_returning_on_mysql() {
        let stmts = EntityStatements::<User>::new(Dialect::MySql).unwrap();
        let stmt = stmts.insert(&User::default()).unwrap();
        assert!(!stmt.sql.contains("RETURNING"));
    }

    #[test]
    fn insert_assigned_id_requires_identifier() {
        let stmts = EntityStatements::<Tag>::new(Dialect::Postgres).unwrap();
        let err = stmts.insert(&Tag::default()).unwrap_err();
        assert!(matches!(err, PersistenceError::MissingIdentifier { .. }));

        let tag = Tag {
            id: Some("rust".into()),
            label: "Rust".into(),
        };
        let stmt = stmts.insert(&tag).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO tags (id, label) VALUES ($1, $2)");
    }

    #[test]
    fn update_binds_columns_then_id() {
        let stmts = EntityStatements::<User>::new(Dialect::Postgres).unwrap();
        let user = User {
            id: Some(3),
            name: "bob".into(),
            email: Some("bob@example.com".into()),
        };
        let stmt = stmts.update(&user).unwrap();
        assert_eq!(stmt.sql, "UPDATE users SET name = $1, email = $2 WHERE id = $3");
        assert_eq!(stmt.values[2], Value::Int(3));
    }

    #[test]
    fn delete_by_id() {
        let stmts = EntityStatements::<User>::new(Dialect::Sqlite).unwrap();
        assert_eq!(stmts.delete_by_id(&9).sql, "DELETE FROM users WHERE id = ?");
    }
}
