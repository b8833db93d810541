//! DAO 基础协议
//!
//! DAO 只需给出所使用的持久化提供者，即可获得针对单一实体类型的
//! 通用 CRUD 操作；实体特有的查询在具体 DAO 中基于提供者实现。
//!
use crate::error::PersistenceResult;
use crate::persistable::Persistable;
use crate::provider::PersistenceProvider;
use async_trait::async_trait;

#[async_trait]
pub trait BasePersistence<T: Persistable>: Send + Sync {
    type Provider: PersistenceProvider;

    fn persistence_provider(&self) -> &Self::Provider;

    /// 持久化的实体名
    fn entity_name(&self) -> &'static str {
        T::ENTITY
    }

    async fn find_by_id(&self, id: &T::Id) -> PersistenceResult<Option<T>> {
        self.persistence_provider().find_by_id::<T>(id).await
    }

    async fn find_all(&self) -> PersistenceResult<Vec<T>> {
        self.persistence_provider().find_all::<T>().await
    }

    async fn find_all_range(
        &self,
        first_result: Option<u64>,
        max_results: Option<u64>,
    ) -> PersistenceResult<Vec<T>> {
        self.persistence_provider()
            .find_all_range::<T>(first_result, max_results)
            .await
    }

    async fn count_all(&self) -> PersistenceResult<i64> {
        self.persistence_provider().count_all::<T>().await
    }

    async fn save(&self, entity: T) -> PersistenceResult<T> {
        self.persistence_provider().save(entity).await
    }

    async fn update(&self, entity: T) -> PersistenceResult<T> {
        self.persistence_provider().update(entity).await
    }

    async fn delete(&self, entity: &T) -> PersistenceResult<()> {
        self.persistence_provider().delete(entity).await
    }

    async fn delete_by_id(&self, id: &T::Id) -> PersistenceResult<()> {
        self.persistence_provider().delete_by_id::<T>(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::persistable::Identifier;
    use crate::provider::NamedParams;
    use crate::value::Value;
    use persistence_macros::entity;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[entity(table = "notes", id = i64)]
    struct Note {
        body: String,
    }

    /// 仅支持 Note 的内存提供者，用于验证默认委托
    #[derive(Default)]
    struct MemoryProvider {
        rows: Mutex<HashMap<i64, String>>,
        next_id: Mutex<i64>,
    }

    impl MemoryProvider {
        fn note<T: Persistable>(&self, id: i64) -> Option<T> {
            let body = self.rows.lock().unwrap().get(&id).cloned()?;
            let note = Note {
                id: Some(id),
                body,
            };
            (Box::new(note) as Box<dyn std::any::Any>)
                .downcast::<T>()
                .ok()
                .map(|b| *b)
        }
    }

    fn unsupported() -> PersistenceError {
        PersistenceError::Database {
            reason: "unsupported".into(),
        }
    }

    #[async_trait]
    impl PersistenceProvider for MemoryProvider {
        async fn find_by_id<T: Persistable>(&self, id: &T::Id) -> PersistenceResult<Option<T>> {
            let key = id.to_value().as_i64().ok_or_else(unsupported)?;
            Ok(self.note::<T>(key))
        }

        async fn find_all_range<T: Persistable>(
            &self,
            first_result: Option<u64>,
            max_results: Option<u64>,
        ) -> PersistenceResult<Vec<T>> {
            let mut ids: Vec<i64> = self.rows.lock().unwrap().keys().copied().collect();
            ids.sort_unstable();
            let skip = first_result.unwrap_or(0) as usize;
            let take = max_results.map(|m| m as usize).unwrap_or(usize::MAX);
            Ok(ids
                .into_iter()
                .skip(skip)
                .take(take)
                .filter_map(|id| self.note::<T>(id))
                .collect())
        }

        async fn find_by_named_query_cacheable<T: Persistable>(
            &self,
            _cacheable: bool,
            _query_name: &str,
            _params: &[Value],
        ) -> PersistenceResult<Vec<T>> {
            Err(unsupported())
        }

        async fn find_by_named_query_and_named_params_cacheable<T: Persistable>(
            &self,
            _cacheable: bool,
            _query_name: &str,
            _params: &NamedParams,
        ) -> PersistenceResult<Vec<T>> {
            Err(unsupported())
        }

        async fn find_by_query_cacheable<T: Persistable>(
            &self,
            _cacheable: bool,
            _query: &str,
            _params: &[Value],
        ) -> PersistenceResult<Vec<T>> {
            Err(unsupported())
        }

        async fn find_by_query_and_named_params_cacheable<T: Persistable>(
            &self,
            _cacheable: bool,
            _query: &str,
            _params: &NamedParams,
        ) -> PersistenceResult<Vec<T>> {
            Err(unsupported())
        }

        async fn count_all<T: Persistable>(&self) -> PersistenceResult<i64> {
            Ok(self.rows.lock().unwrap().len() as i64)
        }

        async fn count_by_named_query_and_named_params<N>(
            &self,
            _query_name: &str,
            _params: &NamedParams,
        ) -> PersistenceResult<N>
        where
            N: TryFrom<i64> + Send + 'static,
        {
            Err(unsupported())
        }

        async fn count_by_query_and_named_params<N>(
            &self,
            _query: &str,
            _params: &NamedParams,
        ) -> PersistenceResult<N>
        where
            N: TryFrom<i64> + Send + 'static,
        {
            Err(unsupported())
        }

        async fn save<T: Persistable>(&self, mut entity: T) -> PersistenceResult<T> {
            let values = entity.values();
            let body = values[0].as_str().ok_or_else(unsupported)?.to_string();
            let id = match entity.id() {
                Some(id) => id.to_value().as_i64().ok_or_else(unsupported)?,
                None => {
                    let mut next = self.next_id.lock().unwrap();
                    *next += 1;
                    let id = *next;
                    entity.set_id(T::Id::from_value(Value::Int(id))?);
                    id
                }
            };
            self.rows.lock().unwrap().insert(id, body);
            Ok(entity)
        }

        async fn delete_by_entity_or_id<T: Persistable>(
            &self,
            entity: Option<&T>,
            id: Option<&T::Id>,
        ) -> PersistenceResult<()> {
            let id = id
                .or_else(|| entity.and_then(|e| e.id()))
                .ok_or(PersistenceError::MissingIdentifier {
                    entity: T::ENTITY,
                    action: "delete",
                })?;
            let key = id.to_value().as_i64().ok_or_else(unsupported)?;
            self.rows.lock().unwrap().remove(&key);
            Ok(())
        }
    }

    struct NoteDao {
        provider: MemoryProvider,
    }

    impl BasePersistence<Note> for NoteDao {
        type Provider = MemoryProvider;

        fn persistence_provider(&self) -> &Self::Provider {
            &self.provider
        }
    }

    #[tokio::test]
    async fn dao_delegates_crud_to_provider() {
        let dao = NoteDao {
            provider: MemoryProvider::default(),
        };
        assert_eq!(dao.entity_name(), "Note");

        let first = dao
            .save(Note {
                id: None,
                body: "first".into(),
            })
            .await
            .unwrap();
        assert_eq!(first.id, Some(1));
        dao.save(Note {
            id: None,
            body: "second".into(),
        })
        .await
        .unwrap();

        assert_eq!(dao.count_all().await.unwrap(), 2);
        assert_eq!(dao.find_all().await.unwrap().len(), 2);
        assert_eq!(dao.find_all_range(Some(1), Some(5)).await.unwrap()[0].body, "second");

        let mut edited = dao.find_by_id(&1).await.unwrap().unwrap();
        edited.body = "edited".into();
        dao.update(edited).await.unwrap();
        assert_eq!(dao.find_by_id(&1).await.unwrap().unwrap().body, "edited");

        dao.delete_by_id(&1).await.unwrap();
        assert!(dao.find_by_id(&1).await.unwrap().is_none());

        let err = dao.delete(&Note::default()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::MissingIdentifier { .. }));
    }
}
