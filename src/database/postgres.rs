use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::FromRow;

use super::criteria::{Criteria, CriteriaToSql};
use super::repository::{Entity, Repository, StoreError};

/// Postgres-backed [`Repository`] for any [`Entity`] that sqlx can decode.
pub struct PgRepository<T> {
    pool: PgPool,
    sql: CriteriaToSql,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            sql: CriteriaToSql::new(T::TABLE, T::COLUMNS),
            _entity: PhantomData,
        }
    }

    fn write_error(err: sqlx::Error, entity: &T) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Duplicate {
                    entity: T::NAME,
                    column: db.constraint().unwrap_or("primary key").to_string(),
                    value: entity.id().to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
impl<T> Repository<T> for PgRepository<T>
where
    T: Entity + for<'r> FromRow<'r, PgRow> + Unpin,
{
    async fn find(&self, criteria: &Criteria) -> Result<Vec<T>, StoreError> {
        let mut query = self.sql.select(criteria)?;

        Ok(query.build_query_as::<T>().fetch_all(&self.pool).await?)
    }

    async fn find_one(&self, criteria: &Criteria) -> Result<T, StoreError> {
        let mut query = self.sql.select(criteria)?;
        query.push(" LIMIT 1");

        query
            .build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: T::NAME,
                criteria: criteria.to_string(),
            })
    }

    async fn save(&self, entity: &T) -> Result<(), StoreError> {
        let mut query = self.sql.insert(entity.values())?;

        query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|err| Self::write_error(err, entity))?;

        log::debug!("💾 {} {} saved", T::NAME, entity.id());
        Ok(())
    }

    async fn update(&self, entity: &T) -> Result<(), StoreError> {
        let mut query = self.sql.update(entity.values())?;

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|err| Self::write_error(err, entity))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: T::NAME,
                criteria: format!("{} = '{}'", T::COLUMNS[0], entity.id()),
            });
        }

        log::debug!("💾 {} {} updated", T::NAME, entity.id());
        Ok(())
    }
}
