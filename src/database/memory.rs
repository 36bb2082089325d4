use async_trait::async_trait;
use tokio::sync::RwLock;

use super::criteria::{Criteria, SqlValue};
use super::repository::{Entity, Repository, StoreError};

/// Repository backed by a vector, evaluating criteria in process.
pub struct InMemoryRepository<T> {
    rows: RwLock<Vec<T>>,
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn with_rows(rows: Vec<T>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<T> {
        self.rows.read().await.clone()
    }

    fn matches(entity: &T, criteria: &Criteria) -> Result<bool, StoreError> {
        for filter in &criteria.filters {
            if !T::COLUMNS.contains(&filter.name.as_str()) {
                return Err(StoreError::InvalidCriteria(format!(
                    "unknown column {} for table {}",
                    filter.name,
                    T::TABLE
                )));
            }
            let Some(value) = entity.field(&filter.name) else {
                return Ok(false);
            };
            match value.compare(&filter.value) {
                Some(ordering) if filter.operand.matches(ordering) => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    fn ensure_unique(rows: &[T], entity: &T) -> Result<(), StoreError> {
        let keys = std::iter::once(T::COLUMNS[0]).chain(T::UNIQUE.iter().copied());
        for column in keys {
            let Some(value) = entity.field(column) else {
                continue;
            };
            let clash = rows
                .iter()
                .filter(|row| row.id() != entity.id() || column == T::COLUMNS[0])
                .any(|row| row.field(column).as_ref() == Some(&value));
            if clash {
                return Err(StoreError::Duplicate {
                    entity: T::NAME,
                    column: column.to_string(),
                    value: display(&value),
                });
            }
        }
        Ok(())
    }
}

fn display(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(v) => v.clone(),
        other => other.to_string(),
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn find(&self, criteria: &Criteria) -> Result<Vec<T>, StoreError> {
        let rows = self.rows.read().await;
        let mut found = Vec::new();
        for row in rows.iter() {
            if Self::matches(row, criteria)? {
                found.push(row.clone());
            }
        }
        Ok(found)
    }

    async fn find_one(&self, criteria: &Criteria) -> Result<T, StoreError> {
        self.find(criteria)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                entity: T::NAME,
                criteria: criteria.to_string(),
            })
    }

    async fn save(&self, entity: &T) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        Self::ensure_unique(&rows, entity)?;
        rows.push(entity.clone());
        Ok(())
    }

    async fn update(&self, entity: &T) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        let others: Vec<T> = rows.iter().filter(|row| row.id() != entity.id()).cloned().collect();
        for column in T::UNIQUE {
            let value = entity.field(column);
            if value.is_some() && others.iter().any(|row| row.field(column) == value) {
                return Err(StoreError::Duplicate {
                    entity: T::NAME,
                    column: column.to_string(),
                    value: value.as_ref().map(display).unwrap_or_default(),
                });
            }
        }
        match rows.iter_mut().find(|row| row.id() == entity.id()) {
            Some(row) => {
                *row = entity.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: T::NAME,
                criteria: format!("{} = '{}'", T::COLUMNS[0], entity.id()),
            }),
        }
    }
}
