use async_trait::async_trait;

use super::criteria::{Criteria, SqlValue};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found for {criteria}")]
    NotFound { entity: &'static str, criteria: String },

    #[error("{entity} with {column} = {value} already exists")]
    Duplicate {
        entity: &'static str,
        column: String,
        value: String,
    },

    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_domain(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::Duplicate { .. })
    }
}

/// A stored record: its table, its columns in storage order, and its values.
///
/// The first column is the primary key.
pub trait Entity: Clone + Send + Sync + 'static {
    const NAME: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    /// Columns that must hold distinct values across the table, besides the key.
    const UNIQUE: &'static [&'static str] = &[];

    fn id(&self) -> &str;

    /// Values in the same order as [`Entity::COLUMNS`].
    fn values(&self) -> Vec<SqlValue>;

    fn field(&self, name: &str) -> Option<SqlValue> {
        let position = Self::COLUMNS.iter().position(|column| *column == name)?;
        self.values().into_iter().nth(position)
    }
}

/// Typed storage for one entity, queried only through [`Criteria`].
#[async_trait]
pub trait Repository<T>: Send + Sync {
    async fn find(&self, criteria: &Criteria) -> Result<Vec<T>, StoreError>;

    async fn find_one(&self, criteria: &Criteria) -> Result<T, StoreError>;

    async fn save(&self, entity: &T) -> Result<(), StoreError>;

    async fn update(&self, entity: &T) -> Result<(), StoreError>;
}
