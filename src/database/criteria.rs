use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use super::StoreError;

/// A value that can be compared in a filter or bound into a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    OptionalTimestampTz(Option<DateTime<Utc>>),
}

impl SqlValue {
    /// Orders two values of the same kind. Values of different kinds never match.
    pub fn compare(&self, other: &SqlValue) -> Option<Ordering> {
        match (self, other) {
            (SqlValue::Text(a), SqlValue::Text(b)) => Some(a.cmp(b)),
            (SqlValue::Int(a), SqlValue::Int(b)) => Some(a.cmp(b)),
            (SqlValue::Bool(a), SqlValue::Bool(b)) => Some(a.cmp(b)),
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => Some(a.cmp(b)),
            (SqlValue::TimestampTz(a), SqlValue::TimestampTz(b)) => Some(a.cmp(b)),
            (SqlValue::OptionalTimestampTz(Some(a)), SqlValue::TimestampTz(b)) => Some(a.cmp(b)),
            (SqlValue::OptionalTimestampTz(a), SqlValue::OptionalTimestampTz(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Text(v) => write!(f, "'{}'", v),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::Timestamp(v) => write!(f, "'{}'", v.format("%Y-%m-%d %H:%M:%S")),
            SqlValue::TimestampTz(v) => write!(f, "'{}'", v.to_rfc3339()),
            SqlValue::OptionalTimestampTz(Some(v)) => write!(f, "'{}'", v.to_rfc3339()),
            SqlValue::OptionalTimestampTz(None) => write!(f, "NULL"),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::TimestampTz(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Equal,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl Operand {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operand::Equal => "=",
            Operand::GreaterThanOrEqual => ">=",
            Operand::LessThanOrEqual => "<=",
        }
    }

    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            Operand::Equal => ordering == Ordering::Equal,
            Operand::GreaterThanOrEqual => ordering != Ordering::Less,
            Operand::LessThanOrEqual => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub operand: Operand,
    pub value: SqlValue,
}

/// Conjunction of filters over named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub filters: Vec<Filter>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.push(name, Operand::Equal, value.into())
    }

    pub fn greater_than_or_equal(self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.push(name, Operand::GreaterThanOrEqual, value.into())
    }

    pub fn less_than_or_equal(self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.push(name, Operand::LessThanOrEqual, value.into())
    }

    fn push(mut self, name: &str, operand: Operand, value: SqlValue) -> Self {
        self.filters.push(Filter {
            name: name.to_string(),
            operand,
            value,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filters.is_empty() {
            return write!(f, "<all>");
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{} {} {}", filter.name, filter.operand.as_sql(), filter.value)?;
        }
        Ok(())
    }
}

/// Builds parameterised statements over one table on top of [`QueryBuilder`].
#[derive(Debug, Clone)]
pub struct CriteriaToSql {
    table: &'static str,
    columns: &'static [&'static str],
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: SqlValue) {
    match value {
        SqlValue::Text(v) => builder.push_bind(v),
        SqlValue::Int(v) => builder.push_bind(v),
        SqlValue::Bool(v) => builder.push_bind(v),
        SqlValue::Timestamp(v) => builder.push_bind(v),
        SqlValue::TimestampTz(v) => builder.push_bind(v),
        SqlValue::OptionalTimestampTz(v) => builder.push_bind(v),
    };
}

impl CriteriaToSql {
    pub fn new(table: &'static str, columns: &'static [&'static str]) -> Self {
        Self { table, columns }
    }

    /// SELECT of every column, filtered by `criteria`. Unknown columns are rejected.
    pub fn select(&self, criteria: &Criteria) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM {}", self.column_list(), self.table));

        for (i, filter) in criteria.filters.iter().enumerate() {
            if !self.columns.contains(&filter.name.as_str()) {
                return Err(StoreError::InvalidCriteria(format!(
                    "unknown column {} for table {}",
                    filter.name, self.table
                )));
            }
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            builder.push(format!("\"{}\" {} ", filter.name, filter.operand.as_sql()));
            push_value(&mut builder, filter.value.clone());
        }

        Ok(builder)
    }

    pub fn insert(&self, values: Vec<SqlValue>) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
        self.check_arity(&values)?;

        let mut builder = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            self.table,
            self.column_list()
        ));
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(")");

        Ok(builder)
    }

    /// UPDATE keyed by the first column; the remaining columns are overwritten.
    pub fn update(&self, values: Vec<SqlValue>) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
        self.check_arity(&values)?;

        let mut values = values.into_iter();
        let key = values.next();

        let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", self.table));
        for (i, (column, value)) in self.columns.iter().skip(1).zip(values).enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(format!("\"{}\" = ", column));
            push_value(&mut builder, value);
        }
        builder.push(format!(" WHERE \"{}\" = ", self.columns[0]));
        if let Some(key) = key {
            push_value(&mut builder, key);
        }

        Ok(builder)
    }

    fn check_arity(&self, values: &[SqlValue]) -> Result<(), StoreError> {
        if values.is_empty() || values.len() != self.columns.len() {
            return Err(StoreError::InvalidCriteria(format!(
                "{} values for the {} columns of table {}",
                values.len(),
                self.columns.len(),
                self.table
            )));
        }
        Ok(())
    }

    fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| format!("\"{}\"", column))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["id", "session_id", "scheduled_at", "sent"];

    fn translator() -> CriteriaToSql {
        CriteriaToSql::new("telegram_notification", COLUMNS)
    }

    fn row() -> Vec<SqlValue> {
        vec!["n1".into(), "s1".into(), "2024-11-19 10:00:00".into(), false.into()]
    }

    #[test]
    fn empty_criteria_selects_everything() {
        let builder = translator().select(&Criteria::new()).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT \"id\", \"session_id\", \"scheduled_at\", \"sent\" FROM telegram_notification"
        );
    }

    #[test]
    fn filters_are_bound_in_order() {
        let criteria = Criteria::new()
            .less_than_or_equal("scheduled_at", "2024-11-19 10:00:00")
            .equal("sent", false);

        let builder = translator().select(&criteria).unwrap();

        assert!(builder.sql().ends_with("WHERE \"scheduled_at\" <= $1 AND \"sent\" = $2"));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let criteria = Criteria::new().equal("id; DROP TABLE booking", "x");
        let err = translator().select(&criteria).err().unwrap();
        assert!(matches!(err, StoreError::InvalidCriteria(_)));
    }

    #[test]
    fn insert_binds_every_column() {
        let builder = translator().insert(row()).unwrap();
        assert_eq!(
            builder.sql(),
            "INSERT INTO telegram_notification (\"id\", \"session_id\", \"scheduled_at\", \"sent\") VALUES ($1, $2, $3, $4)"
        );
    }

    #[test]
    fn update_is_keyed_by_first_column() {
        let builder = translator().update(row()).unwrap();
        assert_eq!(
            builder.sql(),
            "UPDATE telegram_notification SET \"session_id\" = $1, \"scheduled_at\" = $2, \"sent\" = $3 WHERE \"id\" = $4"
        );
    }

    #[test]
    fn row_of_wrong_width_is_rejected() {
        let mut short = row();
        short.pop();

        assert!(matches!(translator().insert(short.clone()), Err(StoreError::InvalidCriteria(_))));
        assert!(matches!(translator().update(short), Err(StoreError::InvalidCriteria(_))));
        assert!(matches!(translator().update(Vec::new()), Err(StoreError::InvalidCriteria(_))));
    }

    #[test]
    fn criteria_display_is_readable() {
        let criteria = Criteria::new().equal("id", "abc").equal("sent", true);
        assert_eq!(criteria.to_string(), "id = 'abc' AND sent = true");
    }

    #[test]
    fn operands_follow_ordering() {
        assert!(Operand::LessThanOrEqual.matches(Ordering::Equal));
        assert!(Operand::LessThanOrEqual.matches(Ordering::Less));
        assert!(!Operand::GreaterThanOrEqual.matches(Ordering::Less));
        assert!(!Operand::Equal.matches(Ordering::Greater));
    }
}
