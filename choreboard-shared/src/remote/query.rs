/// Table query model
///
/// A [`Query`] names a table plus equality / membership filters, an optional
/// ordering and an optional row limit. Backends either translate it into
/// request parameters ([`Query::to_params`]) or evaluate it directly
/// ([`Query::matches`]).
///
/// # Example
///
/// ```
/// use choreboard_shared::remote::query::{Query, Table};
/// use uuid::Uuid;
///
/// let house_id = Uuid::new_v4();
/// let query = Query::table(Table::Chores)
///     .eq("house_id", house_id)
///     .eq("status", "done")
///     .order_desc("completed_at");
///
/// let params = query.to_params();
/// assert!(params.contains(&("status".to_string(), "eq.done".to_string())));
/// assert!(params.contains(&("order".to_string(), "completed_at.desc".to_string())));
/// ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use super::Row;
use crate::models::chore::ChoreStatus;
use crate::models::user::UserRole;

/// Remote tables the client reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Houses,
    HouseMembers,
    Chores,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Users, Table::Houses, Table::HouseMembers, Table::Chores];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Houses => "houses",
            Table::HouseMembers => "house_members",
            Table::Chores => "chores",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values usable on the right-hand side of a filter
pub trait FilterValue {
    fn into_value(self) -> Value;
}

impl FilterValue for Uuid {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl FilterValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl FilterValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl FilterValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FilterValue for i64 {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl FilterValue for ChoreStatus {
    fn into_value(self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

impl FilterValue for UserRole {
    fn into_value(self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

/// A single row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value` (`value = null` means `column IS NULL`)
    Eq(String, Value),

    /// `column IN (values...)`
    In(String, Vec<Value>),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, expected) => actual == expected,
            Filter::In(_, values) => values.iter().any(|v| v == actual),
        }
    }
}

/// Sort order for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Table query: filters, ordering, limit
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    /// Starts an unfiltered query over a table
    pub fn table(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl FilterValue) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into_value()));
        self
    }

    pub fn is_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: FilterValue,
    {
        let values = values.into_iter().map(FilterValue::into_value).collect();
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order_asc(self, column: &str) -> Self {
        self.order_by(column, true)
    }

    pub fn order_desc(self, column: &str) -> Self {
        self.order_by(column, false)
    }

    fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Every column the query refers to, in filter order then the sort column
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .map(Filter::column)
            .chain(self.order.iter().map(|o| o.column.as_str()))
    }

    /// True when every filter accepts the row
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// True when an `IN` filter has an empty list, so no row can match
    pub fn is_trivially_empty(&self) -> bool {
        self.filters
            .iter()
            .any(|f| matches!(f, Filter::In(_, values) if values.is_empty()))
    }

    /// Encodes the query as PostgREST-style URL parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);

        for filter in &self.filters {
            let encoded = match filter {
                Filter::Eq(_, Value::Null) => "is.null".to_string(),
                Filter::Eq(_, value) => format!("eq.{}", literal(value)),
                Filter::In(_, values) => {
                    let items: Vec<String> = values.iter().map(quoted_literal).collect();
                    format!("in.({})", items.join(","))
                }
            };
            params.push((filter.column().to_string(), encoded));
        }

        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}
