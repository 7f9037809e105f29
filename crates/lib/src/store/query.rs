//! Select query description.
//!
//! A [`Select`] names a table plus the equality filters, ordering and row limit
//! to apply. Backends translate it into their own wire format.

use std::fmt;

/// Sort direction for [`Select::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

/// Ordering on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Table-scoped read: `select * from table where col = value ... order by ... limit n`.
///
/// ```
/// use clubhub::store::{Direction, Select};
///
/// let query = Select::from("events")
///     .eq("club_id", "stereo")
///     .order("event_date", Direction::Descending);
/// assert_eq!(query.to_string(), "events?club_id=eq.stereo&order=event_date.desc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    table: String,
    filters: Vec<Filter>,
    order: Option<Order>,
    limit: Option<usize>,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Keep only rows whose `column` equals `value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.to_string(),
        });
        self
    }

    /// Order rows by `column`. A later call replaces an earlier one.
    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    /// Return at most `limit` rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for filter in &self.filters {
            parts.push(format!("{}=eq.{}", filter.column, filter.value));
        }
        if let Some(order) = &self.order {
            parts.push(format!("order={}.{}", order.column, order.direction.as_str()));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={limit}"));
        }
        if parts.is_empty() {
            f.write_str(&self.table)
        } else {
            write!(f, "{}?{}", self.table, parts.join("&"))
        }
    }
}
