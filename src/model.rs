//! Record types for the GridBase data model.
//!
//! Tables own runtime-defined columns; rows hold one cell per column of
//! their table; views persist filter/sort/visibility state. Cell values are
//! stored uniformly as text and coerced to numbers at read, filter, and sort
//! time, never at storage time.

use crate::error::{GridError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                $name(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

define_id!(BaseId);
define_id!(TableId);
define_id!(ColumnId);
define_id!(RowId);
define_id!(CellId);
define_id!(ViewId);

/// Column data types. Values of either type are stored as text; the type tag
/// drives coercion and UI affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Number,
}

impl ColumnType {
    /// Parse a column type from its wire spelling.
    ///
    /// Accepts: "TEXT", "NUMBER"
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "TEXT" => Ok(ColumnType::Text),
            "NUMBER" => Ok(ColumnType::Number),
            _ => Err(GridError::Validation(format!(
                "unknown column type '{}'. Use 'TEXT' or 'NUMBER'",
                s
            ))),
        }
    }
}

/// Parse a cell's raw text as a finite number.
///
/// Empty strings, non-numeric text, and non-finite parses ("NaN", "inf") all
/// yield `None`, so numeric filters fail closed and sorting never feeds NaN
/// into a comparison.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A cell value coerced through its column's type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Coerce raw cell text through a column type. NUMBER cells that do not
    /// parse (including the empty default) stay text.
    pub fn coerce(raw: &str, column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Number => match parse_number(raw) {
                Some(n) => CellValue::Number(n),
                None => CellValue::Text(raw.to_string()),
            },
            ColumnType::Text => CellValue::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::Number(_) => None,
        }
    }
}

/// Owning collection for tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    pub id: BaseId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Base {
    pub fn new(name: impl Into<String>) -> Self {
        Base {
            id: BaseId::generate(),
            name: name.into(),
            created_at: Utc::now(),
            seq: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: TableId,
    pub base_id: BaseId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Table {
    pub fn new(base_id: BaseId, name: impl Into<String>) -> Self {
        Table {
            id: TableId::generate(),
            base_id,
            name: name.into(),
            created_at: Utc::now(),
            seq: 0,
        }
    }
}

/// A runtime-defined column. Belongs to exactly one table; display order is
/// creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub table_id: TableId,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Column {
    pub fn new(table_id: TableId, name: impl Into<String>, column_type: ColumnType) -> Self {
        Column {
            id: ColumnId::generate(),
            table_id,
            name: name.into(),
            column_type,
            created_at: Utc::now(),
            seq: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,
    pub table_id: TableId,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Row {
    pub fn new(table_id: TableId) -> Self {
        Row {
            id: RowId::generate(),
            table_id,
            created_at: Utc::now(),
            seq: 0,
        }
    }
}

/// The EAV value record. One cell exists for every (row, column) pair of a
/// table; the value is always text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub id: CellId,
    pub row_id: RowId,
    pub column_id: ColumnId,
    pub value: String,
}

impl Cell {
    /// The empty-valued cell `add_row`/`add_column` backfill with.
    pub fn empty(row_id: RowId, column_id: ColumnId) -> Self {
        Cell {
            id: CellId::generate(),
            row_id,
            column_id,
            value: String::new(),
        }
    }
}

/// One sort key of a view's `sorting_state`. The list is a priority order;
/// the first entry binds tightest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortKey {
    pub column_id: ColumnId,
    #[serde(default)]
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(column_id: ColumnId) -> Self {
        SortKey {
            column_id,
            descending: false,
        }
    }

    pub fn descending(column_id: ColumnId) -> Self {
        SortKey {
            column_id,
            descending: true,
        }
    }
}

/// Per-column filter predicates. The set is closed; unknown operators are
/// rejected at the deserialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Contains,
    NotContains,
    Equals,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
}

/// One entry of a view's `column_filters`. Filters AND-combine. The operand
/// is ignored for `is_empty`/`is_not_empty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub column_id: ColumnId,
    pub operator: FilterOperator,
    #[serde(default)]
    pub operand: String,
}

impl Filter {
    pub fn new(column_id: ColumnId, operator: FilterOperator, operand: impl Into<String>) -> Self {
        Filter {
            column_id,
            operator,
            operand: operand.into(),
        }
    }
}

/// A named, persisted bundle of filter/sort/visibility state over one table.
///
/// `column_visibility` keys need not cover every column; an absent key means
/// "not yet decided" and is left to the caller to default. Every creation
/// path in this crate seeds explicit entries, and `add_column` writes `true`
/// into every view of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: ViewId,
    pub table_id: TableId,
    pub name: String,
    pub column_visibility: HashMap<ColumnId, bool>,
    pub sorting_state: Vec<SortKey>,
    pub column_filters: Vec<Filter>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl View {
    pub fn new(table_id: TableId, name: impl Into<String>) -> Self {
        View {
            id: ViewId::generate(),
            table_id,
            name: name.into(),
            column_visibility: HashMap::new(),
            sorting_state: Vec::new(),
            column_filters: Vec::new(),
            created_at: Utc::now(),
            seq: 0,
        }
    }
}

/// A row together with its full cell set, as returned by the mutation and
/// admin read paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowWithCells {
    pub row: Row,
    pub cells: Vec<Cell>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_parse() {
        assert_eq!(ColumnType::parse("TEXT").unwrap(), ColumnType::Text);
        assert_eq!(ColumnType::parse("NUMBER").unwrap(), ColumnType::Number);
        assert!(ColumnType::parse("DATE").is_err());
        assert!(ColumnType::parse("text").is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("10"), Some(10.0));
        assert_eq!(parse_number("-3.5"), Some(-3.5));
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_cell_value_coercion() {
        assert_eq!(
            CellValue::coerce("10", ColumnType::Number),
            CellValue::Number(10.0)
        );
        assert_eq!(
            CellValue::coerce("10", ColumnType::Text),
            CellValue::Text("10".to_string())
        );
        // A NUMBER cell holding non-numeric text stays text.
        assert_eq!(
            CellValue::coerce("n/a", ColumnType::Number),
            CellValue::Text("n/a".to_string())
        );
        assert_eq!(
            CellValue::coerce("", ColumnType::Number),
            CellValue::Text(String::new())
        );
    }

    #[test]
    fn test_filter_operator_wire_names() {
        let op: FilterOperator = serde_json::from_str("\"not_contains\"").unwrap();
        assert_eq!(op, FilterOperator::NotContains);
        assert!(serde_json::from_str::<FilterOperator>("\"starts_with\"").is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(RowId::generate(), RowId::generate());
    }
}
