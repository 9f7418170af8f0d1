//! Query Engine: one page of filtered, sorted rows plus the filtered total.
//!
//! Filters AND-combine and fail closed: a row with no cell for a filtered
//! column never matches, and numeric operators require both the cell and the
//! operand to parse as finite numbers. The engine filters by intersecting
//! per-column row-id sets (the shape a storage backend would push down as
//! one exists-condition per filter); [`row_matches`] is the row-by-row
//! reference evaluator with identical semantics, kept as the testing oracle.
//!
//! Sorting walks the view's priority list. Within a key, two values compare
//! numerically when both parse as finite numbers and lexically when neither
//! does; a value that parses sorts before one that does not, in both
//! directions (`descending` reverses only the within-class comparison).
//! A missing cell on either side skips the key. Ties left after all keys are
//! stable in row-creation order.

use crate::error::Result;
use crate::model::{parse_number, ColumnId, Filter, FilterOperator, RowId, SortKey, TableId, ViewId};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A row materialized for serving: its cells folded into a map from column
/// identity to raw text value. Numeric coercion happens per comparison, not
/// here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedRow {
    pub id: RowId,
    pub created_at: DateTime<Utc>,
    pub values: HashMap<ColumnId, String>,
}

/// One page of the filtered/sorted universe, plus that universe's size.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPage {
    pub rows: Vec<MaterializedRow>,
    pub total_row_count: usize,
}

#[derive(Clone)]
pub struct QueryEngine {
    storage: Storage,
}

impl QueryEngine {
    pub fn new(storage: Storage) -> Self {
        QueryEngine { storage }
    }

    /// The primary serving path: rows `[start, start+size)` of the table's
    /// filtered and sorted universe under the given view, plus the filtered
    /// total. Windows past the end return an empty page.
    pub fn get_rows_filtered_sorted(
        &self,
        table_id: TableId,
        view_id: ViewId,
        start: usize,
        size: usize,
    ) -> Result<RowPage> {
        let (filters, sorting) = self.storage.with_inner(|inner| {
            let view = inner.view(view_id)?;
            Ok((view.column_filters.clone(), view.sorting_state.clone()))
        })?;
        self.page_with_state(table_id, &filters, &sorting, start, size)
    }

    /// Same as [`get_rows_filtered_sorted`] with the view state supplied by
    /// the caller instead of loaded by id.
    ///
    /// [`get_rows_filtered_sorted`]: QueryEngine::get_rows_filtered_sorted
    pub fn page_with_state(
        &self,
        table_id: TableId,
        filters: &[Filter],
        sorting: &[SortKey],
        start: usize,
        size: usize,
    ) -> Result<RowPage> {
        let mut rows = self.materialize(table_id)?;

        if !filters.is_empty() {
            let matching = filter_row_ids(&rows, filters);
            rows.retain(|row| matching.contains(&row.id));
        }
        sort_rows(&mut rows, sorting);

        let total_row_count = rows.len();
        let rows = rows.into_iter().skip(start).take(size).collect();
        Ok(RowPage {
            rows,
            total_row_count,
        })
    }

    /// Every row of the table materialized in creation order (the stable
    /// base order the sort preserves through ties).
    pub fn materialize(&self, table_id: TableId) -> Result<Vec<MaterializedRow>> {
        self.storage.with_inner(|inner| {
            inner.table(table_id)?;
            Ok(inner
                .rows_of(table_id)
                .into_iter()
                .map(|row| {
                    let values = inner
                        .cells_of(row.id)
                        .map(|row_cells| {
                            row_cells
                                .values()
                                .map(|cell| (cell.column_id, cell.value.clone()))
                                .collect()
                        })
                        .unwrap_or_default();
                    MaterializedRow {
                        id: row.id,
                        created_at: row.created_at,
                        values,
                    }
                })
                .collect())
        })
    }
}

/// Pushdown-shaped filtering: one "row has a matching cell for this column"
/// id-set per filter, intersected across filters. Row-id membership is
/// exactly what a storage backend would evaluate as per-filter exists
/// conditions.
pub fn filter_row_ids(rows: &[MaterializedRow], filters: &[Filter]) -> HashSet<RowId> {
    let mut matching: Option<HashSet<RowId>> = None;
    for filter in filters {
        let per_filter: HashSet<RowId> = rows
            .iter()
            .filter(|row| cell_matches(filter, row.values.get(&filter.column_id).map(String::as_str)))
            .map(|row| row.id)
            .collect();
        matching = Some(match matching {
            None => per_filter,
            Some(acc) => acc.intersection(&per_filter).copied().collect(),
        });
    }
    matching.unwrap_or_else(|| rows.iter().map(|row| row.id).collect())
}

/// Row-by-row reference evaluator. Must agree with [`filter_row_ids`] on
/// every row; the engine serves from the set path, tests compare the two.
pub fn row_matches(filters: &[Filter], row: &MaterializedRow) -> bool {
    filters.iter().all(|filter| {
        cell_matches(filter, row.values.get(&filter.column_id).map(String::as_str))
    })
}

/// Evaluate one filter against one (possibly absent) cell value.
fn cell_matches(filter: &Filter, value: Option<&str>) -> bool {
    // No cell for the filtered column: fails closed for every operator.
    let Some(value) = value else {
        return false;
    };
    match filter.operator {
        FilterOperator::Contains => filter.operand.is_empty() || value.contains(&filter.operand),
        FilterOperator::NotContains => filter.operand.is_empty() || !value.contains(&filter.operand),
        FilterOperator::Equals => filter.operand.is_empty() || value == filter.operand,
        // Operand is ignored for the emptiness operators.
        FilterOperator::IsEmpty => value.is_empty(),
        FilterOperator::IsNotEmpty => !value.is_empty(),
        FilterOperator::GreaterThan => match (parse_number(value), parse_number(&filter.operand)) {
            (Some(cell), Some(operand)) => cell > operand,
            _ => false,
        },
        FilterOperator::LessThan => match (parse_number(value), parse_number(&filter.operand)) {
            (Some(cell), Some(operand)) => cell < operand,
            _ => false,
        },
    }
}

/// Stable multi-key sort per the view's priority list.
pub fn sort_rows(rows: &mut [MaterializedRow], sorting: &[SortKey]) {
    if sorting.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for key in sorting {
            let ordering = compare_by_key(a, b, key);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Compare two rows under one sort key.
///
/// A missing cell on either side skips the key (treated as equal). Numeric
/// values sort before non-numeric ones in both directions; `descending`
/// reverses only the within-class comparison.
fn compare_by_key(a: &MaterializedRow, b: &MaterializedRow, key: &SortKey) -> Ordering {
    let (Some(value_a), Some(value_b)) =
        (a.values.get(&key.column_id), b.values.get(&key.column_id))
    else {
        return Ordering::Equal;
    };

    let ordering = match (parse_number(value_a), parse_number(value_b)) {
        (Some(num_a), Some(num_b)) => num_a.partial_cmp(&num_b).unwrap_or(Ordering::Equal),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => value_a.cmp(value_b),
    };
    if key.descending {
        ordering.reverse()
    } else {
        ordering
    }
}
