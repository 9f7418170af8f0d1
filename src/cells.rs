//! Cell Store: rows and the EAV cell records beneath them.
//!
//! `add_row` keeps the row invariant (one cell per current column) by
//! creating the row and its full cell set in one transaction. `update_cell`
//! is a point-write against an existing cell; cells are never created
//! implicitly, because `add_row`/`add_column` already guarantee the pair
//! exists for every live (row, column) combination.

use crate::error::Result;
use crate::model::{Cell, ColumnId, Row, RowId, RowWithCells, TableId};
use crate::storage::{Storage, Write};
use log::debug;

#[derive(Clone)]
pub struct CellStore {
    storage: Storage,
}

impl CellStore {
    pub fn new(storage: Storage) -> Self {
        CellStore { storage }
    }

    /// Create a row with one empty cell per current column of the table.
    pub fn add_row(&self, table_id: TableId) -> Result<RowWithCells> {
        self.storage.transaction("add_row", |txn| {
            txn.table(table_id)?;

            let row = Row::new(table_id);
            let cells: Vec<Cell> = txn
                .columns_of(table_id)
                .iter()
                .map(|column| Cell::empty(row.id, column.id))
                .collect();

            txn.stage(Write::Row(row.clone()));
            for cell in &cells {
                txn.stage(Write::Cell(cell.clone()));
            }

            debug!("added row {} to table {} ({} cells)", row.id, table_id, cells.len());
            Ok(RowWithCells { row, cells })
        })
    }

    /// Point-write of one cell's value. Fails with NotFound when the
    /// (row, column) pair has no cell; never creates one.
    pub fn update_cell(&self, row_id: RowId, column_id: ColumnId, value: &str) -> Result<Cell> {
        self.storage.transaction("update_cell", |txn| {
            let mut cell = txn.cell(row_id, column_id)?.clone();
            txn.stage(Write::CellValue {
                row_id,
                column_id,
                value: value.to_string(),
            });
            cell.value = value.to_string();
            Ok(cell)
        })
    }

    /// Every row of a table with its cells, creation order. Unfiltered and
    /// unpaginated; the serving path for large tables is the query engine.
    pub fn get_rows(&self, table_id: TableId) -> Result<Vec<RowWithCells>> {
        self.storage.with_inner(|inner| {
            inner.table(table_id)?;
            let columns = inner.columns_of(table_id);
            let rows = inner
                .rows_of(table_id)
                .into_iter()
                .map(|row| {
                    let cells = match inner.cells_of(row.id) {
                        Some(row_cells) => columns
                            .iter()
                            .filter_map(|column| row_cells.get(&column.id).cloned())
                            .collect(),
                        None => Vec::new(),
                    };
                    RowWithCells {
                        row: row.clone(),
                        cells,
                    }
                })
                .collect();
            Ok(rows)
        })
    }
}
