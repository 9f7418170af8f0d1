//! Schema Store: bases, tables, and runtime-defined columns.
//!
//! Table creation seeds the defaults a fresh table ships with (four TEXT
//! columns, one view, three empty rows, and the full cell grid) in a single
//! transaction. `add_column` maintains the row invariant by backfilling one
//! empty cell per existing row and marks the new column visible in every
//! view of the table, all atomically.

use crate::error::Result;
use crate::model::{Base, BaseId, Cell, Column, ColumnType, Row, Table, TableId, View};
use crate::storage::{Storage, Txn, Write};
use log::debug;

/// Columns every new table starts with.
pub const DEFAULT_COLUMNS: [&str; 4] = ["Name", "Notes", "Assignee", "Status"];
/// Empty rows every new table starts with.
pub const DEFAULT_ROW_COUNT: usize = 3;
/// Name of the view every new table starts with.
pub const DEFAULT_VIEW_NAME: &str = "Grid View";
/// Name of the table every new base starts with.
pub const DEFAULT_TABLE_NAME: &str = "Table 1";

#[derive(Clone)]
pub struct SchemaStore {
    storage: Storage,
}

impl SchemaStore {
    pub fn new(storage: Storage) -> Self {
        SchemaStore { storage }
    }

    /// Create a base together with its default table.
    pub fn create_base(&self, name: &str) -> Result<Base> {
        self.storage.transaction("create_base", |txn| {
            let base = Base::new(name);
            txn.stage(Write::Base(base.clone()));
            seed_table(txn, base.id, DEFAULT_TABLE_NAME);
            Ok(base)
        })
    }

    pub fn get_bases(&self) -> Result<Vec<Base>> {
        self.storage
            .with_inner(|inner| Ok(inner.bases_ordered().into_iter().cloned().collect()))
    }

    pub fn get_base(&self, base_id: BaseId) -> Result<Base> {
        self.storage.with_inner(|inner| inner.base(base_id).cloned())
    }

    /// Create a table with seeded defaults: the default columns, one view
    /// covering them, and a few empty rows with their full cell grid.
    pub fn create_table(&self, base_id: BaseId, name: &str) -> Result<Table> {
        self.storage.transaction("create_table", |txn| {
            txn.base(base_id)?;
            let table = seed_table(txn, base_id, name);
            debug!("created table {} '{}'", table.id, table.name);
            Ok(table)
        })
    }

    pub fn get_tables_by_base(&self, base_id: BaseId) -> Result<Vec<Table>> {
        self.storage.with_inner(|inner| {
            inner.base(base_id)?;
            Ok(inner.tables_of(base_id).into_iter().cloned().collect())
        })
    }

    /// Add a column to a table. Atomically creates the column, backfills one
    /// empty cell for every existing row, and sets the column visible in
    /// every view of the table. Returns the column and its backfilled cells.
    pub fn add_column(
        &self,
        table_id: TableId,
        name: &str,
        column_type: ColumnType,
    ) -> Result<(Column, Vec<Cell>)> {
        self.storage.transaction("add_column", |txn| {
            txn.table(table_id)?;

            let column = Column::new(table_id, name, column_type);
            let mut cells = Vec::new();
            for row in txn.rows_of(table_id) {
                cells.push(Cell::empty(row.id, column.id));
            }
            let view_ids: Vec<_> = txn.views_of(table_id).iter().map(|v| v.id).collect();

            txn.stage(Write::Column(column.clone()));
            for cell in &cells {
                txn.stage(Write::Cell(cell.clone()));
            }
            for view_id in view_ids {
                txn.stage(Write::ViewVisibility {
                    view_id,
                    column_id: column.id,
                    visible: true,
                });
            }

            debug!(
                "added column {} '{}' to table {} ({} cells backfilled)",
                column.id,
                column.name,
                table_id,
                cells.len()
            );
            Ok((column, cells))
        })
    }

    /// All columns of a table, creation time ascending.
    pub fn get_columns(&self, table_id: TableId) -> Result<Vec<Column>> {
        self.storage.with_inner(|inner| {
            inner.table(table_id)?;
            Ok(inner.columns_of(table_id).into_iter().cloned().collect())
        })
    }

    /// The subset of a table's columns whose id maps to `true` in the view's
    /// visibility, in the same creation order. Absent keys are excluded; the
    /// "not yet decided" default for absent keys is the caller's concern.
    pub fn get_visible_columns(&self, table_id: TableId, view: &View) -> Result<Vec<Column>> {
        self.storage.with_inner(|inner| {
            inner.table(table_id)?;
            Ok(inner
                .columns_of(table_id)
                .into_iter()
                .filter(|c| view.column_visibility.get(&c.id).copied() == Some(true))
                .cloned()
                .collect())
        })
    }
}

/// Stage a new table plus its seeded defaults inside an open transaction.
fn seed_table(txn: &mut Txn<'_>, base_id: BaseId, name: &str) -> Table {
    let table = Table::new(base_id, name);
    txn.stage(Write::Table(table.clone()));

    let columns: Vec<Column> = DEFAULT_COLUMNS
        .iter()
        .map(|col_name| Column::new(table.id, *col_name, ColumnType::Text))
        .collect();
    let rows: Vec<Row> = (0..DEFAULT_ROW_COUNT).map(|_| Row::new(table.id)).collect();

    let mut view = View::new(table.id, DEFAULT_VIEW_NAME);
    view.column_visibility = columns.iter().map(|c| (c.id, true)).collect();
    txn.stage(Write::View(view));

    for column in &columns {
        txn.stage(Write::Column(column.clone()));
    }
    for row in &rows {
        txn.stage(Write::Row(row.clone()));
        for column in &columns {
            txn.stage(Write::Cell(Cell::empty(row.id, column.id)));
        }
    }

    table
}
