//! Transactional in-memory storage engine.
//!
//! This is the single shared mutable resource of the system. All record
//! state lives behind one mutex, and every mutation runs as a transaction:
//! the operation reads a consistent snapshot, stages its writes, and the
//! staged writes are applied only after every validation has passed and the
//! commit gate has cleared. An error anywhere before the gate leaves no
//! partial state, so a reader never observes a column without its backfilled
//! cells or a row without its cell set.
//!
//! The commit gate doubles as the deterministic fault injector used by the
//! ingestion tests: [`Storage::fail_nth_commit`] arms a one-shot failure for
//! the n-th commit carrying a given transaction label.

use crate::error::{GridError, Result};
use crate::model::{
    Base, BaseId, Cell, Column, ColumnId, Filter, Row, RowId, SortKey, Table, TableId, View, ViewId,
};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A staged write. Writes are validated inside the transaction closure and
/// applied infallibly after the commit gate.
pub(crate) enum Write {
    Base(Base),
    Table(Table),
    Column(Column),
    Row(Row),
    Cell(Cell),
    /// Point-write of an existing cell's value (last-committed-wins).
    CellValue {
        row_id: RowId,
        column_id: ColumnId,
        value: String,
    },
    View(View),
    /// Set a single column's visibility entry in a view.
    ViewVisibility {
        view_id: ViewId,
        column_id: ColumnId,
        visible: bool,
    },
    /// Wholesale replacement of one piece of a view's persisted state.
    ViewState {
        view_id: ViewId,
        patch: ViewPatch,
    },
}

pub(crate) enum ViewPatch {
    Visibility(HashMap<ColumnId, bool>),
    Sorting(Vec<SortKey>),
    Filters(Vec<Filter>),
}

#[derive(Default)]
pub(crate) struct Inner {
    bases: HashMap<BaseId, Base>,
    tables: HashMap<TableId, Table>,
    columns: HashMap<ColumnId, Column>,
    rows: HashMap<RowId, Row>,
    /// Cells keyed by row then column; the nested map enforces the
    /// (row, column) uniqueness constraint and cascades with its row.
    cells: HashMap<RowId, HashMap<ColumnId, Cell>>,
    views: HashMap<ViewId, View>,
    /// Monotonic creation counter; breaks creation-timestamp ties so
    /// creation ordering is total.
    seq: u64,
    /// Armed fault: fail the n-th commit with the given label, once.
    fault: Option<(String, usize)>,
}

impl Inner {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub(crate) fn base(&self, id: BaseId) -> Result<&Base> {
        self.bases
            .get(&id)
            .ok_or_else(|| GridError::not_found(format!("base {}", id)))
    }

    pub(crate) fn table(&self, id: TableId) -> Result<&Table> {
        self.tables
            .get(&id)
            .ok_or_else(|| GridError::not_found(format!("table {}", id)))
    }

    pub(crate) fn row(&self, id: RowId) -> Result<&Row> {
        self.rows
            .get(&id)
            .ok_or_else(|| GridError::not_found(format!("row {}", id)))
    }

    pub(crate) fn view(&self, id: ViewId) -> Result<&View> {
        self.views
            .get(&id)
            .ok_or_else(|| GridError::not_found(format!("view {}", id)))
    }

    pub(crate) fn cell(&self, row_id: RowId, column_id: ColumnId) -> Result<&Cell> {
        self.cells
            .get(&row_id)
            .and_then(|row_cells| row_cells.get(&column_id))
            .ok_or_else(|| GridError::not_found(format!("cell ({}, {})", row_id, column_id)))
    }

    pub(crate) fn cells_of(&self, row_id: RowId) -> Option<&HashMap<ColumnId, Cell>> {
        self.cells.get(&row_id)
    }

    pub(crate) fn bases_ordered(&self) -> Vec<&Base> {
        let mut bases: Vec<&Base> = self.bases.values().collect();
        bases.sort_by_key(|b| (b.created_at, b.seq));
        bases
    }

    pub(crate) fn tables_of(&self, base_id: BaseId) -> Vec<&Table> {
        let mut tables: Vec<&Table> = self
            .tables
            .values()
            .filter(|t| t.base_id == base_id)
            .collect();
        tables.sort_by_key(|t| (t.created_at, t.seq));
        tables
    }

    /// Columns of a table in creation order.
    pub(crate) fn columns_of(&self, table_id: TableId) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self
            .columns
            .values()
            .filter(|c| c.table_id == table_id)
            .collect();
        columns.sort_by_key(|c| (c.created_at, c.seq));
        columns
    }

    /// Rows of a table in creation order. This order is the stable
    /// tie-breaker for the query engine's sort.
    pub(crate) fn rows_of(&self, table_id: TableId) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self
            .rows
            .values()
            .filter(|r| r.table_id == table_id)
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.seq));
        rows
    }

    pub(crate) fn views_of(&self, table_id: TableId) -> Vec<&View> {
        let mut views: Vec<&View> = self
            .views
            .values()
            .filter(|v| v.table_id == table_id)
            .collect();
        views.sort_by_key(|v| (v.created_at, v.seq));
        views
    }

    fn commit_gate(&mut self, label: &str) -> Result<()> {
        if let Some((fault_label, remaining)) = self.fault.as_mut() {
            if fault_label == label {
                if *remaining <= 1 {
                    self.fault = None;
                    return Err(GridError::Transaction(format!(
                        "injected commit failure for '{}'",
                        label
                    )));
                }
                *remaining -= 1;
            }
        }
        Ok(())
    }

    fn apply(&mut self, writes: Vec<Write>) {
        for write in writes {
            match write {
                Write::Base(mut base) => {
                    base.seq = self.next_seq();
                    self.bases.insert(base.id, base);
                }
                Write::Table(mut table) => {
                    table.seq = self.next_seq();
                    self.tables.insert(table.id, table);
                }
                Write::Column(mut column) => {
                    column.seq = self.next_seq();
                    self.columns.insert(column.id, column);
                }
                Write::Row(mut row) => {
                    row.seq = self.next_seq();
                    self.cells.entry(row.id).or_default();
                    self.rows.insert(row.id, row);
                }
                Write::Cell(cell) => {
                    self.cells.entry(cell.row_id).or_default().insert(cell.column_id, cell);
                }
                Write::CellValue {
                    row_id,
                    column_id,
                    value,
                } => {
                    if let Some(cell) = self
                        .cells
                        .get_mut(&row_id)
                        .and_then(|row_cells| row_cells.get_mut(&column_id))
                    {
                        cell.value = value;
                    }
                }
                Write::View(mut view) => {
                    view.seq = self.next_seq();
                    self.views.insert(view.id, view);
                }
                Write::ViewVisibility {
                    view_id,
                    column_id,
                    visible,
                } => {
                    if let Some(view) = self.views.get_mut(&view_id) {
                        view.column_visibility.insert(column_id, visible);
                    }
                }
                Write::ViewState { view_id, patch } => {
                    if let Some(view) = self.views.get_mut(&view_id) {
                        match patch {
                            ViewPatch::Visibility(map) => view.column_visibility = map,
                            ViewPatch::Sorting(sorts) => view.sorting_state = sorts,
                            ViewPatch::Filters(filters) => view.column_filters = filters,
                        }
                    }
                }
            }
        }
    }
}

/// A transaction in flight: a read view of the pre-state plus the staged
/// writes. Reads always see the snapshot the transaction started from.
pub(crate) struct Txn<'a> {
    inner: &'a Inner,
    writes: Vec<Write>,
}

impl<'a> Txn<'a> {
    pub(crate) fn stage(&mut self, write: Write) {
        self.writes.push(write);
    }

    pub(crate) fn base(&self, id: BaseId) -> Result<&Base> {
        self.inner.base(id)
    }

    pub(crate) fn table(&self, id: TableId) -> Result<&Table> {
        self.inner.table(id)
    }

    pub(crate) fn row(&self, id: RowId) -> Result<&Row> {
        self.inner.row(id)
    }

    pub(crate) fn view(&self, id: ViewId) -> Result<&View> {
        self.inner.view(id)
    }

    pub(crate) fn cell(&self, row_id: RowId, column_id: ColumnId) -> Result<&Cell> {
        self.inner.cell(row_id, column_id)
    }

    pub(crate) fn columns_of(&self, table_id: TableId) -> Vec<&Column> {
        self.inner.columns_of(table_id)
    }

    pub(crate) fn rows_of(&self, table_id: TableId) -> Vec<&Row> {
        self.inner.rows_of(table_id)
    }

    pub(crate) fn views_of(&self, table_id: TableId) -> Vec<&View> {
        self.inner.views_of(table_id)
    }
}

/// Handle to the shared store. Cheap to clone; all clones see the same
/// records.
#[derive(Clone, Default)]
pub struct Storage {
    inner: Arc<Mutex<Inner>>,
}

impl Storage {
    pub fn new() -> Self {
        Storage::default()
    }

    /// Arm a one-shot commit failure: the `nth` (1-based) commit whose
    /// transaction label equals `label` fails with a transaction error and
    /// applies nothing. Used as the test double for storage outages.
    pub fn fail_nth_commit(&self, label: &str, nth: usize) {
        let mut inner = self.inner.lock().expect("storage mutex poisoned");
        inner.fault = Some((label.to_string(), nth));
    }

    /// Run a read-only closure against a consistent snapshot.
    pub(crate) fn with_inner<T>(&self, read: impl FnOnce(&Inner) -> Result<T>) -> Result<T> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| GridError::Transaction("storage mutex poisoned".to_string()))?;
        read(&inner)
    }

    /// Run a transaction: validate and stage writes against a snapshot, then
    /// commit them atomically. If the closure errors, or the commit gate
    /// fails, no write is applied.
    pub(crate) fn transaction<T>(
        &self,
        label: &str,
        build: impl FnOnce(&mut Txn<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| GridError::Transaction("storage mutex poisoned".to_string()))?;

        let (value, writes) = {
            let mut txn = Txn {
                inner: &*inner,
                writes: Vec::new(),
            };
            let value = build(&mut txn)?;
            (value, txn.writes)
        };

        inner.commit_gate(label)?;
        let write_count = writes.len();
        inner.apply(writes);
        debug!("committed {} ({} writes)", label, write_count);
        Ok(value)
    }
}
