//! Mutation Reconciler: the contract a client follows to render a created
//! row or column before the create call resolves.
//!
//! The caller assigns a [`TempId`], renders a complete placeholder, and
//! queues any cell edits made against it. Each placeholder moves through an
//! explicit state machine, `Pending -> Confirmed(real id) | Rejected`. On
//! confirmation, every queued reference to the temporary identifier is
//! rewritten to the permanent one and the edits whose references are fully
//! permanent are handed back for replay as real `update_cell` calls. On
//! rejection, the placeholder and every edit referencing it are discarded
//! and returned so the caller can restore its prior rendered state.
//!
//! The queue is keyed by the (row, column) reference pair: a later edit to
//! the same pair replaces the earlier one, so replay carries the final value
//! only (last write wins, matching the store's own cell semantics).

use crate::error::{GridError, Result};
use crate::model::{ColumnId, RowId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A locally unique identifier the client assigns to a placeholder entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(Uuid);

impl TempId {
    pub fn generate() -> Self {
        TempId(Uuid::new_v4())
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a placeholder stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<Id> {
    Pending,
    Confirmed(Id),
    Rejected,
}

/// A row reference that may still be temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowRef {
    Temp(TempId),
    Committed(RowId),
}

/// A column reference that may still be temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    Temp(TempId),
    Committed(ColumnId),
}

/// A cell edit queued while at least one of its references was temporary.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEdit {
    pub row: RowRef,
    pub column: ColumnRef,
    pub value: String,
}

/// A fully resolved edit, ready to replay as an `update_cell` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub row_id: RowId,
    pub column_id: ColumnId,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    rows: HashMap<TempId, Resolution<RowId>>,
    columns: HashMap<TempId, Resolution<ColumnId>>,
    queue: Vec<QueuedEdit>,
}

impl Reconciler {
    pub fn new() -> Self {
        Reconciler::default()
    }

    /// Begin tracking a placeholder row.
    pub fn register_row(&mut self, temp: TempId) {
        self.rows.insert(temp, Resolution::Pending);
    }

    /// Begin tracking a placeholder column.
    pub fn register_column(&mut self, temp: TempId) {
        self.columns.insert(temp, Resolution::Pending);
    }

    pub fn row_resolution(&self, temp: TempId) -> Option<Resolution<RowId>> {
        self.rows.get(&temp).copied()
    }

    pub fn column_resolution(&self, temp: TempId) -> Option<Resolution<ColumnId>> {
        self.columns.get(&temp).copied()
    }

    /// Edits still waiting on a confirmation.
    pub fn pending_edits(&self) -> &[QueuedEdit] {
        &self.queue
    }

    /// Record a cell edit. If both references are already permanent the edit
    /// is returned immediately for direct application; otherwise it is
    /// queued (replacing any earlier edit to the same pair) until the
    /// outstanding temporary references confirm.
    pub fn queue_cell_edit(
        &mut self,
        row: RowRef,
        column: ColumnRef,
        value: &str,
    ) -> Result<Option<CellWrite>> {
        let row = self.resolve_row(row)?;
        let column = self.resolve_column(column)?;
        if let (RowRef::Committed(row_id), ColumnRef::Committed(column_id)) = (row, column) {
            return Ok(Some(CellWrite {
                row_id,
                column_id,
                value: value.to_string(),
            }));
        }

        let edit = QueuedEdit {
            row,
            column,
            value: value.to_string(),
        };
        match self
            .queue
            .iter_mut()
            .find(|queued| queued.row == row && queued.column == column)
        {
            Some(existing) => *existing = edit,
            None => self.queue.push(edit),
        }
        Ok(None)
    }

    /// Confirm a placeholder row against its server-assigned identifier.
    /// Returns the queued edits that became fully permanent, in queue order.
    pub fn confirm_row(&mut self, temp: TempId, row_id: RowId) -> Result<Vec<CellWrite>> {
        transition(&mut self.rows, temp, Resolution::Confirmed(row_id))?;
        for edit in &mut self.queue {
            if edit.row == RowRef::Temp(temp) {
                edit.row = RowRef::Committed(row_id);
            }
        }
        Ok(self.drain_ready())
    }

    /// Confirm a placeholder column against its server-assigned identifier.
    pub fn confirm_column(&mut self, temp: TempId, column_id: ColumnId) -> Result<Vec<CellWrite>> {
        transition(&mut self.columns, temp, Resolution::Confirmed(column_id))?;
        for edit in &mut self.queue {
            if edit.column == ColumnRef::Temp(temp) {
                edit.column = ColumnRef::Committed(column_id);
            }
        }
        Ok(self.drain_ready())
    }

    /// Discard a placeholder row. Returns the discarded edits so the caller
    /// can restore its prior rendered state.
    pub fn reject_row(&mut self, temp: TempId) -> Result<Vec<QueuedEdit>> {
        transition(&mut self.rows, temp, Resolution::Rejected)?;
        Ok(self.discard(|edit| edit.row == RowRef::Temp(temp)))
    }

    /// Discard a placeholder column.
    pub fn reject_column(&mut self, temp: TempId) -> Result<Vec<QueuedEdit>> {
        transition(&mut self.columns, temp, Resolution::Rejected)?;
        Ok(self.discard(|edit| edit.column == ColumnRef::Temp(temp)))
    }

    fn resolve_row(&self, row: RowRef) -> Result<RowRef> {
        match row {
            RowRef::Temp(temp) => match self.rows.get(&temp) {
                Some(Resolution::Pending) => Ok(row),
                Some(Resolution::Confirmed(id)) => Ok(RowRef::Committed(*id)),
                Some(Resolution::Rejected) => Err(GridError::Validation(format!(
                    "row placeholder {} was rejected",
                    temp
                ))),
                None => Err(GridError::Validation(format!(
                    "unregistered row placeholder {}",
                    temp
                ))),
            },
            RowRef::Committed(_) => Ok(row),
        }
    }

    fn resolve_column(&self, column: ColumnRef) -> Result<ColumnRef> {
        match column {
            ColumnRef::Temp(temp) => match self.columns.get(&temp) {
                Some(Resolution::Pending) => Ok(column),
                Some(Resolution::Confirmed(id)) => Ok(ColumnRef::Committed(*id)),
                Some(Resolution::Rejected) => Err(GridError::Validation(format!(
                    "column placeholder {} was rejected",
                    temp
                ))),
                None => Err(GridError::Validation(format!(
                    "unregistered column placeholder {}",
                    temp
                ))),
            },
            ColumnRef::Committed(_) => Ok(column),
        }
    }

    fn drain_ready(&mut self) -> Vec<CellWrite> {
        let mut ready = Vec::new();
        self.queue.retain(|edit| {
            if let (RowRef::Committed(row_id), ColumnRef::Committed(column_id)) =
                (edit.row, edit.column)
            {
                ready.push(CellWrite {
                    row_id,
                    column_id,
                    value: edit.value.clone(),
                });
                false
            } else {
                true
            }
        });
        ready
    }

    fn discard(&mut self, hits: impl Fn(&QueuedEdit) -> bool) -> Vec<QueuedEdit> {
        let mut discarded = Vec::new();
        self.queue.retain(|edit| {
            if hits(edit) {
                discarded.push(edit.clone());
                false
            } else {
                true
            }
        });
        discarded
    }
}

/// Move a placeholder out of `Pending`. Confirming or rejecting an unknown
/// or already-resolved placeholder is a caller bug surfaced as a validation
/// error.
fn transition<Id>(
    states: &mut HashMap<TempId, Resolution<Id>>,
    temp: TempId,
    next: Resolution<Id>,
) -> Result<()> {
    let state = states
        .get_mut(&temp)
        .ok_or_else(|| GridError::Validation(format!("unregistered placeholder {}", temp)))?;
    if !matches!(state, Resolution::Pending) {
        return Err(GridError::Validation(format!(
            "placeholder {} already resolved",
            temp
        )));
    }
    *state = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_replays_queued_edits_against_permanent_id() {
        let mut reconciler = Reconciler::new();
        let temp = TempId::generate();
        let column_id = ColumnId::generate();
        reconciler.register_row(temp);

        // Edits against the placeholder queue instead of applying.
        assert_eq!(
            reconciler
                .queue_cell_edit(RowRef::Temp(temp), ColumnRef::Committed(column_id), "draft")
                .unwrap(),
            None
        );
        // Last write to the same pair wins.
        reconciler
            .queue_cell_edit(RowRef::Temp(temp), ColumnRef::Committed(column_id), "final")
            .unwrap();
        assert_eq!(reconciler.pending_edits().len(), 1);

        let row_id = RowId::generate();
        let writes = reconciler.confirm_row(temp, row_id).unwrap();
        assert_eq!(
            writes,
            vec![CellWrite {
                row_id,
                column_id,
                value: "final".to_string(),
            }]
        );
        assert!(reconciler.pending_edits().is_empty());
        assert_eq!(
            reconciler.row_resolution(temp),
            Some(Resolution::Confirmed(row_id))
        );
    }

    #[test]
    fn test_edit_with_both_refs_committed_applies_immediately() {
        let mut reconciler = Reconciler::new();
        let row_id = RowId::generate();
        let column_id = ColumnId::generate();
        let write = reconciler
            .queue_cell_edit(RowRef::Committed(row_id), ColumnRef::Committed(column_id), "x")
            .unwrap();
        assert!(write.is_some());
        assert!(reconciler.pending_edits().is_empty());
    }

    #[test]
    fn test_edit_blocked_on_two_placeholders_needs_both_confirmations() {
        let mut reconciler = Reconciler::new();
        let temp_row = TempId::generate();
        let temp_column = TempId::generate();
        reconciler.register_row(temp_row);
        reconciler.register_column(temp_column);

        reconciler
            .queue_cell_edit(RowRef::Temp(temp_row), ColumnRef::Temp(temp_column), "v")
            .unwrap();

        let row_id = RowId::generate();
        assert!(reconciler.confirm_row(temp_row, row_id).unwrap().is_empty());
        assert_eq!(reconciler.pending_edits().len(), 1);

        let column_id = ColumnId::generate();
        let writes = reconciler.confirm_column(temp_column, column_id).unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].row_id, row_id);
        assert_eq!(writes[0].column_id, column_id);
    }

    #[test]
    fn test_edits_after_confirmation_resolve_through_the_mapping() {
        let mut reconciler = Reconciler::new();
        let temp = TempId::generate();
        reconciler.register_row(temp);
        let row_id = RowId::generate();
        reconciler.confirm_row(temp, row_id).unwrap();

        // A straggling edit still addressed to the temp id rewrites to the
        // permanent id and applies immediately.
        let write = reconciler
            .queue_cell_edit(
                RowRef::Temp(temp),
                ColumnRef::Committed(ColumnId::generate()),
                "late",
            )
            .unwrap()
            .unwrap();
        assert_eq!(write.row_id, row_id);
    }

    #[test]
    fn test_reject_discards_placeholder_and_queued_edits() {
        let mut reconciler = Reconciler::new();
        let temp = TempId::generate();
        let column_id = ColumnId::generate();
        reconciler.register_row(temp);
        reconciler
            .queue_cell_edit(RowRef::Temp(temp), ColumnRef::Committed(column_id), "lost")
            .unwrap();

        let discarded = reconciler.reject_row(temp).unwrap();
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].value, "lost");
        assert!(reconciler.pending_edits().is_empty());
        assert_eq!(reconciler.row_resolution(temp), Some(Resolution::Rejected));

        // Further edits against the rejected placeholder are refused.
        assert!(reconciler
            .queue_cell_edit(RowRef::Temp(temp), ColumnRef::Committed(column_id), "x")
            .is_err());
    }

    #[test]
    fn test_double_confirmation_is_an_error() {
        let mut reconciler = Reconciler::new();
        let temp = TempId::generate();
        reconciler.register_row(temp);
        reconciler.confirm_row(temp, RowId::generate()).unwrap();
        assert!(reconciler.confirm_row(temp, RowId::generate()).is_err());
        assert!(reconciler.confirm_row(TempId::generate(), RowId::generate()).is_err());
    }
}
