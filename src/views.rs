//! View Store: named, persisted filter/sort/visibility bundles per table.
//!
//! Each of the three pieces of state is replaced wholesale by its update
//! operation; views are switched by identity, never merged. Filters and sort
//! keys referencing columns that no longer match anything simply fail closed
//! or skip at evaluation time, so no referential validation happens here.

use crate::error::Result;
use crate::model::{ColumnId, Filter, SortKey, TableId, View, ViewId};
use crate::storage::{Storage, ViewPatch, Write};
use std::collections::HashMap;

#[derive(Clone)]
pub struct ViewStore {
    storage: Storage,
}

impl ViewStore {
    pub fn new(storage: Storage) -> Self {
        ViewStore { storage }
    }

    /// Create a view with every current column visible and no sorting or
    /// filtering.
    pub fn create_view(&self, table_id: TableId, name: &str) -> Result<View> {
        self.storage.transaction("create_view", |txn| {
            txn.table(table_id)?;
            let mut view = View::new(table_id, name);
            view.column_visibility = txn
                .columns_of(table_id)
                .iter()
                .map(|c| (c.id, true))
                .collect();
            txn.stage(Write::View(view.clone()));
            Ok(view)
        })
    }

    pub fn get_view(&self, view_id: ViewId) -> Result<View> {
        self.storage.with_inner(|inner| inner.view(view_id).cloned())
    }

    /// All views of a table, creation order.
    pub fn get_views_by_table(&self, table_id: TableId) -> Result<Vec<View>> {
        self.storage.with_inner(|inner| {
            inner.table(table_id)?;
            Ok(inner.views_of(table_id).into_iter().cloned().collect())
        })
    }

    /// Replace the view's visibility map wholesale.
    pub fn update_column_visibility(
        &self,
        view_id: ViewId,
        column_visibility: HashMap<ColumnId, bool>,
    ) -> Result<View> {
        self.storage.transaction("update_view", |txn| {
            let mut view = txn.view(view_id)?.clone();
            txn.stage(Write::ViewState {
                view_id,
                patch: ViewPatch::Visibility(column_visibility.clone()),
            });
            view.column_visibility = column_visibility;
            Ok(view)
        })
    }

    /// Replace the view's sort priority list wholesale.
    pub fn update_sorting_state(&self, view_id: ViewId, sorting_state: Vec<SortKey>) -> Result<View> {
        self.storage.transaction("update_view", |txn| {
            let mut view = txn.view(view_id)?.clone();
            txn.stage(Write::ViewState {
                view_id,
                patch: ViewPatch::Sorting(sorting_state.clone()),
            });
            view.sorting_state = sorting_state;
            Ok(view)
        })
    }

    /// Replace the view's filter list wholesale.
    pub fn update_column_filters(&self, view_id: ViewId, column_filters: Vec<Filter>) -> Result<View> {
        self.storage.transaction("update_view", |txn| {
            let mut view = txn.view(view_id)?.clone();
            txn.stage(Write::ViewState {
                view_id,
                patch: ViewPatch::Filters(column_filters.clone()),
            });
            view.column_filters = column_filters;
            Ok(view)
        })
    }
}
