//! GridBase - Dynamic Table Engine
//!
//! A data-serving core for spreadsheet-like tables whose columns are defined
//! at runtime. Cells live in an entity-attribute-value store; saved views
//! carry per-table filter, sort, and column-visibility state; a stateless
//! query engine serves filtered, sorted, paginated pages with exact totals;
//! and a chunked pipeline bulk-generates rows under bounded concurrency.

pub mod cells;
pub mod error;
pub mod ingest;
pub mod model;
pub mod query;
pub mod reconcile;
pub mod schema;
pub mod storage;
pub mod views;

pub use cells::CellStore;
pub use error::{GridError, Result};
pub use model::{
    Base, BaseId, Cell, CellId, CellValue, Column, ColumnId, ColumnType, Filter, FilterOperator,
    Row, RowId, RowWithCells, SortKey, Table, TableId, View, ViewId,
};
pub use ingest::{BulkIngestor, IngestConfig, IngestSummary};
pub use query::{MaterializedRow, QueryEngine, RowPage};
pub use reconcile::{CellWrite, ColumnRef, QueuedEdit, Reconciler, Resolution, RowRef, TempId};
pub use schema::SchemaStore;
pub use storage::Storage;
pub use views::ViewStore;

// HTTP server modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod messages;
#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::collections::HashSet;

    struct Workspace {
        storage: Storage,
        schema: SchemaStore,
        cells: CellStore,
        views: ViewStore,
        query: QueryEngine,
    }

    fn workspace() -> Workspace {
        let storage = Storage::new();
        Workspace {
            schema: SchemaStore::new(storage.clone()),
            cells: CellStore::new(storage.clone()),
            views: ViewStore::new(storage.clone()),
            query: QueryEngine::new(storage.clone()),
            storage,
        }
    }

    #[test]
    fn test_complete_workflow() {
        let ws = workspace();

        // A fresh base ships with a seeded table.
        let base = ws.schema.create_base("Product Tracker").unwrap();
        let table = ws.schema.get_tables_by_base(base.id).unwrap().remove(0);
        let view = ws.views.get_views_by_table(table.id).unwrap().remove(0);

        // Fill the Name column on the seeded rows.
        let name_col = ws.schema.get_columns(table.id).unwrap()[0].id;
        let rows = ws.cells.get_rows(table.id).unwrap();
        for (row, name) in rows.iter().zip(["Widget", "Gadget", "Doohickey"]) {
            ws.cells.update_cell(row.row.id, name_col, name).unwrap();
        }

        // Add a NUMBER column and populate it.
        let (price_col, backfilled) = ws
            .schema
            .add_column(table.id, "Price", ColumnType::Number)
            .unwrap();
        assert_eq!(backfilled.len(), 3);
        for (row, price) in rows.iter().zip(["9.99", "19.99", "4.99"]) {
            ws.cells.update_cell(row.row.id, price_col.id, price).unwrap();
        }

        // Filter to prices above 5, sorted descending.
        ws.views
            .update_column_filters(
                view.id,
                vec![Filter::new(price_col.id, FilterOperator::GreaterThan, "5")],
            )
            .unwrap();
        ws.views
            .update_sorting_state(view.id, vec![SortKey::descending(price_col.id)])
            .unwrap();

        let page = ws
            .query
            .get_rows_filtered_sorted(table.id, view.id, 0, 50)
            .unwrap();
        assert_eq!(page.total_row_count, 2);
        let names: Vec<&str> = page
            .rows
            .iter()
            .map(|r| r.values[&name_col].as_str())
            .collect();
        assert_eq!(names, ["Gadget", "Widget"]);

        // Hiding the price column changes visibility, not query results.
        let mut visibility = view.column_visibility.clone();
        visibility.insert(price_col.id, false);
        let view = ws.views.update_column_visibility(view.id, visibility).unwrap();
        let visible = ws.schema.get_visible_columns(table.id, &view).unwrap();
        assert!(visible.iter().all(|c| c.id != price_col.id));
        let page_after = ws
            .query
            .get_rows_filtered_sorted(table.id, view.id, 0, 50)
            .unwrap();
        assert_eq!(page_after.total_row_count, 2);
    }

    #[test]
    fn test_pages_partition_the_filtered_sorted_universe() {
        let ws = workspace();
        let base = ws.schema.create_base("Paging").unwrap();
        let table = ws.schema.get_tables_by_base(base.id).unwrap().remove(0);
        let view = ws.views.get_views_by_table(table.id).unwrap().remove(0);
        let (score_col, _) = ws
            .schema
            .add_column(table.id, "Score", ColumnType::Number)
            .unwrap();
        let score_col = score_col.id;

        // 25 extra rows with a deterministic spread of scores, some
        // non-numeric.
        for i in 0..25u32 {
            let row = ws.cells.add_row(table.id).unwrap();
            let value = match i % 5 {
                0 => String::new(),
                1 => "n/a".to_string(),
                _ => format!("{}", (i * 37) % 11),
            };
            ws.cells.update_cell(row.row.id, score_col, &value).unwrap();
        }

        ws.views
            .update_sorting_state(view.id, vec![SortKey::ascending(score_col)])
            .unwrap();
        ws.views
            .update_column_filters(
                view.id,
                vec![Filter::new(score_col, FilterOperator::IsNotEmpty, "")],
            )
            .unwrap();

        let full = ws
            .query
            .get_rows_filtered_sorted(table.id, view.id, 0, 1000)
            .unwrap();

        let page_size = 4;
        let mut stitched = Vec::new();
        let mut start = 0;
        loop {
            let page = ws
                .query
                .get_rows_filtered_sorted(table.id, view.id, start, page_size)
                .unwrap();
            assert_eq!(page.total_row_count, full.total_row_count);
            if page.rows.is_empty() {
                break;
            }
            stitched.extend(page.rows);
            start += page_size;
        }

        // No gaps, no duplicates, same order.
        assert_eq!(stitched, full.rows);
        let distinct: HashSet<RowId> = stitched.iter().map(|r| r.id).collect();
        assert_eq!(distinct.len(), stitched.len());
    }

    #[test]
    fn test_pushdown_matches_reference_on_a_larger_table() {
        let ws = workspace();
        let base = ws.schema.create_base("Oracle").unwrap();
        let table = ws.schema.get_tables_by_base(base.id).unwrap().remove(0);
        let name_col = ws.schema.get_columns(table.id).unwrap()[0].id;
        let (score_col, _) = ws
            .schema
            .add_column(table.id, "Score", ColumnType::Number)
            .unwrap();
        let score_col = score_col.id;

        for i in 0..40u32 {
            let row = ws.cells.add_row(table.id).unwrap();
            ws.cells
                .update_cell(row.row.id, name_col, &format!("item-{}", i % 7))
                .unwrap();
            if i % 3 != 0 {
                ws.cells
                    .update_cell(row.row.id, score_col, &format!("{}", (i * 13) % 29))
                    .unwrap();
            }
        }

        let rows = ws.query.materialize(table.id).unwrap();
        let filter_sets = [
            vec![Filter::new(score_col, FilterOperator::GreaterThan, "10")],
            vec![Filter::new(name_col, FilterOperator::Contains, "item-3")],
            vec![
                Filter::new(name_col, FilterOperator::NotContains, "item-1"),
                Filter::new(score_col, FilterOperator::LessThan, "20"),
            ],
            vec![
                Filter::new(score_col, FilterOperator::IsEmpty, ""),
                Filter::new(name_col, FilterOperator::IsNotEmpty, ""),
            ],
        ];
        for filters in &filter_sets {
            let pushed = query::filter_row_ids(&rows, filters);
            let reference: HashSet<RowId> = rows
                .iter()
                .filter(|row| query::row_matches(filters, row))
                .map(|row| row.id)
                .collect();
            assert_eq!(pushed, reference, "paths disagree for {:?}", filters);
        }
    }

    #[test]
    fn test_bulk_ingestion_then_query() {
        let ws = workspace();
        let base = ws.schema.create_base("Load").unwrap();
        let table = ws.schema.get_tables_by_base(base.id).unwrap().remove(0);
        let view = ws.views.get_views_by_table(table.id).unwrap().remove(0);

        let ingestor = BulkIngestor::with_config(
            ws.storage.clone(),
            IngestConfig {
                row_count: 1000,
                chunk_size: 250,
                max_in_flight: 5,
            },
        );
        let summary = ingestor.add_bulk_rows(table.id).unwrap();
        assert_eq!(summary.rows_added, 1000);

        let page = ws
            .query
            .get_rows_filtered_sorted(table.id, view.id, 0, 10)
            .unwrap();
        assert_eq!(page.total_row_count, 1003);
        assert_eq!(page.rows.len(), 10);
    }

    #[test]
    fn test_reconciler_drives_real_cell_replay() {
        let ws = workspace();
        let base = ws.schema.create_base("Optimistic").unwrap();
        let table = ws.schema.get_tables_by_base(base.id).unwrap().remove(0);
        let name_col = ws.schema.get_columns(table.id).unwrap()[0].id;

        // The client renders a placeholder row and edits it before the
        // create call resolves.
        let mut reconciler = Reconciler::new();
        let temp = TempId::generate();
        reconciler.register_row(temp);
        reconciler
            .queue_cell_edit(RowRef::Temp(temp), ColumnRef::Committed(name_col), "Draft")
            .unwrap();
        reconciler
            .queue_cell_edit(RowRef::Temp(temp), ColumnRef::Committed(name_col), "Final")
            .unwrap();

        // The create resolves; queued edits replay against the permanent id.
        let created = ws.cells.add_row(table.id).unwrap();
        let writes = reconciler.confirm_row(temp, created.row.id).unwrap();
        assert_eq!(writes.len(), 1);
        for write in writes {
            ws.cells
                .update_cell(write.row_id, write.column_id, &write.value)
                .unwrap();
        }

        let rows = ws.cells.get_rows(table.id).unwrap();
        let row = rows.iter().find(|r| r.row.id == created.row.id).unwrap();
        let name = row.cells.iter().find(|c| c.column_id == name_col).unwrap();
        assert_eq!(name.value, "Final");
    }

    #[test]
    fn test_add_column_keeps_row_invariant_under_load() {
        let ws = workspace();
        let base = ws.schema.create_base("Invariant").unwrap();
        let table = ws.schema.get_tables_by_base(base.id).unwrap().remove(0);

        let ingestor = BulkIngestor::with_config(
            ws.storage.clone(),
            IngestConfig {
                row_count: 200,
                chunk_size: 50,
                max_in_flight: 4,
            },
        );
        ingestor.add_bulk_rows(table.id).unwrap();

        let (column, cells) = ws
            .schema
            .add_column(table.id, "Batch", ColumnType::Text)
            .unwrap();
        assert_eq!(cells.len(), 203);

        let rows = ws.cells.get_rows(table.id).unwrap();
        let column_count = ws.schema.get_columns(table.id).unwrap().len();
        for row in &rows {
            assert_eq!(row.cells.len(), column_count);
            assert_eq!(
                row.cells.iter().filter(|c| c.column_id == column.id).count(),
                1
            );
        }
    }
}
