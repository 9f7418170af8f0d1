/// Saved Views Example
///
/// This example demonstrates:
/// - Bulk-loading rows as chunked transactions under bounded concurrency
/// - Persisting filter, sort, and visibility state on a view
/// - Paging through the filtered, sorted universe with exact totals

use gridbase::{
    BulkIngestor, CellStore, ColumnType, Filter, FilterOperator, IngestConfig, QueryEngine,
    SchemaStore, SortKey, Storage, ViewStore,
};

fn main() {
    println!("=== GridBase Saved Views Example ===\n");

    let storage = Storage::new();
    let schema = SchemaStore::new(storage.clone());
    let cells = CellStore::new(storage.clone());
    let views = ViewStore::new(storage.clone());
    let query = QueryEngine::new(storage.clone());

    // 1. Seed a table with a Score column.
    println!("1. Creating table...");
    let base = schema.create_base("Benchmarks").unwrap();
    let table = schema.get_tables_by_base(base.id).unwrap().remove(0);
    let (score, _) = schema
        .add_column(table.id, "Score", ColumnType::Number)
        .unwrap();
    println!("   Table '{}' ready\n", table.name);

    // 2. Bulk-load rows.
    println!("2. Bulk-loading rows...");
    let ingestor = BulkIngestor::with_config(
        storage,
        IngestConfig {
            row_count: 2000,
            chunk_size: 500,
            max_in_flight: 4,
        },
    );
    let summary = ingestor.add_bulk_rows(table.id).unwrap();
    println!("   {}\n", summary.message);

    // Spread deterministic scores across the table.
    for (i, row) in cells.get_rows(table.id).unwrap().iter().enumerate() {
        cells
            .update_cell(row.row.id, score.id, &format!("{}", (i * 31) % 997))
            .unwrap();
    }

    // 3. Save filter and sort state on a dedicated view.
    println!("3. Creating a leaderboard view...");
    let leaderboard = views.create_view(table.id, "Leaderboard").unwrap();
    views
        .update_column_filters(
            leaderboard.id,
            vec![Filter::new(score.id, FilterOperator::GreaterThan, "900")],
        )
        .unwrap();
    views
        .update_sorting_state(leaderboard.id, vec![SortKey::descending(score.id)])
        .unwrap();
    println!("   View '{}' saved\n", leaderboard.name);

    // 4. Page through the filtered, sorted universe.
    println!("4. Paging...");
    let page_size = 25;
    let mut start = 0;
    loop {
        let page = query
            .get_rows_filtered_sorted(table.id, leaderboard.id, start, page_size)
            .unwrap();
        if page.rows.is_empty() {
            break;
        }
        println!(
            "   rows [{}, {}) of {} matching",
            start,
            start + page.rows.len(),
            page.total_row_count
        );
        start += page_size;
    }
}
