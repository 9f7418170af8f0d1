/// Basic Table Operations Example
///
/// This example demonstrates:
/// - Creating a base with its seeded default table
/// - Adding a column at runtime (cells backfill onto every existing row)
/// - Updating cells and reading rows back with typed coercion

use gridbase::{CellStore, CellValue, ColumnType, SchemaStore, Storage};

fn main() {
    println!("=== GridBase Basic Table Example ===\n");

    let storage = Storage::new();
    let schema = SchemaStore::new(storage.clone());
    let cells = CellStore::new(storage);

    // 1. Create a base; it ships with a seeded table.
    println!("1. Creating base...");
    let base = schema.create_base("Product Tracker").unwrap();
    let table = schema.get_tables_by_base(base.id).unwrap().remove(0);
    println!(
        "   Base '{}' created with table '{}'\n",
        base.name, table.name
    );

    // 2. Columns are defined at runtime.
    println!("2. Adding a NUMBER column...");
    let (price, backfilled) = schema
        .add_column(table.id, "Price", ColumnType::Number)
        .unwrap();
    println!(
        "   Column '{}' added, {} cells backfilled\n",
        price.name,
        backfilled.len()
    );

    // 3. Fill in some cells on the seeded rows.
    println!("3. Updating cells...");
    let name_col = schema.get_columns(table.id).unwrap()[0].id;
    let rows = cells.get_rows(table.id).unwrap();
    let items = [("Laptop", "999.99"), ("Mouse", "29.99"), ("Desk", "n/a")];
    for (row, (name, value)) in rows.iter().zip(items) {
        cells.update_cell(row.row.id, name_col, name).unwrap();
        cells.update_cell(row.row.id, price.id, value).unwrap();
    }
    println!("   {} rows populated\n", rows.len());

    // 4. Read rows back; values are stored as text and coerced on read.
    println!("4. Reading rows...");
    for row in cells.get_rows(table.id).unwrap() {
        let name = row
            .cells
            .iter()
            .find(|c| c.column_id == name_col)
            .map(|c| c.value.as_str())
            .unwrap_or("");
        let raw = row
            .cells
            .iter()
            .find(|c| c.column_id == price.id)
            .map(|c| c.value.as_str())
            .unwrap_or("");
        match CellValue::coerce(raw, price.column_type) {
            CellValue::Number(n) => println!("   {} - {:.2}", name, n),
            CellValue::Text(t) => println!("   {} - '{}' (not numeric)", name, t),
        }
    }
}
