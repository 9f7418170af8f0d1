//! HTTP request/response types for the GridBase server.
use crate::model::{
    BaseId, Cell, Column, ColumnId, ColumnType, Filter, RowId, SortKey, TableId, ViewId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBaseRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub base_id: BaseId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddColumnRequest {
    pub table_id: TableId,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRowRequest {
    pub table_id: TableId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCellRequest {
    pub row_id: RowId,
    pub column_id: ColumnId,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateViewRequest {
    pub table_id: TableId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub column_visibility: HashMap<ColumnId, bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingRequest {
    pub sorting_state: Vec<SortKey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersRequest {
    pub column_filters: Vec<Filter>,
}

/// Query parameters of the paginated serving path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub view_id: ViewId,
    pub start: usize,
    pub size: usize,
}

/// `add_column` returns the column together with its backfilled cells.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddColumnResponse {
    pub column: Column,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
