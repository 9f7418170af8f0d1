//! HTTP server exposing the GridBase operations as a JSON API.
use actix_web::{middleware, web, App, HttpResponse, HttpServer, ResponseError};
use log::info;

use crate::cells::CellStore;
use crate::error::GridError;
use crate::ingest::BulkIngestor;
use crate::messages::{
    AddColumnRequest, AddColumnResponse, AddRowRequest, CreateBaseRequest, CreateTableRequest,
    CreateViewRequest, ErrorBody, FiltersRequest, PageQuery, SortingRequest, UpdateCellRequest,
    VisibilityRequest,
};
use crate::model::{BaseId, TableId, ViewId};
use crate::query::QueryEngine;
use crate::schema::SchemaStore;
use crate::storage::Storage;
use crate::views::ViewStore;

/// Shared state for all request handlers: the stores over one storage
/// engine.
#[derive(Clone)]
pub struct AppState {
    pub schema: SchemaStore,
    pub cells: CellStore,
    pub views: ViewStore,
    pub query: QueryEngine,
    pub ingest: BulkIngestor,
}

impl AppState {
    pub fn new() -> Self {
        let storage = Storage::new();
        AppState {
            schema: SchemaStore::new(storage.clone()),
            cells: CellStore::new(storage.clone()),
            views: ViewStore::new(storage.clone()),
            query: QueryEngine::new(storage.clone()),
            ingest: BulkIngestor::new(storage),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}

impl ResponseError for GridError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            GridError::NotFound(_) => StatusCode::NOT_FOUND,
            GridError::Validation(_) => StatusCode::BAD_REQUEST,
            GridError::Transaction(_) | GridError::PartialIngestion { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

async fn create_base(
    state: web::Data<AppState>,
    req: web::Json<CreateBaseRequest>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.schema.create_base(&req.name)?))
}

async fn get_bases(state: web::Data<AppState>) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.schema.get_bases()?))
}

async fn create_table(
    state: web::Data<AppState>,
    req: web::Json<CreateTableRequest>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.schema.create_table(req.base_id, &req.name)?))
}

async fn get_tables(
    state: web::Data<AppState>,
    path: web::Path<BaseId>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.schema.get_tables_by_base(*path)?))
}

async fn add_column(
    state: web::Data<AppState>,
    req: web::Json<AddColumnRequest>,
) -> Result<HttpResponse, GridError> {
    let (column, cells) = state
        .schema
        .add_column(req.table_id, &req.name, req.column_type)?;
    Ok(HttpResponse::Ok().json(AddColumnResponse { column, cells }))
}

async fn get_columns(
    state: web::Data<AppState>,
    path: web::Path<TableId>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.schema.get_columns(*path)?))
}

async fn add_row(
    state: web::Data<AppState>,
    req: web::Json<AddRowRequest>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.cells.add_row(req.table_id)?))
}

async fn add_bulk_rows(
    state: web::Data<AppState>,
    req: web::Json<AddRowRequest>,
) -> Result<HttpResponse, GridError> {
    // The ingestion run blocks on its worker waves; keep it off the
    // request executor.
    let table_id = req.table_id;
    let summary = web::block(move || state.ingest.add_bulk_rows(table_id))
        .await
        .map_err(|e| GridError::Transaction(e.to_string()))??;
    Ok(HttpResponse::Ok().json(summary))
}

async fn get_rows(
    state: web::Data<AppState>,
    path: web::Path<TableId>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.cells.get_rows(*path)?))
}

async fn get_rows_page(
    state: web::Data<AppState>,
    path: web::Path<TableId>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, GridError> {
    let page =
        state
            .query
            .get_rows_filtered_sorted(*path, query.view_id, query.start, query.size)?;
    Ok(HttpResponse::Ok().json(page))
}

async fn update_cell(
    state: web::Data<AppState>,
    req: web::Json<UpdateCellRequest>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.cells.update_cell(req.row_id, req.column_id, &req.value)?))
}

async fn create_view(
    state: web::Data<AppState>,
    req: web::Json<CreateViewRequest>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.views.create_view(req.table_id, &req.name)?))
}

async fn get_views(
    state: web::Data<AppState>,
    path: web::Path<TableId>,
) -> Result<HttpResponse, GridError> {
    Ok(HttpResponse::Ok().json(state.views.get_views_by_table(*path)?))
}

async fn update_visibility(
    state: web::Data<AppState>,
    path: web::Path<ViewId>,
    req: web::Json<VisibilityRequest>,
) -> Result<HttpResponse, GridError> {
    let req = req.into_inner();
    Ok(HttpResponse::Ok()
        .json(state.views.update_column_visibility(*path, req.column_visibility)?))
}

async fn update_sorting(
    state: web::Data<AppState>,
    path: web::Path<ViewId>,
    req: web::Json<SortingRequest>,
) -> Result<HttpResponse, GridError> {
    let req = req.into_inner();
    Ok(HttpResponse::Ok().json(state.views.update_sorting_state(*path, req.sorting_state)?))
}

async fn update_filters(
    state: web::Data<AppState>,
    path: web::Path<ViewId>,
    req: web::Json<FiltersRequest>,
) -> Result<HttpResponse, GridError> {
    let req = req.into_inner();
    Ok(HttpResponse::Ok().json(state.views.update_column_filters(*path, req.column_filters)?))
}

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "GridBase server is running"
    }))
}

/// Start the HTTP server.
pub async fn run_server(host: &str, port: u16) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new());
    info!("GridBase server listening on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            // Enable logger
            .wrap(middleware::Logger::default())
            // CORS for development
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/bases", web::post().to(create_base))
            .route("/bases", web::get().to(get_bases))
            .route("/tables", web::post().to(create_table))
            .route("/bases/{base_id}/tables", web::get().to(get_tables))
            .route("/columns", web::post().to(add_column))
            .route("/tables/{table_id}/columns", web::get().to(get_columns))
            .route("/rows", web::post().to(add_row))
            .route("/rows/bulk", web::post().to(add_bulk_rows))
            .route("/tables/{table_id}/rows", web::get().to(get_rows))
            .route("/tables/{table_id}/rows/page", web::get().to(get_rows_page))
            .route("/cells", web::patch().to(update_cell))
            .route("/views", web::post().to(create_view))
            .route("/tables/{table_id}/views", web::get().to(get_views))
            .route("/views/{view_id}/visibility", web::put().to(update_visibility))
            .route("/views/{view_id}/sorting", web::put().to(update_sorting))
            .route("/views/{view_id}/filters", web::put().to(update_filters))
            .route("/health", web::get().to(health_check))
    })
    .bind((host, port))?
    .run()
    .await
}
