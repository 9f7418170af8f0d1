//! Bulk Ingestion Pipeline: generate rows at scale without one oversized
//! transaction and without serializing every insert.
//!
//! The requested count is split into fixed-size chunks. Every row identity
//! is generated up front so each chunk's cell records can reference their
//! rows without a round trip. Chunks commit as independent transactions,
//! submitted in waves of at most `max_in_flight` worker threads, which caps
//! the number of simultaneously open transactions against the shared store.
//!
//! Chunk independence is the failure model: a failed chunk leaves its rows
//! wholly absent while committed chunks stay committed. The run always
//! drains every wave before reporting, and a shortfall surfaces as
//! [`GridError::PartialIngestion`] with no automatic retry; re-invoking adds
//! further rows rather than resuming.

use crate::error::{GridError, Result};
use crate::model::{Cell, Column, Row, TableId};
use crate::storage::{Storage, Write};
use log::{info, warn};
use serde::Serialize;
use std::thread;

/// Tuning knobs for one ingestion run. These are configuration, not derived
/// from load.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Total rows one run adds.
    pub row_count: usize,
    /// Rows per chunk transaction.
    pub chunk_size: usize,
    /// Maximum chunk transactions in flight at once.
    pub max_in_flight: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            row_count: 1000,
            chunk_size: 500,
            max_in_flight: 10,
        }
    }
}

/// Completion summary of a fully successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub message: String,
    pub rows_added: usize,
}

#[derive(Clone)]
pub struct BulkIngestor {
    storage: Storage,
    config: IngestConfig,
}

impl BulkIngestor {
    pub fn new(storage: Storage) -> Self {
        Self::with_config(storage, IngestConfig::default())
    }

    pub fn with_config(storage: Storage, config: IngestConfig) -> Self {
        BulkIngestor { storage, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Add `config.row_count` rows to the table, each with one empty cell
    /// per existing column.
    pub fn add_bulk_rows(&self, table_id: TableId) -> Result<IngestSummary> {
        let columns: Vec<Column> = self.storage.with_inner(|inner| {
            inner.table(table_id)?;
            Ok(inner.columns_of(table_id).into_iter().cloned().collect())
        })?;

        // Every row identity exists before the first chunk is submitted.
        let rows: Vec<Row> = (0..self.config.row_count)
            .map(|_| Row::new(table_id))
            .collect();
        let chunks: Vec<&[Row]> = rows.chunks(self.config.chunk_size.max(1)).collect();

        let mut committed = 0usize;
        let mut failed_chunks = 0usize;
        for wave in chunks.chunks(self.config.max_in_flight.max(1)) {
            let results: Vec<Result<usize>> = thread::scope(|scope| {
                let columns = &columns;
                let handles: Vec<_> = wave
                    .iter()
                    .map(|&chunk| scope.spawn(move || self.insert_chunk(columns, chunk)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            Err(GridError::Transaction("chunk worker panicked".to_string()))
                        })
                    })
                    .collect()
            });

            for result in results {
                match result {
                    Ok(count) => committed += count,
                    Err(err) => {
                        warn!("ingestion chunk failed for table {}: {}", table_id, err);
                        failed_chunks += 1;
                    }
                }
            }
        }

        if failed_chunks > 0 {
            return Err(GridError::PartialIngestion {
                requested: self.config.row_count,
            });
        }

        info!("added {} rows to table {}", committed, table_id);
        Ok(IngestSummary {
            message: format!("Added {} rows", committed),
            rows_added: committed,
        })
    }

    /// One chunk: all of its rows and cells in a single transaction.
    fn insert_chunk(&self, columns: &[Column], chunk: &[Row]) -> Result<usize> {
        self.storage.transaction("ingest_chunk", |txn| {
            for row in chunk {
                txn.stage(Write::Row(row.clone()));
                for column in columns {
                    txn.stage(Write::Cell(Cell::empty(row.id, column.id)));
                }
            }
            Ok(chunk.len())
        })
    }
}
