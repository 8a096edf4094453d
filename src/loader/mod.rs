//! Appending cleaned datasets to storage.
//!
//! The [`Loader`] is storage-agnostic: it talks to a [`TableStore`], which owns the driver
//! connection. [`sqlite::SqliteStore`] is the bundled implementation.

use std::sync::Arc;

use crate::error::LoadResult;
use crate::ingestion::observability::{PipelineObserver, Severity, StageContext, StageStats};
use crate::types::{CleanedDataset, CustomerRecord, DataSet, OrderRecord};

pub mod sqlite;

pub use sqlite::{SqliteConnector, SqliteStore};

/// A relational store that can append rows to an existing table.
pub trait TableStore {
    /// Append every row of `dataset` to `table` as one batch; returns the number of rows written.
    ///
    /// Column names come from `dataset.schema`. Implementations must not create or alter tables.
    fn append(&mut self, table: &str, dataset: &DataSet) -> LoadResult<usize>;
}

impl<S: TableStore + ?Sized> TableStore for Box<S> {
    fn append(&mut self, table: &str, dataset: &DataSet) -> LoadResult<usize> {
        (**self).append(table, dataset)
    }
}

/// Opens a [`TableStore`]. Dropping the store releases the connection.
pub trait StoreConnector {
    type Store: TableStore;

    fn connect(&self) -> LoadResult<Self::Store>;

    /// Human-readable target (path, DSN) for logs.
    fn describe(&self) -> String;
}

/// Target table names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub customers: String,
    pub orders: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            customers: "customers".to_string(),
            orders: "orders".to_string(),
        }
    }
}

/// Best-effort, per-table appender.
///
/// No retries, no upserts; a failed append is reported to the observer and returned.
pub struct Loader<'s, S: TableStore + ?Sized> {
    store: &'s mut S,
    observer: Arc<dyn PipelineObserver>,
    tables: TableNames,
}

impl<'s, S: TableStore + ?Sized> Loader<'s, S> {
    pub fn new(store: &'s mut S, observer: Arc<dyn PipelineObserver>) -> Self {
        Self {
            store,
            observer,
            tables: TableNames::default(),
        }
    }

    pub fn with_tables(mut self, tables: TableNames) -> Self {
        self.tables = tables;
        self
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Append `dataset` to `table`.
    ///
    /// An empty dataset is a no-op that reports zero rows without touching the store.
    pub fn append(&mut self, dataset: &DataSet, table: &str) -> LoadResult<usize> {
        let ctx = StageContext::load(table);
        if dataset.is_empty() {
            self.observer.on_stage_completed(&ctx, StageStats::default());
            return Ok(0);
        }

        match self.store.append(table, dataset) {
            Ok(written) => {
                self.observer.on_stage_completed(
                    &ctx,
                    StageStats {
                        input: dataset.row_count(),
                        accepted: written,
                        skipped: 0,
                    },
                );
                Ok(written)
            }
            Err(e) => {
                self.observer.on_failure(&ctx, Severity::for_error(&e), &e);
                Err(e)
            }
        }
    }

    /// Append customers to the configured customers table.
    pub fn load_customers(&mut self, customers: &CleanedDataset<CustomerRecord>) -> LoadResult<usize> {
        let table = self.tables.customers.clone();
        self.append(&customers.to_data_set(), &table)
    }

    /// Append orders to the configured orders table.
    pub fn load_orders(&mut self, orders: &CleanedDataset<OrderRecord>) -> LoadResult<usize> {
        let table = self.tables.orders.clone();
        self.append(&orders.to_data_set(), &table)
    }
}
