//! `customer-order-etl` cleans customer records (CSV) and order records (XML) into uniformly
//! shaped [`types::CleanedDataset`]s and appends them to relational tables.
//!
//! ## Stages
//!
//! 1. [`normalize::CustomerNormalizer`]: trims, deduplicates on (customer_id, mobile_number),
//!    drops rows with an invalid mobile number or a missing field, title-cases the region.
//! 2. [`normalize::OrderNormalizer`]: validates each `<order>` independently; a bad order is
//!    skipped and reported, never fatal to the batch.
//! 3. [`loader::Loader`]: appends a dataset to an existing table through a [`loader::TableStore`].
//! 4. [`pipeline::Pipeline`]: runs the three above in order against one store connection.
//!
//! Nothing here configures global logging. Every component takes an
//! [`ingestion::PipelineObserver`]; [`ingestion::TracingObserver`] forwards events to `tracing`.
//!
//! ## Example: clean in memory
//!
//! ```rust
//! use customer_order_etl::normalize::{CustomerNormalizer, OrderNormalizer};
//!
//! let customers = CustomerNormalizer::default()
//!     .normalize_str("customer_id,customer_name,mobile_number,region\n C1 ,Ada,9876543210,north east\n")
//!     .unwrap();
//! assert_eq!(customers.records()[0].region, "North East");
//!
//! let orders = OrderNormalizer::default()
//!     .normalize_str(
//!         "<orders><order>\
//!            <order_id>ORD-2024-1</order_id><mobile_number>9876543210</mobile_number>\
//!            <order_date_time>2024-01-15T10:30:00</order_date_time><sku_id>SKU1</sku_id>\
//!            <sku_count>2</sku_count><total_amount>500.0</total_amount>\
//!          </order></orders>",
//!     )
//!     .unwrap();
//! assert_eq!(orders.records()[0].storage_datetime(), "2024-01-15 10:30:00");
//! ```
//!
//! ## Example: full run into SQLite
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use customer_order_etl::ingestion::TracingObserver;
//! use customer_order_etl::loader::SqliteConnector;
//! use customer_order_etl::pipeline::Pipeline;
//!
//! # fn main() -> Result<(), customer_order_etl::PipelineError> {
//! let mut pipeline = Pipeline::new(SqliteConnector::new("warehouse.db"), Arc::new(TracingObserver));
//! let summary = pipeline.run("customers.csv", "orders.xml")?;
//! println!("customers={} orders={}", summary.customers_loaded, summary.orders_loaded);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ingestion;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use error::{ConfigError, InputError, InputResult, LoadError, LoadResult, PipelineError};
