//! Order normalization (XML source).

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::error::InputResult;
use crate::ingestion::observability::{NullObserver, PipelineObserver, StageContext};
use crate::ingestion::xml::{RawNode, read_nodes_from_path, read_nodes_from_str};
use crate::types::{CleanedDataset, OrderRecord};

use super::rules::{has_source_datetime_layout, is_valid_mobile_number, is_valid_order_id};
use super::{MEMORY_SOURCE, NormalizeStats, Outcome, RecordSkip, SkipReason};

/// Element name of one order under the document root.
pub const ORDER_NODE: &str = "order";

/// Accepted `order_date_time` layout; values are taken to be UTC.
pub const SOURCE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Validates order nodes one by one; a bad node is skipped, never fatal.
#[derive(Clone)]
pub struct OrderNormalizer {
    observer: Arc<dyn PipelineObserver>,
}

impl Default for OrderNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(NullObserver))
    }
}

impl std::fmt::Debug for OrderNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderNormalizer").finish_non_exhaustive()
    }
}

impl OrderNormalizer {
    pub fn new(observer: Arc<dyn PipelineObserver>) -> Self {
        Self { observer }
    }

    /// Normalize an XML file.
    pub fn normalize_path(&self, path: impl AsRef<Path>) -> InputResult<CleanedDataset<OrderRecord>> {
        let path = path.as_ref();
        let nodes = read_nodes_from_path(path, ORDER_NODE)?;
        Ok(self.clean(&path.display().to_string(), &nodes).0)
    }

    pub fn normalize_reader<R: Read>(&self, mut reader: R) -> InputResult<CleanedDataset<OrderRecord>> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.normalize_str(&text)
    }

    pub fn normalize_str(&self, input: &str) -> InputResult<CleanedDataset<OrderRecord>> {
        let nodes = read_nodes_from_str(input, ORDER_NODE)?;
        Ok(self.clean(MEMORY_SOURCE, &nodes).0)
    }

    /// Evaluate every node in input order, reporting each rejection to the observer.
    pub fn clean(&self, resource: &str, nodes: &[RawNode]) -> (CleanedDataset<OrderRecord>, NormalizeStats) {
        let ctx = StageContext::normalize(resource);
        let mut stats = NormalizeStats::default();
        let mut records = Vec::with_capacity(nodes.len());

        for node in nodes {
            let outcome = evaluate(node);
            stats.record(&outcome);
            match outcome {
                Outcome::Accepted(record) => records.push(record),
                Outcome::Rejected(reason) => self.observer.on_record_skipped(
                    &ctx,
                    &RecordSkip {
                        position: node.position,
                        record_id: node.child("order_id").flatten().map(|s| s.trim().to_owned()),
                        reason,
                    },
                ),
            }
        }

        self.observer.on_stage_completed(&ctx, stats.into());
        (CleanedDataset::new(records), stats)
    }
}

/// Decide whether one node becomes an [`OrderRecord`].
pub fn evaluate(node: &RawNode) -> Outcome<OrderRecord> {
    match read_order(node) {
        Ok(record) => Outcome::Accepted(record),
        Err(reason) => Outcome::Rejected(reason),
    }
}

fn read_order(node: &RawNode) -> Result<OrderRecord, SkipReason> {
    // Extraction: every field must be present and parse.
    let order_id = child_text(node, "order_id")?;
    let mobile_number = child_text(node, "mobile_number")?;
    let raw_datetime = child_text(node, "order_date_time")?;
    let sku_id = child_text(node, "sku_id")?;
    let sku_count = parse_sku_count(child_text(node, "sku_count")?)?;
    let total_amount = parse_total_amount(child_text(node, "total_amount")?)?;

    let order_datetime = parse_order_datetime(raw_datetime)?;

    // Format rules.
    if !is_valid_order_id(order_id) {
        return Err(SkipReason::InvalidOrderId {
            value: order_id.to_owned(),
        });
    }
    if !is_valid_mobile_number(mobile_number) {
        return Err(SkipReason::InvalidMobileNumber {
            value: mobile_number.to_owned(),
        });
    }

    // Business rules.
    if sku_count <= 0 {
        return Err(SkipReason::NonPositiveSkuCount { value: sku_count });
    }
    if total_amount <= 0.0 {
        return Err(SkipReason::NonPositiveAmount { value: total_amount });
    }

    Ok(OrderRecord {
        order_id: order_id.to_owned(),
        mobile_number: mobile_number.to_owned(),
        order_datetime,
        sku_id: sku_id.to_owned(),
        sku_count,
        total_amount,
    })
}

fn child_text<'a>(node: &'a RawNode, field: &'static str) -> Result<&'a str, SkipReason> {
    match node.child(field) {
        None => Err(SkipReason::MissingField { field }),
        Some(None) => Err(SkipReason::EmptyField { field }),
        Some(Some(text)) => Ok(text.trim()),
    }
}

/// Strict `YYYY-MM-DDTHH:MM:SS` in UTC; leap seconds are rejected.
fn parse_order_datetime(raw: &str) -> Result<DateTime<Utc>, SkipReason> {
    let unparseable = |message: String| SkipReason::Unparseable {
        field: "order_date_time",
        raw: raw.to_owned(),
        message,
    };
    if !has_source_datetime_layout(raw) {
        return Err(unparseable("expected YYYY-MM-DDTHH:MM:SS".to_string()));
    }
    let parsed = NaiveDateTime::parse_from_str(raw, SOURCE_DATETIME_FORMAT)
        .map_err(|e| unparseable(e.to_string()))?;
    if parsed.nanosecond() >= 1_000_000_000 {
        return Err(unparseable("leap second".to_string()));
    }
    Ok(parsed.and_utc())
}

fn parse_sku_count(raw: &str) -> Result<i64, SkipReason> {
    raw.parse::<i64>().map_err(|e| SkipReason::Unparseable {
        field: "sku_count",
        raw: raw.to_owned(),
        message: e.to_string(),
    })
}

fn parse_total_amount(raw: &str) -> Result<f64, SkipReason> {
    let unparseable = |message: String| SkipReason::Unparseable {
        field: "total_amount",
        raw: raw.to_owned(),
        message,
    };
    let value = raw.parse::<f64>().map_err(|e| unparseable(e.to_string()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(unparseable("not a finite number".to_string()))
    }
}
