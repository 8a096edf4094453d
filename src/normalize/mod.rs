//! Normalizers: raw source → [`crate::types::CleanedDataset`].
//!
//! Each candidate record is evaluated to an [`Outcome`]: either accepted as a typed record or
//! rejected with a [`SkipReason`]. Rejections never abort a batch; they are reported to the
//! injected [`crate::ingestion::PipelineObserver`] and counted in [`NormalizeStats`]. Only
//! structural problems with the source itself surface as [`crate::error::InputError`].

use std::fmt;

use crate::ingestion::observability::{Severity, StageStats};

pub mod customers;
pub mod orders;
pub mod rules;

pub use customers::{CustomerNormalizer, CustomerOptions};
pub use orders::OrderNormalizer;

/// Result of evaluating one candidate record.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<R> {
    Accepted(R),
    Rejected(SkipReason),
}

/// Why a record was left out of the output.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// A required field is absent.
    MissingField { field: &'static str },
    /// A required element is present but carries no text.
    EmptyField { field: &'static str },
    /// A field's text could not be parsed into its type.
    Unparseable {
        field: &'static str,
        raw: String,
        message: String,
    },
    InvalidOrderId { value: String },
    InvalidMobileNumber { value: String },
    NonPositiveSkuCount { value: i64 },
    NonPositiveAmount { value: f64 },
    /// An earlier record already used this (customer_id, mobile_number) pair.
    Duplicate {
        customer_id: String,
        mobile_number: String,
    },
}

impl SkipReason {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::MissingField { .. } => "missing_field",
            SkipReason::EmptyField { .. } => "empty_field",
            SkipReason::Unparseable { .. } => "unparseable",
            SkipReason::InvalidOrderId { .. } => "invalid_order_id",
            SkipReason::InvalidMobileNumber { .. } => "invalid_mobile_number",
            SkipReason::NonPositiveSkuCount { .. } => "non_positive_sku_count",
            SkipReason::NonPositiveAmount { .. } => "non_positive_amount",
            SkipReason::Duplicate { .. } => "duplicate",
        }
    }

    /// `true` when the record could not even be read (as opposed to failing a format or
    /// business rule).
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            SkipReason::MissingField { .. } | SkipReason::EmptyField { .. } | SkipReason::Unparseable { .. }
        )
    }

    pub fn severity(&self) -> Severity {
        if self.is_parse_failure() {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField { field } => write!(f, "missing field '{field}'"),
            SkipReason::EmptyField { field } => write!(f, "field '{field}' has no text"),
            SkipReason::Unparseable { field, raw, message } => {
                write!(f, "cannot parse field '{field}': {message} (raw='{raw}')")
            }
            SkipReason::InvalidOrderId { value } => write!(f, "order id '{value}' does not match ORD-dddd-d+"),
            SkipReason::InvalidMobileNumber { value } => {
                write!(f, "mobile number '{value}' is not 10 digits starting with 7, 8 or 9")
            }
            SkipReason::NonPositiveSkuCount { value } => write!(f, "sku count {value} is not positive"),
            SkipReason::NonPositiveAmount { value } => write!(f, "total amount {value} is not positive"),
            SkipReason::Duplicate {
                customer_id,
                mobile_number,
            } => write!(f, "duplicate of an earlier row for ({customer_id}, {mobile_number})"),
        }
    }
}

/// A rejected record, with enough context to find it in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSkip {
    /// CSV line number (header is line 1) or 1-based element position.
    pub position: usize,
    /// customer_id / order_id when it could be read.
    pub record_id: Option<String>,
    pub reason: SkipReason,
}

/// Tally of one normalization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeStats {
    pub input: usize,
    pub accepted: usize,
    /// Records that could not be read (missing/empty/unparseable fields).
    pub unparseable: usize,
    /// Records that were read but failed a format, business or uniqueness rule.
    pub rejected: usize,
}

impl NormalizeStats {
    pub(crate) fn record<R>(&mut self, outcome: &Outcome<R>) {
        self.input += 1;
        match outcome {
            Outcome::Accepted(_) => self.accepted += 1,
            Outcome::Rejected(reason) if reason.is_parse_failure() => self.unparseable += 1,
            Outcome::Rejected(_) => self.rejected += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.unparseable + self.rejected
    }
}

impl From<NormalizeStats> for StageStats {
    fn from(s: NormalizeStats) -> Self {
        StageStats {
            input: s.input,
            accepted: s.accepted,
            skipped: s.skipped(),
        }
    }
}

/// Label used for sources that are not files.
pub(crate) const MEMORY_SOURCE: &str = "<memory>";
