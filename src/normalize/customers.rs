//! Customer normalization (CSV source).

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::InputResult;
use crate::ingestion::csv::{read_csv_from_path, read_csv_from_reader, reader_builder};
use crate::ingestion::observability::{NullObserver, PipelineObserver, StageContext};
use crate::types::{CleanedDataset, CustomerRecord, DataSet, DataType, Field, Schema, Value};

use super::rules::{is_valid_mobile_number, title_case};
use super::{MEMORY_SOURCE, NormalizeStats, Outcome, RecordSkip, SkipReason};

/// Columns a customer source must provide, in source casing.
pub const CUSTOMER_SOURCE_COLUMNS: [&str; 4] = ["customer_id", "customer_name", "mobile_number", "region"];

/// Knobs for [`CustomerNormalizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerOptions {
    /// Drop duplicate (customer_id, mobile_number) pairs before format/completeness checks.
    ///
    /// With `true` (the default) an invalid row shadows a later valid row with the same key;
    /// with `false` only accepted rows take part in deduplication.
    pub dedupe_before_filter: bool,
    /// CSV field delimiter.
    pub delimiter: u8,
}

impl Default for CustomerOptions {
    fn default() -> Self {
        Self {
            dedupe_before_filter: true,
            delimiter: b',',
        }
    }
}

/// Validates, deduplicates and tidies customer rows.
#[derive(Clone)]
pub struct CustomerNormalizer {
    options: CustomerOptions,
    observer: Arc<dyn PipelineObserver>,
}

impl Default for CustomerNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(NullObserver))
    }
}

impl std::fmt::Debug for CustomerNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerNormalizer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

struct Candidate<'a> {
    customer_id: Option<&'a str>,
    customer_name: Option<&'a str>,
    mobile_number: Option<&'a str>,
    region: Option<&'a str>,
}

impl<'a> Candidate<'a> {
    fn from_row(row: &'a [Value]) -> Self {
        let cell = |i: usize| row.get(i).and_then(Value::as_str);
        Self {
            customer_id: cell(0),
            customer_name: cell(1),
            mobile_number: cell(2),
            region: cell(3),
        }
    }

    fn key(&self) -> (Option<String>, Option<String>) {
        (
            self.customer_id.map(str::to_owned),
            self.mobile_number.map(str::to_owned),
        )
    }

    fn duplicate(&self) -> SkipReason {
        SkipReason::Duplicate {
            customer_id: self.customer_id.unwrap_or_default().to_owned(),
            mobile_number: self.mobile_number.unwrap_or_default().to_owned(),
        }
    }

    fn validate(&self) -> Result<CustomerRecord, SkipReason> {
        let mobile_number = match self.mobile_number {
            None => return Err(SkipReason::MissingField { field: "mobile_number" }),
            Some(m) if !is_valid_mobile_number(m) => {
                return Err(SkipReason::InvalidMobileNumber { value: m.to_owned() });
            }
            Some(m) => m,
        };
        let customer_id = self.customer_id.ok_or(SkipReason::MissingField { field: "customer_id" })?;
        let customer_name = self
            .customer_name
            .ok_or(SkipReason::MissingField { field: "customer_name" })?;
        let region = self.region.ok_or(SkipReason::MissingField { field: "region" })?;

        Ok(CustomerRecord {
            customer_id: customer_id.to_owned(),
            customer_name: customer_name.to_owned(),
            mobile_number: mobile_number.to_owned(),
            region: title_case(region),
        })
    }
}

impl CustomerNormalizer {
    pub fn new(observer: Arc<dyn PipelineObserver>) -> Self {
        Self {
            options: CustomerOptions::default(),
            observer,
        }
    }

    pub fn with_options(mut self, options: CustomerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CustomerOptions {
        &self.options
    }

    /// Schema used to read the raw source.
    pub fn source_schema() -> Schema {
        Schema::new(
            CUSTOMER_SOURCE_COLUMNS
                .iter()
                .map(|name| Field::new(*name, DataType::Utf8))
                .collect(),
        )
    }

    /// Normalize a CSV file.
    pub fn normalize_path(&self, path: impl AsRef<Path>) -> InputResult<CleanedDataset<CustomerRecord>> {
        let path = path.as_ref();
        let raw = read_csv_from_path(path, &Self::source_schema(), self.options.delimiter)?;
        Ok(self.clean(&path.display().to_string(), &raw).0)
    }

    /// Normalize CSV data from any reader.
    pub fn normalize_reader<R: Read>(&self, reader: R) -> InputResult<CleanedDataset<CustomerRecord>> {
        let mut rdr = reader_builder(self.options.delimiter).from_reader(reader);
        let raw = read_csv_from_reader(&mut rdr, &Self::source_schema())?;
        Ok(self.clean(MEMORY_SOURCE, &raw).0)
    }

    pub fn normalize_str(&self, input: &str) -> InputResult<CleanedDataset<CustomerRecord>> {
        self.normalize_reader(input.as_bytes())
    }

    /// Clean rows already read with [`Self::source_schema`].
    ///
    /// Rows are trimmed by the reader; here each row is deduplicated on
    /// (customer_id, mobile_number), checked for a valid mobile number and for completeness, and
    /// its region title-cased. Input order is preserved.
    pub fn clean(&self, resource: &str, raw: &DataSet) -> (CleanedDataset<CustomerRecord>, NormalizeStats) {
        let ctx = StageContext::normalize(resource);
        let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();
        let mut stats = NormalizeStats::default();
        let mut records = Vec::new();

        for (row_idx0, row) in raw.rows.iter().enumerate() {
            let candidate = Candidate::from_row(row);
            let outcome = self.evaluate(&candidate, &mut seen);
            stats.record(&outcome);
            match outcome {
                Outcome::Accepted(record) => records.push(record),
                Outcome::Rejected(reason) => self.observer.on_record_skipped(
                    &ctx,
                    &RecordSkip {
                        // +1 for 1-based, +1 again because the header is line 1.
                        position: row_idx0 + 2,
                        record_id: candidate.customer_id.map(str::to_owned),
                        reason,
                    },
                ),
            }
        }

        self.observer.on_stage_completed(&ctx, stats.into());
        (CleanedDataset::new(records), stats)
    }

    fn evaluate(
        &self,
        candidate: &Candidate<'_>,
        seen: &mut HashSet<(Option<String>, Option<String>)>,
    ) -> Outcome<CustomerRecord> {
        if self.options.dedupe_before_filter && !seen.insert(candidate.key()) {
            return Outcome::Rejected(candidate.duplicate());
        }

        let record = match candidate.validate() {
            Ok(record) => record,
            Err(reason) => return Outcome::Rejected(reason),
        };

        if !self.options.dedupe_before_filter && !seen.insert(candidate.key()) {
            return Outcome::Rejected(candidate.duplicate());
        }

        Outcome::Accepted(record)
    }
}
