//! Run configuration: an optional TOML file, then `ETL_*` environment overrides.
//!
//! ```toml
//! database_path = "warehouse.db"
//! dedupe_before_filter = true
//! alert_at_or_above = "error"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ingestion::observability::Severity;
use crate::loader::TableNames;
use crate::normalize::CustomerOptions;
use crate::pipeline::PipelineOptions;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EtlConfig {
    pub database_path: PathBuf,
    pub customers_table: String,
    pub orders_table: String,
    pub dedupe_before_filter: bool,
    pub csv_delimiter: char,
    /// Also write JSON-lines events here.
    pub log_file: Option<PathBuf>,
    pub alert_at_or_above: Severity,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("etl.db"),
            customers_table: "customers".to_string(),
            orders_table: "orders".to_string(),
            dedupe_before_filter: true,
            csv_delimiter: ',',
            log_file: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

impl EtlConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (e.g. the environment), then validate.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("ETL_DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ETL_CUSTOMERS_TABLE") {
            self.customers_table = v;
        }
        if let Some(v) = lookup("ETL_ORDERS_TABLE") {
            self.orders_table = v;
        }
        if let Some(v) = lookup("ETL_DEDUPE_BEFORE_FILTER") {
            self.dedupe_before_filter = parse_bool("ETL_DEDUPE_BEFORE_FILTER", &v)?;
        }
        if let Some(v) = lookup("ETL_CSV_DELIMITER") {
            let mut chars = v.chars();
            self.csv_delimiter = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(invalid("ETL_CSV_DELIMITER", format!("expected one character, got '{v}'"))),
            };
        }
        if let Some(v) = lookup("ETL_LOG_FILE") {
            self.log_file = if v.trim().is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = lookup("ETL_ALERT_AT_OR_ABOVE") {
            self.alert_at_or_above = v.parse::<Severity>().map_err(|e| invalid("ETL_ALERT_AT_OR_ABOVE", e))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(invalid("database_path", "must not be empty"));
        }
        if self.customers_table.trim().is_empty() {
            return Err(invalid("customers_table", "must not be empty"));
        }
        if self.orders_table.trim().is_empty() {
            return Err(invalid("orders_table", "must not be empty"));
        }
        self.delimiter_byte()?;
        Ok(())
    }

    fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.csv_delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| invalid("csv_delimiter", format!("'{}' is not a single ASCII byte", self.csv_delimiter)))
    }

    /// Options for [`crate::pipeline::Pipeline`].
    pub fn pipeline_options(&self) -> Result<PipelineOptions, ConfigError> {
        Ok(PipelineOptions {
            customers: CustomerOptions {
                dedupe_before_filter: self.dedupe_before_filter,
                delimiter: self.delimiter_byte()?,
            },
            tables: TableNames {
                customers: self.customers_table.clone(),
                orders: self.orders_table.clone(),
            },
            alert_at_or_above: self.alert_at_or_above,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(invalid(key, format!("expected bool (true/false/1/0/yes/no), got '{raw}'"))),
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message: message.into(),
    }
}
