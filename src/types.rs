//! Core data model types.
//!
//! Raw sources are read into a [`DataSet`] shaped by a [`Schema`]; normalizers turn those rows into
//! typed records ([`CustomerRecord`], [`OrderRecord`]) collected in a [`CleanedDataset`], which in
//! turn renders back into a storage-shaped [`DataSet`] for the loader.

use chrono::{DateTime, Utc};

/// Storage format for order timestamps.
pub const STORAGE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// UTF-8 string.
    Utf8,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// An ordered list of fields describing the shape of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed cell in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Borrow the string payload, if this is a non-null [`Value::Utf8`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A record type that can be rendered as one row of a fixed storage schema.
pub trait TabularRecord {
    /// The storage schema (column names in storage casing, fixed order).
    fn schema() -> Schema;

    /// Render this record as a row matching [`TabularRecord::schema`].
    fn to_row(&self) -> Vec<Value>;
}

/// A validated customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub customer_name: String,
    /// Ten digits, leading digit 7, 8 or 9.
    pub mobile_number: String,
    /// Title-cased.
    pub region: String,
}

impl TabularRecord for CustomerRecord {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("customerid", DataType::Utf8),
            Field::new("customername", DataType::Utf8),
            Field::new("mobilenumber", DataType::Utf8),
            Field::new("region", DataType::Utf8),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Utf8(self.customer_id.clone()),
            Value::Utf8(self.customer_name.clone()),
            Value::Utf8(self.mobile_number.clone()),
            Value::Utf8(self.region.clone()),
        ]
    }
}

/// A validated order.
///
/// `sku_count` and `total_amount` are always strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub mobile_number: String,
    pub order_datetime: DateTime<Utc>,
    pub sku_id: String,
    pub sku_count: i64,
    pub total_amount: f64,
}

impl OrderRecord {
    /// `order_datetime` rendered in the storage format (`YYYY-MM-DD HH:MM:SS`).
    pub fn storage_datetime(&self) -> String {
        self.order_datetime.format(STORAGE_DATETIME_FORMAT).to_string()
    }
}

impl TabularRecord for OrderRecord {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("orderid", DataType::Utf8),
            Field::new("mobilenumber", DataType::Utf8),
            Field::new("orderdatetime", DataType::Utf8),
            Field::new("skuid", DataType::Utf8),
            Field::new("skucount", DataType::Int64),
            Field::new("totalamount", DataType::Float64),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Utf8(self.order_id.clone()),
            Value::Utf8(self.mobile_number.clone()),
            Value::Utf8(self.storage_datetime()),
            Value::Utf8(self.sku_id.clone()),
            Value::Int64(self.sku_count),
            Value::Float64(self.total_amount),
        ]
    }
}

/// Ordered, validated output of a normalizer.
///
/// Every record shares the same field set, so the dataset is rectangular by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDataset<R> {
    records: Vec<R>,
}

impl<R> CleanedDataset<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }
}

impl<R> Default for CleanedDataset<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: TabularRecord> CleanedDataset<R> {
    /// Render into the storage-shaped [`DataSet`] handed to the loader.
    pub fn to_data_set(&self) -> DataSet {
        DataSet::new(R::schema(), self.records.iter().map(TabularRecord::to_row).collect())
    }
}
