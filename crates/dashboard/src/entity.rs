//! Per-entity declarations consumed by the generic list machinery.
//!
//! An [`Entity`] names its REST resource and describes, as plain function
//! tables, which fields can be filtered, which columns are exported and which
//! fields the edit modal offers. Nothing here performs I/O.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, de::DeserializeOwned};

/// Location of a collection on the API and the keys it wraps bodies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub path: &'static str,
    pub list_key: &'static str,
    pub item_key: &'static str,
}

/// A field value as seen by the filter predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(Self::Missing, |v| Self::Text(v.to_string()))
    }

    pub fn date(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Missing, |v| Self::Date(v.date_naive()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Case-insensitive substring.
    Substring,
    /// Case-insensitive equality, for enum-like fields.
    Exact,
    NumericRange,
    DateRange,
}

pub struct FilterField<T> {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FilterKind,
    pub value: fn(&T) -> FieldValue,
}

pub struct Column<T> {
    pub header: &'static str,
    pub value: fn(&T) -> String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Bool,
}

/// A field offered by the edit modal. `name` is the wire name sent in the
/// patch body.
pub struct EditableField<T> {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub current: fn(&T) -> String,
}

pub trait Entity: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    const RESOURCE: Resource;
    /// Human name used in titles and export file names.
    const LABEL: &'static str;
    /// Statuses the vendor may pick from. Empty when the entity has no
    /// status workflow.
    const STATUSES: &'static [&'static str] = &[];

    fn id(&self) -> &str;

    fn status(&self) -> Option<&str> {
        None
    }

    fn filters() -> Vec<FilterField<Self>>;

    fn columns() -> Vec<Column<Self>>;

    fn editable() -> Vec<EditableField<Self>> {
        Vec::new()
    }

    fn supports_invoice() -> bool {
        false
    }

    /// Whether the vendor may add new records through the create modal.
    fn supports_create() -> bool {
        false
    }

    fn filter_field(name: &str) -> Option<FilterField<Self>> {
        Self::filters().into_iter().find(|field| field.name == name)
    }
}

pub(crate) fn fmt_money(value: f64) -> String {
    format!("{value:.2}")
}

pub(crate) fn fmt_date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub(crate) fn fmt_bool(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}
