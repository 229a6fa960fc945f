//! Derived views over a fetched collection.
//!
//! Everything here is a pure function of its inputs: the list controller
//! calls these on every render instead of caching filtered or paged copies.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use csv::WriterBuilder;
use unicode_normalization::UnicodeNormalization;

use crate::{
    entity::{Column, Entity, FieldValue, FilterKind},
    error::ExportError,
};

/// Widest cell rendered by [`print_snapshot`].
const SNAPSHOT_MAX_WIDTH: usize = 40;

/// Current predicate for one filter field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Range { min: Option<f64>, max: Option<f64> },
    Dates { from: Option<NaiveDate>, to: Option<NaiveDate> },
}

impl FilterValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Range { min, max } => min.is_none() && max.is_none(),
            Self::Dates { from, to } => from.is_none() && to.is_none(),
        }
    }

    /// Parses user input for a field of the given kind.
    ///
    /// Ranges are written `min..max`; either side may be omitted, and a
    /// single value means an exact bound (`15` is `15..15`).
    pub fn parse(kind: FilterKind, input: &str) -> Result<Self, String> {
        let input = input.trim();
        match kind {
            FilterKind::Substring | FilterKind::Exact => Ok(Self::Text(input.to_string())),
            FilterKind::NumericRange => {
                let (min, max) = parse_bounds(input, |s| s.parse::<f64>().ok())
                    .ok_or_else(|| format!("\"{input}\" is not a number or range like 10..20"))?;
                Ok(Self::Range { min, max })
            }
            FilterKind::DateRange => {
                let (from, to) = parse_bounds(input, |s| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
                })
                .ok_or_else(|| {
                    format!("\"{input}\" is not a date or range like 2024-01-01..2024-01-31")
                })?;
                Ok(Self::Dates { from, to })
            }
        }
    }
}

fn parse_bounds<V: Copy>(
    input: &str,
    parse: impl Fn(&str) -> Option<V>,
) -> Option<(Option<V>, Option<V>)> {
    if input.is_empty() {
        return Some((None, None));
    }
    let side = |s: &str| -> Option<Option<V>> {
        let s = s.trim();
        if s.is_empty() { Some(None) } else { parse(s).map(Some) }
    };
    match input.split_once("..") {
        Some((lo, hi)) => Some((side(lo)?, side(hi)?)),
        None => {
            let value = parse(input)?;
            Some((Some(value), Some(value)))
        }
    }
}

/// Filter field name to predicate. Empty predicates are never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    fields: BTreeMap<String, FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: FilterValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: FilterValue) {
        if value.is_empty() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), value);
        }
    }

    pub fn remove(&mut self, field: &str) {
        self.fields.remove(field);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn fold(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

fn field_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(text) => Some(text.clone()),
        FieldValue::Number(n) => Some(n.to_string()),
        FieldValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        FieldValue::Missing => None,
    }
}

fn matches(kind: FilterKind, value: &FieldValue, filter: &FilterValue) -> bool {
    match filter {
        FilterValue::Text(query) => {
            let Some(text) = field_text(value) else {
                return false;
            };
            let (text, query) = (fold(text.trim()), fold(query.trim()));
            match kind {
                FilterKind::Exact => text == query,
                _ => text.contains(&query),
            }
        }
        FilterValue::Range { min, max } => match value {
            FieldValue::Number(n) => {
                min.is_none_or(|min| *n >= min) && max.is_none_or(|max| *n <= max)
            }
            _ => false,
        },
        FilterValue::Dates { from, to } => match value {
            FieldValue::Date(d) => from.is_none_or(|from| *d >= from) && to.is_none_or(|to| *d <= to),
            _ => false,
        },
    }
}

/// Items matching every non-empty predicate in `filters`.
///
/// Predicates naming a field the entity does not declare are ignored.
pub fn filtered<'a, T: Entity>(items: &'a [T], filters: &FilterState) -> Vec<&'a T> {
    if filters.is_empty() {
        return items.iter().collect();
    }

    let fields = T::filters();
    let active = filters
        .iter()
        .filter_map(|(name, value)| {
            fields
                .iter()
                .find(|field| field.name == name)
                .map(|field| (field, value))
        })
        .collect::<Vec<_>>();

    items
        .iter()
        .filter(|item| {
            active
                .iter()
                .all(|(field, filter)| matches(field.kind, &(field.value)(item), filter))
        })
        .collect()
}

/// Number of pages needed for `count` items, never less than one.
pub fn page_count(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    count.div_ceil(page_size).max(1)
}

/// The 1-based page `page_index` of `items`, clipped to the slice bounds.
pub fn paginated<U>(items: &[U], page_index: usize, page_size: usize) -> &[U] {
    let start = page_index
        .saturating_sub(1)
        .saturating_mul(page_size)
        .min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// One row of column values per item, in column order.
pub fn export_rows<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    columns: &[Column<T>],
) -> Vec<Vec<String>> {
    items
        .into_iter()
        .map(|item| columns.iter().map(|column| (column.value)(item)).collect())
        .collect()
}

/// Writes a header line plus `rows` as delimited text.
///
/// Cells containing the delimiter, quotes or line breaks are quoted, so a
/// reader sees exactly one record per row.
pub fn to_csv<T>(
    columns: &[Column<T>],
    rows: &[Vec<String>],
    delimiter: u8,
) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(vec![]);

    writer.write_record(columns.iter().map(|column| column.header))?;
    for row in rows {
        writer.write_record(row)?;
    }

    let data = writer
        .into_inner()
        .map_err(|err| ExportError::Finish(err.to_string()))?;
    String::from_utf8(data).map_err(|err| ExportError::Finish(err.to_string()))
}

fn snapshot_cell(value: &str) -> String {
    let flat = value.replace(['\r', '\n', '\t'], " ");
    if flat.chars().count() <= SNAPSHOT_MAX_WIDTH {
        return flat;
    }
    let mut cut = flat
        .chars()
        .take(SNAPSHOT_MAX_WIDTH - 1)
        .collect::<String>();
    cut.push('…');
    cut
}

fn padded_line<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(value, width)| {
            let pad = width.saturating_sub(value.chars().count());
            format!("{value}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Fixed-width text rendering of `rows`, for printing or PDF capture.
pub fn print_snapshot<T>(title: &str, columns: &[Column<T>], rows: &[Vec<String>]) -> String {
    let cells = rows
        .iter()
        .map(|row| row.iter().map(|cell| snapshot_cell(cell)).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let widths = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(column.header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&padded_line(columns.iter().map(|c| c.header), &widths));
    out.push('\n');
    let rule = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&"-".repeat(rule));
    out.push('\n');
    for row in &cells {
        out.push_str(&padded_line(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out.push_str(&format!("{} row(s)\n", cells.len()));
    out
}
