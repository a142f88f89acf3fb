// src/harvest/normalize.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::merge::LogicalTable;
use crate::error::HarvestError;
use crate::html::collapse_ws;

/// Digit-group separators as rendered by the dashboard ("1,23,456").
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]").expect("separator regex"));

/// Case-insensitive substrings that identify the semantic columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnKeywords {
    pub entity: Vec<String>,
    pub count: Vec<String>,
}

impl Default for ColumnKeywords {
    fn default() -> Self {
        Self {
            entity: vec!["maker".into(), "manufacturer".into()],
            count: vec!["total".into(), "registrations".into()],
        }
    }
}

/// How dashboard-rendered aggregate rows are recognised by their entity name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateRowPolicy {
    /// The whole (trimmed, case-folded) name must equal one of the labels.
    /// "Total Motors" is a maker; "  TOTAL " is not.
    ExactLabel(Vec<String>),
    /// Any name containing `token` is an aggregate unless it is allowlisted.
    Substring { token: String, allow: Vec<String> },
}

impl Default for AggregateRowPolicy {
    fn default() -> Self {
        AggregateRowPolicy::ExactLabel(vec![
            "total".into(),
            "grand total".into(),
            "sub total".into(),
            "subtotal".into(),
        ])
    }
}

impl AggregateRowPolicy {
    pub fn is_aggregate(&self, name: &str) -> bool {
        let name = collapse_ws(name).to_lowercase();
        match self {
            AggregateRowPolicy::ExactLabel(labels) => {
                labels.iter().any(|l| collapse_ws(l).to_lowercase() == name)
            }
            AggregateRowPolicy::Substring { token, allow } => {
                name.contains(&token.to_lowercase())
                    && !allow.iter().any(|a| collapse_ws(a).to_lowercase() == name)
            }
        }
    }
}

/// One entity and its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub entity: String,
    pub count: u64,
}

/// Records extracted from a [`LogicalTable`], plus what was dropped on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTable {
    pub entity_column: String,
    pub count_column: String,
    pub records: Vec<Record>,
    pub dropped_blank: usize,
    pub dropped_aggregate: usize,
}

/// Indices of the entity and count columns within a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub entity: usize,
    pub count: usize,
}

fn find_column(header: &[String], keywords: &[String], skip: Option<usize>) -> Option<usize> {
    header.iter().enumerate().position(|(i, label)| {
        let label = label.to_lowercase();
        Some(i) != skip && keywords.iter().any(|k| label.contains(&k.to_lowercase()))
    })
}

/// First header label (in order) matching each keyword set. The count column
/// never resolves to the entity column.
pub fn resolve_columns(
    header: &[String],
    keywords: &ColumnKeywords,
) -> Result<ResolvedColumns, HarvestError> {
    let entity = find_column(header, &keywords.entity, None).ok_or_else(|| {
        HarvestError::UnresolvedColumns {
            missing: "entity",
            header: header.to_vec(),
        }
    })?;
    let count = find_column(header, &keywords.count, Some(entity)).ok_or_else(|| {
        HarvestError::UnresolvedColumns {
            missing: "count",
            header: header.to_vec(),
        }
    })?;
    Ok(ResolvedColumns { entity, count })
}

pub fn parse_count(cell: &str) -> Option<u64> {
    let digits = SEPARATORS.replace_all(cell.trim(), "");
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Turn `table` into typed records: resolve columns, drop blank and aggregate
/// rows, coerce counts. Row order is preserved.
///
/// Blank and aggregate rows are the only ones dropped. A data row whose count
/// cell is not a number fails the whole table with
/// [`HarvestError::UnparsableCount`].
pub fn normalize(
    table: &LogicalTable,
    keywords: &ColumnKeywords,
    policy: &AggregateRowPolicy,
) -> Result<NormalizedTable, HarvestError> {
    let cols = resolve_columns(&table.header, keywords)?;

    let mut out = NormalizedTable {
        entity_column: table.header[cols.entity].clone(),
        count_column: table.header[cols.count].clone(),
        records: Vec::with_capacity(table.rows.len()),
        dropped_blank: 0,
        dropped_aggregate: 0,
    };

    for row in &table.rows {
        let entity = row.get(cols.entity).map(|s| collapse_ws(s)).unwrap_or_default();
        if entity.is_empty() {
            out.dropped_blank += 1;
            continue;
        }
        if policy.is_aggregate(&entity) {
            debug!(entity = %entity, "dropping aggregate row");
            out.dropped_aggregate += 1;
            continue;
        }
        let raw = row.get(cols.count).map(String::as_str).unwrap_or("");
        let count = parse_count(raw).ok_or_else(|| HarvestError::UnparsableCount {
            entity: entity.clone(),
            cell: raw.to_string(),
        })?;
        out.records.push(Record { entity, count });
    }

    if out.records.is_empty() {
        return Err(HarvestError::NoUsableRows {
            dropped: table.rows.len(),
        });
    }
    Ok(out)
}
