//! Aggregation Pipeline Stages

use crate::filter::compare_values;
use crate::{Document, Filter, StorageError, ID_FIELD};
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One component of a group key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPart {
    /// Raw value of a field
    Field(String),
    /// Calendar day (`%Y-%m-%d`, UTC) of an RFC 3339 timestamp field
    DayOf(String),
}

/// Reduction applied to each group
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Min(String),
    Max(String),
    Avg(String),
    Count,
}

/// Group-by specification. Output documents carry the key under `_id`
/// as an object of the named key parts, followed by one field per
/// accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSpec {
    pub keys: Vec<(String, KeyPart)>,
    pub accumulators: Vec<(String, Accumulator)>,
}

impl GroupSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, name: &str, part: KeyPart) -> Self {
        self.keys.push((name.to_string(), part));
        self
    }

    pub fn accumulate(mut self, name: &str, accumulator: Accumulator) -> Self {
        self.accumulators.push((name.to_string(), accumulator));
        self
    }
}

/// A pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Group(GroupSpec),
    Sort(String, SortOrder),
}

/// Evaluate `stages` over `documents`
pub(crate) fn run(mut documents: Vec<Document>, stages: &[Stage]) -> Result<Vec<Document>, StorageError> {
    for stage in stages {
        documents = match stage {
            Stage::Match(filter) => documents.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Group(spec) => group(&documents, spec)?,
            Stage::Sort(field, order) => {
                documents.sort_by(|a, b| {
                    let ordering = match (a.get(field), b.get(field)) {
                        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                        (Some(_), None) => Ordering::Greater,
                        (None, Some(_)) => Ordering::Less,
                        (None, None) => Ordering::Equal,
                    };
                    match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                });
                documents
            }
        };
    }
    Ok(documents)
}

/// Running reduction state for one group
#[derive(Debug, Default)]
struct GroupState {
    key: Map<String, Value>,
    values: BTreeMap<String, Vec<f64>>,
    count: u64,
}

fn group(documents: &[Document], spec: &GroupSpec) -> Result<Vec<Document>, StorageError> {
    if spec.keys.is_empty() {
        return Err(StorageError::InvalidPipeline("group stage without key".to_string()));
    }

    let fields: BTreeSet<&String> = spec
        .accumulators
        .iter()
        .filter_map(|(_, acc)| match acc {
            Accumulator::Min(field) | Accumulator::Max(field) | Accumulator::Avg(field) => Some(field),
            Accumulator::Count => None,
        })
        .collect();

    // Keyed by the serialized group key so output order is deterministic
    let mut groups: BTreeMap<String, GroupState> = BTreeMap::new();

    for document in documents {
        let mut key = Map::new();
        for (name, part) in &spec.keys {
            key.insert(name.clone(), key_value(document, part)?);
        }
        let sort_key = serde_json::to_string(&key)?;

        let state = groups.entry(sort_key).or_insert_with(|| GroupState {
            key,
            ..Default::default()
        });
        state.count += 1;

        for field in &fields {
            if let Some(value) = document.get(*field).and_then(Value::as_f64) {
                state.values.entry((*field).clone()).or_default().push(value);
            }
        }
    }

    debug!("Grouped {} documents into {} groups", documents.len(), groups.len());

    Ok(groups
        .into_values()
        .map(|state| {
            let mut out = Document::new();
            out.insert(ID_FIELD.to_string(), Value::Object(state.key.clone()));
            for (name, accumulator) in &spec.accumulators {
                out.insert(name.clone(), reduce(&state, accumulator));
            }
            out
        })
        .collect())
}

fn key_value(document: &Document, part: &KeyPart) -> Result<Value, StorageError> {
    match part {
        KeyPart::Field(field) => Ok(document.get(field).cloned().unwrap_or(Value::Null)),
        KeyPart::DayOf(field) => {
            let raw = document.get(field).and_then(Value::as_str).ok_or_else(|| {
                StorageError::InvalidPipeline(format!("field {field} is not a timestamp string"))
            })?;
            Ok(Value::String(day_of(raw)?.format("%Y-%m-%d").to_string()))
        }
    }
}

fn day_of(raw: &str) -> Result<NaiveDate, StorageError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc().date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StorageError::InvalidPipeline(format!("cannot derive day from {raw}: {e}")))
}

fn reduce(state: &GroupState, accumulator: &Accumulator) -> Value {
    let values = |field: &String| state.values.get(field).map(Vec::as_slice).unwrap_or(&[]);
    let number = |v: Option<f64>| v.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null);

    match accumulator {
        Accumulator::Min(field) => number(values(field).iter().copied().reduce(f64::min)),
        Accumulator::Max(field) => number(values(field).iter().copied().reduce(f64::max)),
        Accumulator::Avg(field) => {
            let vals = values(field);
            if vals.is_empty() {
                Value::Null
            } else {
                number(Some(vals.iter().sum::<f64>() / vals.len() as f64))
            }
        }
        Accumulator::Count => Value::from(state.count),
    }
}
