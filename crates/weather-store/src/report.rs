//! Daily Report Store

use crate::collection::{finite, KeyedCollection};
use crate::{DailyAggregate, StoreError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::{from_document, Filter, ObjectId, SharedGateway, SortOrder, Stage, StorageError};
use tracing::{info, warn};

/// Aggregated readings of one device for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub device_id: String,
    pub date: NaiveDate,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Serialize)]
struct NewReport<'a> {
    device_id: &'a str,
    date: NaiveDate,
    min: f64,
    max: f64,
    avg: f64,
}

/// What a replay does after an insert fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Stop at the first failed group
    HaltOnFirstFailure,
    /// Attempt every group and report each outcome
    #[default]
    CollectAll,
}

/// Result of replaying one aggregate group
#[derive(Debug)]
pub struct ReplayOutcome {
    pub aggregate: DailyAggregate,
    pub result: Result<DailyReport, StoreError>,
}

impl ReplayOutcome {
    pub fn is_committed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Daily reports collection, unique per (device, date)
pub struct DailyReportStore {
    collection: KeyedCollection,
}

impl DailyReportStore {
    pub const COLLECTION: &'static str = "daily_reports";

    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            collection: KeyedCollection::new(gateway, Self::COLLECTION),
        }
    }

    pub fn latest_error(&self) -> Option<&str> {
        self.collection.latest_error()
    }

    pub fn insert(
        &mut self,
        device_id: &str,
        date: NaiveDate,
        min: f64,
        max: f64,
        avg: f64,
    ) -> Result<DailyReport, StoreError> {
        let (min, max, avg) = (finite("min", min)?, finite("max", max)?, finite("avg", avg)?);
        let message = format!("Report for date {date} for device id {device_id} already exists");
        let record = NewReport {
            device_id,
            date,
            min,
            max,
            avg,
        };
        self.collection
            .insert_unique(&Self::key(device_id, date)?, &record, message)
    }

    pub fn insert_aggregate(&mut self, aggregate: &DailyAggregate) -> Result<DailyReport, StoreError> {
        self.insert(
            &aggregate.device_id,
            aggregate.day,
            aggregate.min,
            aggregate.max,
            aggregate.avg,
        )
    }

    pub fn find_by_device_and_date(&self, device_id: &str, date: NaiveDate) -> Result<Option<DailyReport>, StoreError> {
        self.collection.find_one(&Self::key(device_id, date)?)
    }

    /// Reports of one device dated within `[start, end]`, oldest first
    pub fn find_range(&self, device_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyReport>, StoreError> {
        let filter = Filter::new()
            .eq("device_id", device_id)
            .between("date", date_value(start)?, date_value(end)?);

        self.collection
            .aggregate(&[Stage::Match(filter), Stage::Sort("date".to_string(), SortOrder::Ascending)])?
            .into_iter()
            .map(|d| from_document(d).map_err(StoreError::from))
            .collect()
    }

    pub fn find_all_by_device_id(&self, device_id: &str) -> Result<Vec<DailyReport>, StoreError> {
        self.collection.find_all(&Filter::new().eq("device_id", device_id))
    }

    /// Every device's report for one day
    pub fn find_all_by_date(&self, date: NaiveDate) -> Result<Vec<DailyReport>, StoreError> {
        self.collection.find_all(&Filter::new().eq("date", date_value(date)?))
    }

    pub fn find_by_object_id(&self, id: ObjectId) -> Result<Option<DailyReport>, StoreError> {
        self.collection.find_one(&Filter::by_id(id))
    }

    /// Insert each aggregate in turn.
    ///
    /// Reports committed before a failure stay committed. With
    /// `HaltOnFirstFailure` the failed group is the last outcome returned.
    pub fn replay<I>(&mut self, aggregates: I, policy: ReplayPolicy) -> Vec<ReplayOutcome>
    where
        I: IntoIterator<Item = DailyAggregate>,
    {
        let mut outcomes = Vec::new();

        for aggregate in aggregates {
            let result = self.insert_aggregate(&aggregate);
            let failed = result.is_err();
            outcomes.push(ReplayOutcome { aggregate, result });

            if failed && policy == ReplayPolicy::HaltOnFirstFailure {
                warn!("Replay halted after {} groups", outcomes.len());
                break;
            }
        }

        let committed = outcomes.iter().filter(|o| o.is_committed()).count();
        info!("Replayed {} groups, {} committed", outcomes.len(), committed);
        outcomes
    }

    fn key(device_id: &str, date: NaiveDate) -> Result<Filter, StoreError> {
        Ok(Filter::new().eq("device_id", device_id).eq("date", date_value(date)?))
    }
}

/// Date in its stored representation
fn date_value(date: NaiveDate) -> Result<Value, StoreError> {
    serde_json::to_value(date).map_err(|e| StorageError::from(e).into())
}
