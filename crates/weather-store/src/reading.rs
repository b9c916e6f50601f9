//! Weather Reading Store

use crate::collection::{finite, KeyedCollection};
use crate::StoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::{from_document, Accumulator, Filter, GroupSpec, KeyPart, ObjectId, SharedGateway, Stage, StorageError};
use tracing::debug;

/// Raw sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub device_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct NewReading<'a> {
    device_id: &'a str,
    value: f64,
    timestamp: DateTime<Utc>,
}

/// Min/max/avg of one device's readings over one UTC day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub device_id: String,
    pub day: NaiveDate,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Deserialize)]
struct GroupRow {
    #[serde(rename = "_id")]
    key: GroupKey,
    min: f64,
    max: f64,
    avg: f64,
}

#[derive(Debug, Deserialize)]
struct GroupKey {
    device_id: String,
    day: NaiveDate,
}

/// Weather readings collection, unique per (device, timestamp)
pub struct WeatherStore {
    collection: KeyedCollection,
}

impl WeatherStore {
    pub const COLLECTION: &'static str = "weather_data";

    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            collection: KeyedCollection::new(gateway, Self::COLLECTION),
        }
    }

    pub fn latest_error(&self) -> Option<&str> {
        self.collection.latest_error()
    }

    pub fn find_by_device_and_timestamp(
        &self,
        device_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<WeatherReading>, StoreError> {
        self.collection.find_one(&Self::key(device_id, timestamp)?)
    }

    pub fn find_all_by_device_id(&self, device_id: &str) -> Result<Vec<WeatherReading>, StoreError> {
        self.collection.find_all(&Filter::new().eq("device_id", device_id))
    }

    pub fn find_by_object_id(&self, id: ObjectId) -> Result<Option<WeatherReading>, StoreError> {
        self.collection.find_one(&Filter::by_id(id))
    }

    /// Insert one reading. NaN and infinite values are rejected.
    pub fn insert(&mut self, device_id: &str, value: f64, timestamp: DateTime<Utc>) -> Result<WeatherReading, StoreError> {
        let value = finite("value", value)?;
        let message = format!("Data for timestamp {timestamp} for device id {device_id} already exists");
        let record = NewReading {
            device_id,
            value,
            timestamp,
        };
        self.collection
            .insert_unique(&Self::key(device_id, timestamp)?, &record, message)
    }

    /// Min, max and average of every device's readings per UTC day.
    ///
    /// Treat the result as a set; no ordering is promised.
    pub fn aggregate_daily(&self) -> Result<Vec<DailyAggregate>, StoreError> {
        let spec = GroupSpec::new()
            .key("device_id", KeyPart::Field("device_id".to_string()))
            .key("day", KeyPart::DayOf("timestamp".to_string()))
            .accumulate("min", Accumulator::Min("value".to_string()))
            .accumulate("max", Accumulator::Max("value".to_string()))
            .accumulate("avg", Accumulator::Avg("value".to_string()));

        let aggregates = self
            .collection
            .aggregate(&[Stage::Group(spec)])?
            .into_iter()
            .map(|document| -> Result<DailyAggregate, StoreError> {
                let row: GroupRow = from_document(document)?;
                Ok(DailyAggregate {
                    device_id: row.key.device_id,
                    day: row.key.day,
                    min: row.min,
                    max: row.max,
                    avg: row.avg,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Aggregated readings into {} daily groups", aggregates.len());
        Ok(aggregates)
    }

    fn key(device_id: &str, timestamp: DateTime<Utc>) -> Result<Filter, StoreError> {
        Ok(Filter::new()
            .eq("device_id", device_id)
            .eq("timestamp", timestamp_value(timestamp)?))
    }
}

/// Timestamp in its stored representation
fn timestamp_value(timestamp: DateTime<Utc>) -> Result<Value, StoreError> {
    serde_json::to_value(timestamp).map_err(|e| StorageError::from(e).into())
}
