//! Device Registry

use crate::collection::KeyedCollection;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use storage::{Filter, ObjectId, SharedGateway};

/// Registered sensor device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub device_id: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub manufacturer: String,
}

/// Device fields supplied on insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    pub device_id: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub manufacturer: String,
}

impl NewDevice {
    pub fn new(device_id: &str, description: &str, sensor_type: &str, manufacturer: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            description: description.to_string(),
            sensor_type: sensor_type.to_string(),
            manufacturer: manufacturer.to_string(),
        }
    }
}

/// Devices collection. Lookups are not access-checked here.
pub struct DeviceRegistry {
    collection: KeyedCollection,
}

impl DeviceRegistry {
    pub const COLLECTION: &'static str = "devices";

    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            collection: KeyedCollection::new(gateway, Self::COLLECTION),
        }
    }

    pub fn latest_error(&self) -> Option<&str> {
        self.collection.latest_error()
    }

    pub fn find_by_device_id(&self, device_id: &str) -> Result<Option<Device>, StoreError> {
        self.collection.find_one(&Self::key(device_id))
    }

    pub fn find_by_object_id(&self, id: ObjectId) -> Result<Option<Device>, StoreError> {
        self.collection.find_one(&Filter::by_id(id))
    }

    pub fn insert(&mut self, device: NewDevice) -> Result<Device, StoreError> {
        let message = format!("Device id {} already exists", device.device_id);
        self.collection
            .insert_unique(&Self::key(&device.device_id), &device, message)
    }

    fn key(device_id: &str) -> Filter {
        Filter::new().eq("device_id", device_id)
    }
}
