//! Fixture seeding

use access_control::{NewUser, UserDirectory};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use storage::{to_document, MemoryGateway, SharedGateway};
use tracing::info;
use weather_store::{DailyReportStore, DeviceRegistry, NewDevice, WeatherStore};

const BUNDLED_FIXTURE: &str = include_str!("../fixtures/seed.json");

/// Seed data for an empty store
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub users: Vec<NewUser>,
    pub devices: Vec<NewDevice>,
    pub readings: Vec<SeedReading>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedReading {
    pub device_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fixture {
    pub fn bundled() -> Result<Self> {
        serde_json::from_str(BUNDLED_FIXTURE).context("parsing bundled fixture")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing fixture {}", path.display()))
    }
}

/// Gateway with the storage-enforced unique keys of every collection
pub fn indexed_gateway() -> Result<MemoryGateway> {
    let gateway = MemoryGateway::new();
    gateway.create_unique_index(UserDirectory::COLLECTION, &["username"])?;
    gateway.create_unique_index(DeviceRegistry::COLLECTION, &["device_id"])?;
    gateway.create_unique_index(WeatherStore::COLLECTION, &["device_id", "timestamp"])?;
    gateway.create_unique_index(DailyReportStore::COLLECTION, &["device_id", "date"])?;
    Ok(gateway)
}

/// Write the fixture straight through the stores, without a session.
///
/// Users are inserted at the gateway because no admin exists yet to
/// open a directory with.
pub fn apply(gateway: &SharedGateway, fixture: Fixture) -> Result<()> {
    for user in &fixture.users {
        gateway
            .insert_one(UserDirectory::COLLECTION, to_document(user)?)
            .with_context(|| format!("seeding user {}", user.username))?;
    }

    let mut devices = DeviceRegistry::new(gateway.clone());
    for device in fixture.devices.iter().cloned() {
        devices.insert(device)?;
    }

    let mut readings = WeatherStore::new(gateway.clone());
    for reading in &fixture.readings {
        readings.insert(&reading.device_id, reading.value, reading.timestamp)?;
    }

    info!(
        "Seeded {} users, {} devices, {} readings",
        fixture.users.len(),
        fixture.devices.len(),
        fixture.readings.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_bundled_fixture_applies() {
        let gateway = Arc::new(indexed_gateway().unwrap());
        let shared: SharedGateway = gateway.clone();
        let fixture = Fixture::bundled().unwrap();
        let readings = fixture.readings.len();

        apply(&shared, fixture).unwrap();
        assert_eq!(gateway.count(UserDirectory::COLLECTION), 3);
        assert_eq!(gateway.count(DeviceRegistry::COLLECTION), 3);
        assert_eq!(gateway.count(WeatherStore::COLLECTION), readings);
    }

    #[test]
    fn test_duplicate_user_in_fixture_fails() {
        let gateway: SharedGateway = Arc::new(indexed_gateway().unwrap());
        let fixture: Fixture = serde_json::from_str(
            r#"{"users": [
                {"username": "a", "email": "a@example.com", "role": "admin"},
                {"username": "a", "email": "b@example.com", "role": "admin"}
            ]}"#,
        )
        .unwrap();
        assert!(apply(&gateway, fixture).is_err());
    }

    #[test]
    fn test_missing_fixture_file() {
        assert!(Fixture::from_path(Path::new("/nonexistent/seed.json")).is_err());
    }
}
