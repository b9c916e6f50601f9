//! Access-checked session over the weather collections

use crate::{
    DailyReport, DailyReportStore, Device, DeviceRegistry, NewDevice, ReplayOutcome, ReplayPolicy, StoreError,
    WeatherReading, WeatherStore,
};
use access_control::{AuthContext, UserDirectory};
use chrono::{DateTime, NaiveDate, Utc};
use storage::SharedGateway;

/// One caller's view of the data.
///
/// Each operation is checked against the privileges cached when the
/// session opened: device and report reads need an access-list entry,
/// reading writes need a read-write entry, and registering devices or
/// publishing reports needs the admin role.
pub struct Session {
    directory: UserDirectory,
    devices: DeviceRegistry,
    readings: WeatherStore,
    reports: DailyReportStore,
}

impl Session {
    pub fn open(gateway: SharedGateway, username: &str) -> Result<Self, StoreError> {
        let directory = UserDirectory::open(gateway.clone(), username)?;
        Ok(Self {
            directory,
            devices: DeviceRegistry::new(gateway.clone()),
            readings: WeatherStore::new(gateway.clone()),
            reports: DailyReportStore::new(gateway),
        })
    }

    pub fn context(&self) -> &AuthContext {
        self.directory.context()
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut UserDirectory {
        &mut self.directory
    }

    #[cfg(test)]
    pub(crate) fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    #[cfg(test)]
    pub(crate) fn reports(&self) -> &DailyReportStore {
        &self.reports
    }

    pub fn device(&self, device_id: &str) -> Result<Option<Device>, StoreError> {
        self.context()
            .require_read(device_id, &format!("read device {device_id}"))?;
        self.devices.find_by_device_id(device_id)
    }

    pub fn register_device(&mut self, device: NewDevice) -> Result<Device, StoreError> {
        self.directory
            .context()
            .require_admin(&format!("insert device {}", device.device_id))?;
        self.devices.insert(device)
    }

    pub fn reading_at(&self, device_id: &str, timestamp: DateTime<Utc>) -> Result<Option<WeatherReading>, StoreError> {
        self.context()
            .require_read(device_id, &format!("read data of device {device_id}"))?;
        self.readings.find_by_device_and_timestamp(device_id, timestamp)
    }

    pub fn device_readings(&self, device_id: &str) -> Result<Vec<WeatherReading>, StoreError> {
        self.context()
            .require_read(device_id, &format!("read data of device {device_id}"))?;
        self.readings.find_all_by_device_id(device_id)
    }

    pub fn record_reading(
        &mut self,
        device_id: &str,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<WeatherReading, StoreError> {
        self.directory
            .context()
            .require_write(device_id, &format!("write data of device {device_id}"))?;
        self.readings.insert(device_id, value, timestamp)
    }

    pub fn reports_between(
        &self,
        device_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyReport>, StoreError> {
        self.context()
            .require_read(device_id, &format!("read reports of device {device_id}"))?;
        self.reports.find_range(device_id, start, end)
    }

    /// Aggregate every reading per device and day, then replay the groups
    /// into the report store
    pub fn publish_daily_reports(&mut self, policy: ReplayPolicy) -> Result<Vec<ReplayOutcome>, StoreError> {
        self.directory.context().require_admin("publish daily reports")?;
        let aggregates = self.readings.aggregate_daily()?;
        Ok(self.reports.replay(aggregates, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use access_control::{AccessEntry, NewUser, Role};
    use chrono::TimeZone;
    use std::sync::Arc;
    use storage::{to_document, Gateway, MemoryGateway};

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 12, day, hour, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 12, day).unwrap()
    }

    fn seeded() -> Arc<MemoryGateway> {
        let gateway = Arc::new(MemoryGateway::new());
        let users = [
            NewUser::new("admin", "admin@example.com", Role::Admin)
                .with_access(AccessEntry::read_write("DT001"))
                .with_access(AccessEntry::read_write("DT002")),
            NewUser::new("user_1", "user_1@example.com", Role::Standard)
                .with_access(AccessEntry::read_only("DT001")),
            NewUser::new("user_2", "user_2@example.com", Role::Standard)
                .with_access(AccessEntry::read_write("DT002")),
        ];
        for user in &users {
            gateway
                .insert_one(UserDirectory::COLLECTION, to_document(user).unwrap())
                .unwrap();
        }

        let mut devices = DeviceRegistry::new(gateway.clone());
        devices
            .insert(NewDevice::new("DT001", "Temperature Sensor", "Temperature", "Acme"))
            .unwrap();
        devices
            .insert(NewDevice::new("DT002", "Temperature Sensor", "Temperature", "Acme"))
            .unwrap();

        let mut readings = WeatherStore::new(gateway.clone());
        for (hour, value) in [(1, 10.0), (2, 20.0), (3, 30.0)] {
            readings.insert("DT001", value, ts(1, hour)).unwrap();
        }
        readings.insert("DT001", 4.0, ts(6, 0)).unwrap();
        readings.insert("DT002", 12.0, ts(1, 0)).unwrap();
        gateway
    }

    #[test]
    fn test_unknown_user() {
        let err = Session::open(seeded(), "ghost").err().unwrap();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_admin_registers_device_once() {
        let gateway = seeded();
        let mut session = Session::open(gateway.clone(), "admin").unwrap();

        let device = session
            .register_device(NewDevice::new("DT201", "Temperature Sensor", "Temperature", "Acme"))
            .unwrap();
        assert_eq!(device.manufacturer, "Acme");

        let err = session
            .register_device(NewDevice::new("DT201", "Temperature Sensor", "Temperature", "Acme"))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert!(err.to_string().contains("DT201"));
        assert_eq!(session.devices().latest_error(), Some("Device id DT201 already exists"));
        assert_eq!(gateway.count(DeviceRegistry::COLLECTION), 3);
    }

    #[test]
    fn test_standard_user_cannot_register_device() {
        let gateway = seeded();
        let mut session = Session::open(gateway.clone(), "user_1").unwrap();

        for id in ["DT201", "DT001"] {
            let err = session
                .register_device(NewDevice::new(id, "Temperature Sensor", "Temperature", "Acme"))
                .unwrap_err();
            assert!(err.is_unauthorized());
        }
        assert_eq!(gateway.count(DeviceRegistry::COLLECTION), 2);
    }

    #[test]
    fn test_read_gating() {
        let session = Session::open(seeded(), "user_1").unwrap();

        assert_eq!(session.device("DT001").unwrap().unwrap().device_id, "DT001");
        assert_eq!(session.reading_at("DT001", ts(1, 2)).unwrap().unwrap().value, 20.0);
        assert!(session.reading_at("DT001", ts(1, 9)).unwrap().is_none());
        assert_eq!(session.device_readings("DT001").unwrap().len(), 4);

        assert!(session.device("DT002").unwrap_err().is_unauthorized());
        assert!(session.device_readings("DT002").unwrap_err().is_unauthorized());
        assert!(session
            .reports_between("DT002", date(1), date(5))
            .unwrap_err()
            .is_unauthorized());
    }

    #[test]
    fn test_write_gating() {
        let gateway = seeded();
        let mut reader = Session::open(gateway.clone(), "user_1").unwrap();
        assert!(reader.record_reading("DT001", 1.0, ts(2, 0)).unwrap_err().is_unauthorized());

        let mut writer = Session::open(gateway.clone(), "user_2").unwrap();
        writer.record_reading("DT002", 1.0, ts(2, 0)).unwrap();
        assert!(writer.record_reading("DT002", 2.0, ts(2, 0)).unwrap_err().is_duplicate());
        assert_eq!(gateway.count(WeatherStore::COLLECTION), 6);
    }

    #[test]
    fn test_publish_and_query_reports() {
        let gateway = seeded();
        let mut admin = Session::open(gateway.clone(), "admin").unwrap();

        let outcomes = admin.publish_daily_reports(ReplayPolicy::CollectAll).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(ReplayOutcome::is_committed));

        let reports = admin.reports_between("DT001", date(1), date(5)).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!((reports[0].min, reports[0].max, reports[0].avg), (10.0, 30.0, 20.0));

        // The 6th falls outside the range
        let all = admin.reports().find_all_by_device_id("DT001").unwrap();
        assert_eq!(all.len(), 2);

        // A second run changes nothing
        let again = admin.publish_daily_reports(ReplayPolicy::CollectAll).unwrap();
        assert!(again.iter().all(|o| o.result.as_ref().is_err_and(StoreError::is_duplicate)));
        assert_eq!(gateway.count(DailyReportStore::COLLECTION), 3);
        let kept = admin.reports().find_by_device_and_date("DT001", date(1)).unwrap().unwrap();
        assert_eq!(kept.avg, 20.0);

        let halted = admin.publish_daily_reports(ReplayPolicy::HaltOnFirstFailure).unwrap();
        assert_eq!(halted.len(), 1);
    }

    #[test]
    fn test_standard_user_cannot_publish() {
        let mut session = Session::open(seeded(), "user_2").unwrap();
        assert!(session
            .publish_daily_reports(ReplayPolicy::CollectAll)
            .unwrap_err()
            .is_unauthorized());
    }

    #[test]
    fn test_directory_through_session() {
        let mut admin = Session::open(seeded(), "admin").unwrap();
        admin
            .directory_mut()
            .insert("user_3", "user_3@example.com", Role::Standard)
            .unwrap();
        assert!(admin.directory().find_by_username("user_3").unwrap().is_some());
    }
}
