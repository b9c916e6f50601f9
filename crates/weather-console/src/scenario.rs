//! Access-control walkthrough

use crate::ConsoleConfig;
use access_control::Role;
use storage::SharedGateway;
use tracing::{info, warn};
use weather_store::{NewDevice, ReplayPolicy, Session, StoreError};

/// How a walkthrough step ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation succeeded
    Done(String),
    /// The operation succeeded with nothing to show
    Empty(String),
    /// Access denied or key already taken
    Refused(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: &'static str,
    pub outcome: Outcome,
}

/// Separate refusals, which the walkthrough reports, from storage
/// failures, which abort it
fn refused<T>(result: Result<T, StoreError>) -> Result<Result<T, StoreError>, StoreError> {
    match result {
        Err(e) if e.is_unauthorized() || e.is_duplicate() => Ok(Err(e)),
        other => other.map(Ok),
    }
}

struct Walkthrough {
    steps: Vec<Step>,
}

impl Walkthrough {
    fn record(&mut self, name: &'static str, outcome: Outcome) {
        match &outcome {
            Outcome::Done(detail) | Outcome::Empty(detail) => info!("[{}] {}", name, detail),
            Outcome::Refused(detail) => warn!("[{}] {}", name, detail),
        }
        self.steps.push(Step { name, outcome });
    }
}

/// Run every walkthrough step as the configured user
pub fn run(gateway: SharedGateway, config: &ConsoleConfig) -> Result<Vec<Step>, StoreError> {
    let mut session = Session::open(gateway, &config.username)?;
    let mut walk = Walkthrough { steps: Vec::new() };
    let user = config.username.as_str();
    let device_id = config.device_to_search.as_str();

    let outcome = match refused(
        session
            .directory()
            .find_role_assignment(user, Role::Admin)
            .map_err(StoreError::from),
    )? {
        Ok(Some(_)) => Outcome::Done(format!("{user} has admin access")),
        Ok(None) => Outcome::Empty(format!("{user} does not have admin access")),
        Err(_) => Outcome::Refused(format!("{user} cannot query role assignments")),
    };
    walk.record("admin check", outcome);

    let search = config.username_to_search.as_str();
    let outcome = match refused(session.directory().find_by_username(search).map_err(StoreError::from))? {
        Ok(Some(found)) => Outcome::Done(format!("{} <{}> role {}", found.username, found.email, found.role)),
        Ok(None) => Outcome::Empty(format!("user {search} not present")),
        Err(e) => Outcome::Refused(format!("query failed: {e}")),
    };
    walk.record("user lookup", outcome);

    let outcome = match refused(
        session
            .directory_mut()
            .insert("user_3", "user_3@example.com", Role::Standard)
            .map_err(StoreError::from),
    )? {
        Ok(created) => Outcome::Done(format!("created user {} ({})", created.username, created.id)),
        Err(e) => Outcome::Refused(e.to_string()),
    };
    walk.record("user insert", outcome);

    let outcome = match refused(session.device(device_id))? {
        Ok(Some(device)) => Outcome::Done(format!(
            "{}: {} ({}, {})",
            device.device_id, device.description, device.sensor_type, device.manufacturer
        )),
        Ok(None) => Outcome::Empty(format!("device information for {device_id} not present")),
        Err(e) => Outcome::Refused(e.to_string()),
    };
    walk.record("device read", outcome);

    let create = NewDevice::new(&config.device_to_create, "Temperature Sensor", "Temperature", "Acme");
    let outcome = match refused(session.register_device(create))? {
        Ok(device) => Outcome::Done(format!("registered device {} ({})", device.device_id, device.id)),
        Err(e) => Outcome::Refused(e.to_string()),
    };
    walk.record("device create", outcome);

    let outcome = match refused(session.reading_at(device_id, config.reading_probe))? {
        Ok(Some(reading)) => Outcome::Done(format!(
            "{} read {} at {}",
            reading.device_id, reading.value, reading.timestamp
        )),
        Ok(None) => Outcome::Empty(format!("no reading for {device_id} at {}", config.reading_probe)),
        Err(e) => Outcome::Refused(e.to_string()),
    };
    walk.record("reading probe", outcome);

    let outcome = if session.context().can_write(device_id) {
        Outcome::Done(format!("write access is allowed for {device_id}"))
    } else {
        Outcome::Refused(format!("write access not allowed for {device_id}"))
    };
    walk.record("write check", outcome);

    let policy = if config.halt_on_failure {
        ReplayPolicy::HaltOnFirstFailure
    } else {
        ReplayPolicy::CollectAll
    };
    let outcome = match refused(session.publish_daily_reports(policy))? {
        Ok(outcomes) if outcomes.is_empty() => Outcome::Empty("no weather data to aggregate".to_string()),
        Ok(outcomes) => {
            for outcome in &outcomes {
                if let Err(e) = &outcome.result {
                    warn!("{}", e);
                }
            }
            let committed = outcomes.iter().filter(|o| o.is_committed()).count();
            Outcome::Done(format!("{committed} of {} daily reports committed", outcomes.len()))
        }
        Err(e) => Outcome::Refused(e.to_string()),
    };
    walk.record("report publish", outcome);

    let (start, end) = (config.report_start, config.report_end);
    let outcome = match refused(session.reports_between(device_id, start, end))? {
        Ok(reports) if reports.is_empty() => Outcome::Empty(format!("no reports for {device_id} between {start} and {end}")),
        Ok(reports) => {
            for report in &reports {
                info!(
                    "{} {}: min {} max {} avg {:.2}",
                    report.device_id, report.date, report.min, report.max, report.avg
                );
            }
            Outcome::Done(format!("{} reports for {device_id} between {start} and {end}", reports.len()))
        }
        Err(e) => Outcome::Refused(e.to_string()),
    };
    walk.record("report range", outcome);

    Ok(walk.steps)
}
