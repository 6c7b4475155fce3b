use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};

use crate::models::Plant;
use crate::notifier::{reminder_body, Notifier, REMINDER_SUBJECT};
use crate::schedule::is_overdue;
use crate::storage::RecordStore;
use crate::user_models::User;

/// Overdue plants of one user, in that user's plant order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueNotice {
    pub user_id: String,
    pub plant_names: Vec<String>,
}

/// Outcome of one scan. Failures are counted here and logged, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub reference: NaiveDate,
    pub users_scanned: usize,
    pub notices: Vec<OverdueNotice>,
    pub notifications_sent: usize,
    pub store_failures: usize,
    pub notification_failures: usize,
}

impl ScanReport {
    fn new(reference: NaiveDate) -> Self {
        Self {
            reference,
            users_scanned: 0,
            notices: Vec::new(),
            notifications_sent: 0,
            store_failures: 0,
            notification_failures: 0,
        }
    }
}

/// Names of the plants due on or before `reference`, in input order.
pub fn overdue_plant_names(plants: &[Plant], reference: NaiveDate) -> Vec<String> {
    plants
        .iter()
        .filter(|plant| {
            match is_overdue(plant.last_watered, plant.days_between_watering, reference) {
                Ok(overdue) => overdue,
                Err(e) => {
                    tracing::warn!(plant_id = %plant.id, error = %e, "Skipping plant with invalid schedule");
                    false
                }
            }
        })
        .map(|plant| plant.name.clone())
        .collect()
}

#[derive(Clone)]
pub struct OverdueScanner {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

impl OverdueScanner {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>, notify_timeout: Duration) -> Self {
        Self {
            store,
            notifier,
            notify_timeout,
        }
    }

    /// Scans every user against today's date.
    pub async fn run_overdue_scan(&self) -> ScanReport {
        self.run_at(Local::now().date_naive()).await
    }

    /// Scans every user against `reference`. All plants in the run are
    /// judged against the same date.
    pub async fn run_at(&self, reference: NaiveDate) -> ScanReport {
        let started = Instant::now();
        let mut report = ScanReport::new(reference);

        let users = match self.store.list_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "Overdue scan could not list users");
                report.store_failures += 1;
                return report;
            }
        };

        for user in &users {
            report.users_scanned += 1;
            self.scan_user(user, reference, &mut report).await;
        }

        tracing::info!(
            reference = %reference,
            users = report.users_scanned,
            notices = report.notices.len(),
            sent = report.notifications_sent,
            store_failures = report.store_failures,
            notification_failures = report.notification_failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Overdue scan finished"
        );
        report
    }

    async fn scan_user(&self, user: &User, reference: NaiveDate, report: &mut ScanReport) {
        let plants = match self.store.list_plants(&user.id).await {
            Ok(plants) => plants,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Skipping user, failed to read plants");
                report.store_failures += 1;
                return;
            }
        };

        let plant_names = overdue_plant_names(&plants, reference);
        if plant_names.is_empty() {
            return;
        }

        let body = reminder_body(&user.username, &plant_names);
        report.notices.push(OverdueNotice {
            user_id: user.id.clone(),
            plant_names,
        });

        match timeout(self.notify_timeout, self.notifier.send(&user.email, REMINDER_SUBJECT, &body)).await {
            Ok(Ok(())) => report.notifications_sent += 1,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %user.id, error = %e, "Reminder not delivered");
                report.notification_failures += 1;
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user.id,
                    timeout_secs = self.notify_timeout.as_secs(),
                    "Reminder timed out"
                );
                report.notification_failures += 1;
            }
        }
    }
}

/// Runs the scan once per `period`, first after one full period.
///
/// Each run is awaited before the next tick is taken and late ticks are
/// skipped, so runs never overlap.
pub fn spawn_scan_loop(scanner: OverdueScanner, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // interval fires immediately on the first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            scanner.run_overdue_scan().await;
        }
    })
}
