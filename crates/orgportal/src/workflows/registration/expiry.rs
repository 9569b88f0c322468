use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Organization, OrganizationId, OrganizationStatus};
use super::notify::Notifier;
use super::repository::RegistrationRepository;
use super::service::RegistrationService;
use crate::config::ExpiryConfig;

const MAX_AGE_DAYS: i64 = i64::MAX / 86_400_000;

/// How long an activation or renewal keeps an organization active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    max_age: Duration,
}

impl ExpiryPolicy {
    pub fn new(max_age_days: u64) -> Self {
        let days = i64::try_from(max_age_days).unwrap_or(i64::MAX);
        Self {
            max_age: Duration::days(days.min(MAX_AGE_DAYS)),
        }
    }

    /// Active with every recorded date older than the max age.
    ///
    /// An organization with neither date recorded has nothing to age from and
    /// is left alone.
    pub fn is_expired(&self, organization: &Organization, now: DateTime<Utc>) -> bool {
        if organization.status != OrganizationStatus::Active {
            return false;
        }
        let dates: Vec<DateTime<Utc>> = [organization.activation_date, organization.last_renewal_date]
            .into_iter()
            .flatten()
            .collect();
        !dates.is_empty() && dates.iter().all(|date| now - *date > self.max_age)
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(365)
    }
}

impl From<&ExpiryConfig> for ExpiryPolicy {
    fn from(config: &ExpiryConfig) -> Self {
        Self::new(config.max_age_days)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub deactivated: Vec<OrganizationId>,
}

/// Next instant at `at` (UTC) strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Runs the expiry sweep once a day at a fixed UTC time.
pub struct ExpiryScheduler<R, N> {
    service: Arc<RegistrationService<R, N>>,
    at: NaiveTime,
}

impl<R, N> ExpiryScheduler<R, N>
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(service: Arc<RegistrationService<R, N>>, at: NaiveTime) -> Self {
        Self { service, at }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        info!(at = %self.at, "expiry sweep scheduled");
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.at);
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            match self.service.sweep_expired(Utc::now()) {
                Ok(report) => info!(
                    checked = report.checked,
                    deactivated = report.deactivated.len(),
                    "expiry sweep finished"
                ),
                Err(error) => warn!(%error, "expiry sweep failed"),
            }
        }
    }
}
