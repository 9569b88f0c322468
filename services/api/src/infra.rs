use metrics_exporter_prometheus::PrometheusHandle;
use orgportal::workflows::registration::{
    ApplicationType, Notice, Notifier, NotifyError, OrganizationSeedImporter,
    RegistrationRepository, RegistrationService,
};
use orgportal::error::AppError;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in for the mail sender: every notice becomes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NoticeLog;

impl Notifier for NoticeLog {
    fn send(&self, notice: Notice) -> Result<(), NotifyError> {
        info!(
            kind = ?notice.kind,
            organization_id = %notice.organization_id,
            application_id = ?notice.application_id,
            details = ?notice.details,
            "notice queued"
        );
        Ok(())
    }
}

/// Load seed organizations from CSV into the service; returns how many were added.
pub(crate) fn load_seed<R, N>(
    service: &RegistrationService<R, N>,
    path: &Path,
) -> Result<usize, AppError>
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let seeds = OrganizationSeedImporter::from_path(path)?;
    let count = seeds.len();
    for seed in seeds {
        service.seed_organization(seed)?;
    }
    info!(path = %path.display(), organizations = count, "seed organizations loaded");
    Ok(count)
}

pub(crate) fn parse_kind(raw: &str) -> Result<ApplicationType, String> {
    ApplicationType::parse(raw).ok_or_else(|| format!("expected 'new' or 'renewal', found '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgportal::workflows::registration::{
        InMemoryRegistrationRepository, NoticeKind, OrganizationId,
    };
    use std::io::Write;

    #[test]
    fn notice_log_accepts_every_notice() {
        let log = NoticeLog;
        for _ in 0..3 {
            log.send(Notice::new(NoticeKind::OrganizationExpired, OrganizationId(3)))
                .expect("log accepts notices");
        }
    }

    #[test]
    fn parse_kind_accepts_known_types() {
        assert_eq!(parse_kind("Renewal"), Ok(ApplicationType::Renewal));
        assert!(parse_kind("transfer").is_err());
    }

    #[test]
    fn load_seed_reads_csv_from_disk() {
        let path = std::env::temp_dir().join(format!("orgportal-seed-{}.csv", std::process::id()));
        let mut file = std::fs::File::create(&path).expect("create seed file");
        writeln!(
            file,
            "owner,name,status,activation_date,last_renewal_date,current_academic_year"
        )
        .expect("write header");
        writeln!(file, "41,Chess Guild,Active,2024-08-01,,2024-2025").expect("write row");
        writeln!(file, "42,Film Circle,Incomplete,,,2025-2026").expect("write row");
        drop(file);

        let service = RegistrationService::new(
            Arc::new(InMemoryRegistrationRepository::default()),
            Arc::new(NoticeLog),
        );
        let loaded = load_seed(&service, &path).expect("seed loads");
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, 2);
    }
}
