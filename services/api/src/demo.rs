use chrono::{DateTime, Duration, Months, Utc};
use clap::Args;
use orgportal::error::AppError;
use orgportal::workflows::registration::{
    Actor, AnnouncementDraft, Application, ApplicationType, Audience, DocumentUpload,
    FeedbackDraft, FileId, FileReview, FileStatus, InMemoryRegistrationRepository, Notice,
    Notifier, NotifyError, RegistrationService, RequirementTable, Role, StatusRefresh, UserId,
};
use std::sync::{Arc, Mutex};

type DemoService = RegistrationService<InMemoryRegistrationRepository, DemoOutbox>;

/// Collects the notices of one walkthrough so they can be listed at the end.
#[derive(Default)]
struct DemoOutbox {
    notices: Mutex<Vec<Notice>>,
}

impl Notifier for DemoOutbox {
    fn send(&self, notice: Notice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notice);
        Ok(())
    }
}

impl DemoOutbox {
    fn drain(&self) -> Vec<Notice> {
        std::mem::take(
            &mut *self
                .notices
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct RequirementsArgs {
    /// Only list one application type (new or renewal)
    #[arg(long, value_parser = crate::infra::parse_kind)]
    pub(crate) kind: Option<ApplicationType>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Organization name used for the walkthrough
    #[arg(long, default_value = "Chess Guild")]
    pub(crate) name: String,
    /// Stop after the first registration is verified
    #[arg(long)]
    pub(crate) skip_renewal: bool,
}

pub(crate) fn run_requirements(args: RequirementsArgs) -> Result<(), AppError> {
    let table = RequirementTable::standard();
    let kinds = match args.kind {
        Some(kind) => vec![kind],
        None => vec![ApplicationType::New, ApplicationType::Renewal],
    };

    for kind in kinds {
        println!("{} application", kind.label());
        for (position, document) in table.documents(kind).iter().enumerate() {
            println!("  {:>2}. {} ({})", position + 1, document.title, document.key);
        }
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let notices = Arc::new(DemoOutbox::default());
    let service: DemoService = RegistrationService::new(
        Arc::new(InMemoryRegistrationRepository::default()),
        notices.clone(),
    );
    let president = Actor::new(UserId(100), Role::OrganizationPresident);
    let reviewer = Actor::new(UserId(1), Role::Osoad);
    let start = Utc::now();

    println!("Organization registration demo");
    let receipt = service.register_organization(&president, &args.name, start)?;
    println!(
        "- Registered '{}' (organization {}) -> {}",
        receipt.organization.name,
        receipt.organization.id,
        receipt.organization.status.label()
    );

    let files = upload_everything(&service, &president, &receipt.application, start)?;

    let first = &files[0];
    let review = service.review_file(
        &reviewer,
        first,
        FileReview {
            status: FileStatus::NeedsRevision,
            feedback: Some(FeedbackDraft {
                subject: "Signature missing".to_string(),
                message: "Have the adviser sign page one and upload again.".to_string(),
            }),
        },
        start + Duration::days(1),
    )?;
    println!(
        "- Reviewer flagged file {} as {}",
        review.file.id,
        review.file.status.label()
    );

    let key = RequirementTable::standard().documents(ApplicationType::New)[0].key;
    service.upload_document(
        &president,
        &receipt.application.id,
        sample_pdf(key),
        start + Duration::days(2),
    )?;
    println!("- Re-uploaded {key}");

    let verified_at = start + Duration::days(3);
    for file_id in &files {
        let review = service.review_file(
            &reviewer,
            file_id,
            FileReview {
                status: FileStatus::Verified,
                feedback: None,
            },
            verified_at,
        )?;
        print_refresh(&review.refresh);
    }

    let overview = service.organization_overview(&president, &receipt.organization.id, verified_at)?;
    println!(
        "- Organization is now {} (activated {})",
        overview.organization.status.label(),
        format_date(overview.organization.activation_date)
    );

    let announcement = service.send_announcement(
        &reviewer,
        AnnouncementDraft {
            subject: "Renewal season".to_string(),
            message: "Renewal applications open at the start of the academic year.".to_string(),
            audience: Audience::All,
        },
        verified_at,
    )?;
    println!(
        "- OSOAD announced '{}' to {} organization(s)",
        announcement.announcement.subject,
        announcement.recipients.len()
    );

    if !args.skip_renewal {
        let next_year = start
            .checked_add_months(Months::new(12))
            .unwrap_or(start + Duration::days(365));
        println!("\nRenewal one year later");
        let renewal = service.open_renewal(&president, &receipt.organization.id, next_year)?;
        println!(
            "- Opened renewal application {} for {}",
            renewal.id, renewal.academic_year
        );
        let carried = service.carry_forward_logo(&president, &renewal.id, next_year)?;
        println!("- Carried logo forward as file {}", carried.file.id);

        let renewal_files = upload_everything(&service, &president, &renewal, next_year)?;
        let renewed_at = next_year + Duration::days(4);
        for file_id in renewal_files.iter().chain(std::iter::once(&carried.file.id)) {
            service.review_file(
                &reviewer,
                file_id,
                FileReview {
                    status: FileStatus::Verified,
                    feedback: None,
                },
                renewed_at,
            )?;
        }
        let overview = service.organization_overview(&president, &receipt.organization.id, renewed_at)?;
        println!(
            "- Organization {} | last renewal {} | academic year {}",
            overview.organization.status.label(),
            format_date(overview.organization.last_renewal_date),
            overview
                .organization
                .current_academic_year
                .map(|year| year.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }

    let notices = notices.drain();
    println!("\nNotices queued: {}", notices.len());
    for notice in notices {
        println!("  - {:?} for organization {}", notice.kind, notice.organization_id);
    }

    Ok(())
}

/// Upload every document the application still lacks; returns the new file ids.
fn upload_everything(
    service: &DemoService,
    actor: &Actor,
    application: &Application,
    at: DateTime<Utc>,
) -> Result<Vec<FileId>, AppError> {
    let view = service.application_status(actor, &application.id)?;
    let mut files = Vec::new();
    for progress in view.documents.iter().filter(|progress| progress.file_id.is_none()) {
        let receipt = service.upload_document(actor, &application.id, sample_pdf(progress.key), at)?;
        println!("- Uploaded {} -> file {}", progress.title, receipt.file.id);
        print_refresh(&receipt.refresh);
        files.push(receipt.file.id);
    }
    Ok(files)
}

fn sample_pdf(key: &str) -> DocumentUpload {
    DocumentUpload {
        key: key.to_string(),
        original_filename: format!("{key}.pdf"),
        content: format!("%PDF-1.7\n% {key}\n").into_bytes(),
    }
}

fn print_refresh(refresh: &StatusRefresh) {
    match refresh {
        StatusRefresh::Updated(outcome) if outcome.changed() => println!(
            "  Application {} -> {}",
            outcome.previous.label(),
            outcome.current.label()
        ),
        StatusRefresh::Updated(_) => {}
        StatusRefresh::Failed(error) => println!("  Status refresh failed: {error}"),
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
