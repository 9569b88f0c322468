use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use orgportal::workflows::registration::{
    AcademicYear, Actor, Application, ApplicationStatus, ApplicationType, DocumentUpload,
    ExpiryPolicy, FileReview, FileStatus, InMemoryRegistrationRepository, Notice, NoticeKind,
    Notifier, NotifyError, OrganizationSeedImporter, OrganizationStatus, RegistrationRepository,
    RegistrationService, RequirementTable, Role, UserId,
};

#[derive(Default)]
struct Outbox {
    notices: Mutex<Vec<NoticeKind>>,
}

impl Notifier for Outbox {
    fn send(&self, notice: Notice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("outbox mutex poisoned")
            .push(notice.kind);
        Ok(())
    }
}

type Service = RegistrationService<InMemoryRegistrationRepository, Outbox>;

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-08-15T09:30:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn service() -> (Service, Arc<InMemoryRegistrationRepository>, Arc<Outbox>) {
    let repository = Arc::new(InMemoryRegistrationRepository::default());
    let outbox = Arc::new(Outbox::default());
    let service = RegistrationService::with_policies(
        repository.clone(),
        outbox.clone(),
        RequirementTable::standard(),
        ExpiryPolicy::new(365),
    );
    (service, repository, outbox)
}

fn complete_and_verify(
    service: &Service,
    owner: &Actor,
    application: &Application,
    uploaded_at: DateTime<Utc>,
    verified_at: DateTime<Utc>,
) {
    let reviewer = Actor::new(UserId(1), Role::Osoad);
    let view = service
        .application_status(owner, &application.id)
        .expect("status view");
    let mut files = Vec::new();
    for progress in view.documents.iter().filter(|progress| progress.file_id.is_none()) {
        let upload = DocumentUpload {
            key: progress.key.to_string(),
            original_filename: format!("{}.pdf", progress.key),
            content: b"%PDF-1.4".to_vec(),
        };
        files.push(
            service
                .upload_document(owner, &application.id, upload, uploaded_at)
                .expect("upload accepted")
                .file,
        );
    }
    for file in service
        .application_files(owner, &application.id)
        .expect("files listed")
    {
        let review = FileReview {
            status: FileStatus::Verified,
            feedback: None,
        };
        service
            .review_file(&reviewer, &file.id, review, verified_at)
            .expect("review accepted");
    }
}

#[test]
fn organization_lifecycle_spans_registration_expiry_and_renewal() {
    let (service, repository, outbox) = service();
    let owner = Actor::new(UserId(77), Role::Applicant);

    let receipt = service
        .register_organization(&owner, "Astronomy Society", start())
        .expect("registered");
    assert_eq!(receipt.application.academic_year, AcademicYear::starting(2025));

    let verified_at = start() + Duration::days(10);
    complete_and_verify(&service, &owner, &receipt.application, start(), verified_at);

    let organization = repository
        .fetch_organization(&receipt.organization.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(organization.status, OrganizationStatus::Active);
    assert_eq!(organization.activation_date, Some(verified_at));

    // Within a year nothing expires.
    let report = service
        .sweep_expired(verified_at + Duration::days(365))
        .expect("sweep");
    assert!(report.deactivated.is_empty());

    let lapsed = verified_at + Duration::days(366);
    let report = service.sweep_expired(lapsed).expect("sweep");
    assert_eq!(report.deactivated, vec![receipt.organization.id]);
    let organization = repository
        .fetch_organization(&receipt.organization.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(organization.status, OrganizationStatus::Inactive);

    let renewal = service
        .open_renewal(&owner, &receipt.organization.id, lapsed)
        .expect("renewal opened");
    assert_eq!(renewal.academic_year, AcademicYear::starting(2026));
    let renewed_at = lapsed + Duration::days(7);
    complete_and_verify(&service, &owner, &renewal, lapsed, renewed_at);

    let organization = repository
        .fetch_organization(&receipt.organization.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(organization.status, OrganizationStatus::Active);
    assert_eq!(organization.activation_date, Some(renewed_at));
    assert_eq!(organization.last_renewal_date, Some(renewed_at));
    assert_eq!(
        organization.current_academic_year,
        Some(AcademicYear::starting(2026))
    );

    let renewal = repository
        .fetch_application(&renewal.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(renewal.status, ApplicationStatus::Verified);
    assert_eq!(renewal.kind, ApplicationType::Renewal);

    let report = service
        .sweep_expired(renewed_at + Duration::days(30))
        .expect("sweep");
    assert!(report.deactivated.is_empty());

    let notices = outbox.notices.lock().expect("outbox mutex poisoned").clone();
    let count = |kind| notices.iter().filter(|notice| **notice == kind).count();
    assert_eq!(count(NoticeKind::ApplicationSubmitted), 2);
    assert_eq!(count(NoticeKind::ApplicationVerified), 2);
    assert_eq!(count(NoticeKind::OrganizationExpired), 1);
    assert_eq!(count(NoticeKind::FileReviewed), 7 + 9);
}

#[test]
fn seeded_organizations_join_the_expiry_sweep() {
    let (service, repository, _) = service();
    let csv = "owner,name,status,activation_date,last_renewal_date,current_academic_year\n\
               5,Debate Union,Active,2023-06-01,2024-06-01,2024-2025\n\
               6,Glee Club,Active,2025-06-01,,2025-2026\n";
    for seed in OrganizationSeedImporter::from_reader(csv.as_bytes()).expect("seed parses") {
        service.seed_organization(seed).expect("seeded");
    }

    let report = service.sweep_expired(start()).expect("sweep");
    assert_eq!(report.checked, 2);
    assert_eq!(report.deactivated.len(), 1);

    let debate = repository
        .organization_for_owner(&UserId(5))
        .expect("fetch")
        .expect("present");
    assert_eq!(debate.status, OrganizationStatus::Inactive);
    let glee = repository
        .organization_for_owner(&UserId(6))
        .expect("fetch")
        .expect("present");
    assert_eq!(glee.status, OrganizationStatus::Active);
}
