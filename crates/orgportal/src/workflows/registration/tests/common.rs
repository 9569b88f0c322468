use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::config::ThrottleConfig;
use crate::workflows::registration::domain::{
    AcademicYear, Actor, Announcement, AnnouncementId, AnnouncementRecipient, Application,
    ApplicationFile, ApplicationId, ApplicationStatus, ApplicationType, Feedback, FeedbackId,
    FileId, FileStatus, Organization, OrganizationId, Role, UserId,
};
use crate::workflows::registration::notify::{Notice, NoticeKind, Notifier, NotifyError};
use crate::workflows::registration::repository::{RegistrationRepository, RepositoryError};
use crate::workflows::registration::requirements::RequirementTable;
use crate::workflows::registration::router::{registration_router, ROLE_HEADER, USER_HEADER};
use crate::workflows::registration::service::{DocumentUpload, FileReview, RegistrationService};
use crate::workflows::registration::throttle::AttemptLimiter;
use crate::workflows::registration::tracker::StatusChange;
use crate::workflows::registration::InMemoryRegistrationRepository;

pub(super) type MemoryService = RegistrationService<InMemoryRegistrationRepository, RecordingNotifier>;

/// 2025-09-01T08:00:00Z, inside academic year 2025-2026.
pub(super) fn now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_756_713_600, 0).expect("valid timestamp")
}

pub(super) fn president(user: u64) -> Actor {
    Actor::new(UserId(user), Role::OrganizationPresident)
}

pub(super) fn reviewer() -> Actor {
    Actor::new(UserId(1), Role::Osoad)
}

pub(super) fn pdf(key: &str) -> DocumentUpload {
    DocumentUpload {
        key: key.to_string(),
        original_filename: format!("{key}.pdf"),
        content: format!("%PDF-1.7 {key}").into_bytes(),
    }
}

pub(super) fn verify() -> FileReview {
    FileReview {
        status: FileStatus::Verified,
        feedback: None,
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryRegistrationRepository>,
    Arc<RecordingNotifier>,
) {
    let repository = Arc::new(InMemoryRegistrationRepository::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = RegistrationService::new(repository.clone(), notifier.clone());
    (service, repository, notifier)
}

/// Upload every required document for the application's type.
pub(super) fn upload_all(
    service: &MemoryService,
    actor: &Actor,
    application: &Application,
    at: DateTime<Utc>,
) -> Vec<ApplicationFile> {
    RequirementTable::standard()
        .documents(application.kind)
        .iter()
        .map(|document| {
            service
                .upload_document(actor, &application.id, pdf(document.key), at)
                .expect("upload accepted")
                .file
        })
        .collect()
}

pub(super) fn verify_all(service: &MemoryService, files: &[ApplicationFile], at: DateTime<Utc>) {
    for file in files {
        service
            .review_file(&reviewer(), &file.id, verify(), at)
            .expect("review accepted");
    }
}

/// Register an organization and carry its `New` application through to Verified.
pub(super) fn verified_organization(
    service: &MemoryService,
    owner: &Actor,
    at: DateTime<Utc>,
) -> (Organization, Application) {
    let receipt = service
        .register_organization(owner, "Chess Guild", at)
        .expect("registered");
    let files = upload_all(service, owner, &receipt.application, at);
    verify_all(service, &files, at + Duration::days(3));
    (receipt.organization, receipt.application)
}

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub(super) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn kinds(&self) -> Vec<NoticeKind> {
        self.notices().into_iter().map(|notice| notice.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, notice: Notice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl Notifier for OfflineNotifier {
    fn send(&self, _notice: Notice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

/// In-memory store that can be told to fail everything or only status commits.
#[derive(Default)]
pub(super) struct FaultyRepository {
    pub(super) inner: InMemoryRegistrationRepository,
    pub(super) offline: bool,
    pub(super) reject_commits: bool,
}

impl FaultyRepository {
    pub(super) fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub(super) fn rejecting_commits() -> Self {
        Self {
            reject_commits: true,
            ..Self::default()
        }
    }

    fn guard(&self) -> Result<(), RepositoryError> {
        if self.offline {
            Err(RepositoryError::Unavailable("database offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RegistrationRepository for FaultyRepository {
    fn insert_organization(
        &self,
        organization: Organization,
    ) -> Result<Organization, RepositoryError> {
        self.guard()?;
        self.inner.insert_organization(organization)
    }

    fn update_organization(&self, organization: Organization) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.update_organization(organization)
    }

    fn fetch_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        self.guard()?;
        self.inner.fetch_organization(id)
    }

    fn organization_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Option<Organization>, RepositoryError> {
        self.guard()?;
        self.inner.organization_for_owner(owner)
    }

    fn organizations(&self) -> Result<Vec<Organization>, RepositoryError> {
        self.guard()?;
        self.inner.organizations()
    }

    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        self.guard()?;
        self.inner.insert_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.guard()?;
        self.inner.fetch_application(id)
    }

    fn applications_for(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.guard()?;
        self.inner.applications_for(organization_id)
    }

    fn find_application(
        &self,
        organization_id: &OrganizationId,
        kind: Option<ApplicationType>,
        academic_year: AcademicYear,
    ) -> Result<Option<Application>, RepositoryError> {
        self.guard()?;
        self.inner
            .find_application(organization_id, kind, academic_year)
    }

    fn applications_with_status(
        &self,
        kind: Option<ApplicationType>,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.guard()?;
        self.inner.applications_with_status(kind, status)
    }

    fn save_file(&self, file: ApplicationFile) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.save_file(file)
    }

    fn fetch_file(&self, id: &FileId) -> Result<Option<ApplicationFile>, RepositoryError> {
        self.guard()?;
        self.inner.fetch_file(id)
    }

    fn files_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<ApplicationFile>, RepositoryError> {
        self.guard()?;
        self.inner.files_for(application_id)
    }

    fn file_named(
        &self,
        application_id: &ApplicationId,
        file_name: &str,
    ) -> Result<Option<ApplicationFile>, RepositoryError> {
        self.guard()?;
        self.inner.file_named(application_id, file_name)
    }

    fn insert_feedback(&self, feedback: Feedback) -> Result<Feedback, RepositoryError> {
        self.guard()?;
        self.inner.insert_feedback(feedback)
    }

    fn fetch_feedback(&self, id: &FeedbackId) -> Result<Option<Feedback>, RepositoryError> {
        self.guard()?;
        self.inner.fetch_feedback(id)
    }

    fn update_feedback(&self, feedback: Feedback) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.update_feedback(feedback)
    }

    fn feedback_for(&self, application_id: &ApplicationId) -> Result<Vec<Feedback>, RepositoryError> {
        self.guard()?;
        self.inner.feedback_for(application_id)
    }

    fn commit_status_change(&self, change: StatusChange) -> Result<(), RepositoryError> {
        self.guard()?;
        if self.reject_commits {
            return Err(RepositoryError::Unavailable("write lock timeout".to_string()));
        }
        self.inner.commit_status_change(change)
    }

    fn insert_announcement(
        &self,
        announcement: Announcement,
        recipients: Vec<AnnouncementRecipient>,
    ) -> Result<Announcement, RepositoryError> {
        self.guard()?;
        self.inner.insert_announcement(announcement, recipients)
    }

    fn announcements(&self) -> Result<Vec<Announcement>, RepositoryError> {
        self.guard()?;
        self.inner.announcements()
    }

    fn fetch_announcement(
        &self,
        id: &AnnouncementId,
    ) -> Result<Option<Announcement>, RepositoryError> {
        self.guard()?;
        self.inner.fetch_announcement(id)
    }

    fn announcement_recipients(
        &self,
        id: &AnnouncementId,
    ) -> Result<Vec<AnnouncementRecipient>, RepositoryError> {
        self.guard()?;
        self.inner.announcement_recipients(id)
    }

    fn delete_announcement(&self, id: &AnnouncementId) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.delete_announcement(id)
    }
}

pub(super) fn router_with_service(
    service: MemoryService,
    throttle: ThrottleConfig,
) -> axum::Router {
    registration_router(Arc::new(service), Arc::new(AttemptLimiter::new(throttle)))
}

pub(super) fn request(method: &str, uri: &str, actor: Option<&Actor>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(USER_HEADER, actor.user_id.to_string())
            .header(ROLE_HEADER, actor.role.label());
    }
    builder.body(body).expect("request builds")
}

pub(super) fn json_request(method: &str, uri: &str, actor: Option<&Actor>, payload: Value) -> Request<Body> {
    let mut request = request(method, uri, actor, Body::from(payload.to_string()));
    request.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("application/json"),
    );
    request
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
