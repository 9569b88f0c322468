use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::access::{self, AccessDenied};
use super::domain::{
    AcademicYear, Actor, Application, ApplicationFile, ApplicationId, ApplicationStatus,
    ApplicationType, Feedback, FeedbackId, FileId, FileStatus, Organization, OrganizationId,
    OrganizationStatus,
};
use super::expiry::{ExpiryPolicy, SweepReport};
use super::notify::{self, Notice, NoticeKind, Notifier};
use super::repository::{RegistrationRepository, RepositoryError};
use super::requirements::{RequirementTable, LOGO_KEY};
use super::seed::OrganizationSeed;
use super::tracker::{plan_transition, Completeness, RecomputeOutcome};

static ORGANIZATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static FILE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static FEEDBACK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(super) fn next_id(sequence: &AtomicU64) -> u64 {
    sequence.fetch_add(1, Ordering::Relaxed)
}

const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=100;

/// Service composing the requirement table, repository, and notifier.
pub struct RegistrationService<R, N> {
    pub(super) repository: Arc<R>,
    pub(super) notifier: Arc<N>,
    requirements: RequirementTable,
    expiry: ExpiryPolicy,
}

/// A document as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub key: String,
    pub original_filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedbackDraft {
    pub subject: String,
    pub message: String,
}

/// Reviewer decision on one file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileReview {
    pub status: FileStatus,
    #[serde(default)]
    pub feedback: Option<FeedbackDraft>,
}

/// How the status recomputation that follows a write went.
#[derive(Debug)]
pub enum StatusRefresh {
    Updated(RecomputeOutcome),
    Failed(RecomputeError),
}

impl StatusRefresh {
    pub fn outcome(&self) -> Option<&RecomputeOutcome> {
        match self {
            StatusRefresh::Updated(outcome) => Some(outcome),
            StatusRefresh::Failed(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct DocumentReceipt {
    pub file: ApplicationFile,
    pub replaced: bool,
    pub refresh: StatusRefresh,
}

#[derive(Debug)]
pub struct ReviewReceipt {
    pub file: ApplicationFile,
    pub feedback: Option<Feedback>,
    pub refresh: StatusRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationReceipt {
    pub organization: Organization,
    pub application: Application,
}

/// Progress of one required document slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementProgress {
    pub key: &'static str,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FileStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub organization_id: OrganizationId,
    pub kind: ApplicationType,
    pub academic_year: AcademicYear,
    pub status: ApplicationStatus,
    pub submission_date: Option<DateTime<Utc>>,
    pub organization_status: OrganizationStatus,
    pub documents: Vec<RequirementProgress>,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationOverview {
    pub organization: Organization,
    pub applications: Vec<Application>,
    pub renewal_open: bool,
}

/// The logo a renewal could carry forward from the previous academic year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviousLogo {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_application: Option<ApplicationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FileStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub application: Application,
    pub organization_name: String,
}

impl<R, N> RegistrationService<R, N>
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self::with_policies(
            repository,
            notifier,
            RequirementTable::standard(),
            ExpiryPolicy::default(),
        )
    }

    pub fn with_policies(
        repository: Arc<R>,
        notifier: Arc<N>,
        requirements: RequirementTable,
        expiry: ExpiryPolicy,
    ) -> Self {
        Self {
            repository,
            notifier,
            requirements,
            expiry,
        }
    }

    pub fn requirements(&self) -> &RequirementTable {
        &self.requirements
    }

    /// First step: create the organization and its `New` application.
    pub fn register_organization(
        &self,
        actor: &Actor,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        access::require_member(actor)?;
        let name = name.trim();
        if !NAME_LENGTH.contains(&name.chars().count()) {
            return Err(RegistrationError::Validation(format!(
                "organization name must be between {} and {} characters",
                NAME_LENGTH.start(),
                NAME_LENGTH.end()
            )));
        }
        if self
            .repository
            .organization_for_owner(&actor.user_id)?
            .is_some()
        {
            return Err(RegistrationError::Conflict(
                "account already manages an organization".to_string(),
            ));
        }

        let organization = self.repository.insert_organization(Organization {
            id: OrganizationId(next_id(&ORGANIZATION_SEQUENCE)),
            owner: actor.user_id,
            name: name.to_string(),
            status: OrganizationStatus::Incomplete,
            activation_date: None,
            last_renewal_date: None,
            current_academic_year: None,
        })?;
        let application = self.repository.insert_application(Application {
            id: ApplicationId(next_id(&APPLICATION_SEQUENCE)),
            organization_id: organization.id,
            kind: ApplicationType::New,
            academic_year: AcademicYear::at(now),
            status: ApplicationStatus::Incomplete,
            submission_date: None,
        })?;

        info!(
            organization_id = %organization.id,
            application_id = %application.id,
            "organization registered"
        );
        Ok(RegistrationReceipt {
            organization,
            application,
        })
    }

    /// Open the renewal application for the academic year of `now`.
    pub fn open_renewal(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<Application, RegistrationError> {
        let organization = self.organization(organization_id)?;
        access::require_owner(actor, &organization)?;

        let academic_year = AcademicYear::at(now);
        let applications = self.repository.applications_for(organization_id)?;
        if !governing_application_verified(&applications) {
            return Err(RegistrationError::Validation(
                "organization must be verified before it can renew".to_string(),
            ));
        }
        if self
            .repository
            .find_application(organization_id, Some(ApplicationType::Renewal), academic_year)?
            .is_some()
        {
            return Err(RegistrationError::Conflict(format!(
                "a renewal application for academic year {academic_year} already exists"
            )));
        }

        let application = self.repository.insert_application(Application {
            id: ApplicationId(next_id(&APPLICATION_SEQUENCE)),
            organization_id: organization.id,
            kind: ApplicationType::Renewal,
            academic_year,
            status: ApplicationStatus::Incomplete,
            submission_date: None,
        })?;
        info!(
            organization_id = %organization.id,
            application_id = %application.id,
            %academic_year,
            "renewal opened"
        );
        Ok(application)
    }

    /// Store or replace the document for one required slot, then refresh status.
    pub fn upload_document(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        upload: DocumentUpload,
        now: DateTime<Utc>,
    ) -> Result<DocumentReceipt, RegistrationError> {
        let application = self.application(application_id)?;
        let organization = self.organization(&application.organization_id)?;
        access::require_owner(actor, &organization)?;

        let title = self
            .requirements
            .find(application.kind, &upload.key)
            .map(|document| document.title)
            .ok_or_else(|| {
                RegistrationError::Validation(format!(
                    "'{}' is not a required document for {} applications",
                    upload.key,
                    application.kind.label()
                ))
            })?;
        validate_upload(&upload)?;

        let (file, replaced) = self.store_document(
            &application,
            title,
            upload.original_filename,
            upload.content,
            now,
        )?;
        let refresh = self.refresh_status(&application.id, now);
        Ok(DocumentReceipt {
            file,
            replaced,
            refresh,
        })
    }

    /// Copy last academic year's logo into a renewal application.
    pub fn carry_forward_logo(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<DocumentReceipt, RegistrationError> {
        let application = self.application(application_id)?;
        let organization = self.organization(&application.organization_id)?;
        access::require_owner(actor, &organization)?;
        require_renewal(&application)?;

        let logo_title = self.logo_title()?;
        let previous = self
            .previous_year_application(&application)?
            .ok_or(RegistrationError::NotFound("previous academic year application"))?;
        let previous_logo = self
            .repository
            .file_named(&previous.id, logo_title)?
            .ok_or(RegistrationError::NotFound("previous logo"))?;

        let (file, replaced) = self.store_document(
            &application,
            logo_title,
            previous_logo.original_filename,
            previous_logo.content,
            now,
        )?;
        info!(
            application_id = %application.id,
            from_application = %previous.id,
            "logo carried forward"
        );
        let refresh = self.refresh_status(&application.id, now);
        Ok(DocumentReceipt {
            file,
            replaced,
            refresh,
        })
    }

    /// Report whether a logo can be carried forward, without copying it.
    pub fn previous_logo(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<PreviousLogo, RegistrationError> {
        let application = self.application(application_id)?;
        let organization = self.organization(&application.organization_id)?;
        access::require_viewer(actor, &organization)?;
        require_renewal(&application)?;

        let logo_title = self.logo_title()?;
        let previous = self.previous_year_application(&application)?;
        let logo = match &previous {
            Some(previous) => self.repository.file_named(&previous.id, logo_title)?,
            None => None,
        };
        Ok(PreviousLogo {
            available: logo.is_some(),
            previous_application: previous.map(|previous| previous.id),
            file_id: logo.as_ref().map(|file| file.id),
            status: logo.as_ref().map(|file| file.status),
            submission_date: logo.as_ref().map(|file| file.submission_date),
        })
    }

    /// Reviewer edit of a file's status with optional feedback to the owners.
    pub fn review_file(
        &self,
        actor: &Actor,
        file_id: &FileId,
        review: FileReview,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt, RegistrationError> {
        access::require_reviewer(actor)?;
        let mut file = self
            .repository
            .fetch_file(file_id)?
            .ok_or(RegistrationError::NotFound("file"))?;
        let application = self.application(&file.application_id)?;

        let draft = review.feedback.map(validate_feedback).transpose()?;

        file.status = review.status;
        self.repository.save_file(file.clone())?;

        let feedback = match draft {
            Some(draft) => Some(self.repository.insert_feedback(Feedback {
                id: FeedbackId(next_id(&FEEDBACK_SEQUENCE)),
                file_id: file.id,
                subject: draft.subject,
                message: draft.message,
                date_sent: now,
                is_read: false,
            })?),
            None => None,
        };

        info!(
            file_id = %file.id,
            application_id = %application.id,
            status = file.status.label(),
            "file reviewed"
        );
        let mut notice = Notice::new(NoticeKind::FileReviewed, application.organization_id)
            .for_application(application.id)
            .detail("document", file.file_name.clone())
            .detail("status", file.status.label());
        if let Some(feedback) = &feedback {
            notice = notice.detail("subject", feedback.subject.clone());
        }
        notify::dispatch(self.notifier.as_ref(), notice);

        let refresh = self.refresh_status(&application.id, now);
        Ok(ReviewReceipt {
            file,
            feedback,
            refresh,
        })
    }

    /// Re-evaluate an application's status against its files.
    pub fn recompute_status(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<RecomputeOutcome, RecomputeError> {
        let application = self
            .repository
            .fetch_application(application_id)?
            .ok_or(RecomputeError::ApplicationMissing(*application_id))?;
        let organization = self
            .repository
            .fetch_organization(&application.organization_id)?
            .ok_or(RecomputeError::OrganizationMissing(application.organization_id))?;
        let files = self.repository.files_for(application_id)?;
        let completeness = Completeness::assess(&self.requirements, application.kind, &files);

        let Some(change) = plan_transition(&application, &organization, completeness, now) else {
            return Ok(RecomputeOutcome {
                previous: application.status,
                current: application.status,
                organization_status: None,
            });
        };

        let current = change.application.status;
        let organization_status = change.organization.as_ref().map(|org| org.status);
        self.repository.commit_status_change(change)?;

        info!(
            %application_id,
            from = application.status.label(),
            to = current.label(),
            "application status advanced"
        );
        let kind = match current {
            ApplicationStatus::Verified => NoticeKind::ApplicationVerified,
            _ => NoticeKind::ApplicationSubmitted,
        };
        notify::dispatch(
            self.notifier.as_ref(),
            Notice::new(kind, application.organization_id)
                .for_application(application.id)
                .detail("status", current.label())
                .detail("academic_year", application.academic_year.to_string()),
        );

        Ok(RecomputeOutcome {
            previous: application.status,
            current,
            organization_status,
        })
    }

    pub fn application_status(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<ApplicationStatusView, RegistrationError> {
        let application = self.application(application_id)?;
        let organization = self.organization(&application.organization_id)?;
        access::require_viewer(actor, &organization)?;

        let files = self.repository.files_for(application_id)?;
        let documents: Vec<RequirementProgress> = self
            .requirements
            .documents(application.kind)
            .iter()
            .map(|document| {
                let file = files.iter().find(|file| file.file_name == document.title);
                RequirementProgress {
                    key: document.key,
                    title: document.title,
                    file_id: file.map(|file| file.id),
                    status: file.map(|file| file.status),
                    submission_date: file.map(|file| file.submission_date),
                }
            })
            .collect();
        let missing = self
            .requirements
            .missing(
                application.kind,
                files.iter().map(|file| file.file_name.as_str()),
            )
            .len();

        Ok(ApplicationStatusView {
            application_id: application.id,
            organization_id: organization.id,
            kind: application.kind,
            academic_year: application.academic_year,
            status: application.status,
            submission_date: application.submission_date,
            organization_status: organization.status,
            documents,
            missing,
        })
    }

    /// Files in requirement-table order; unrecognised names last.
    pub fn application_files(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<ApplicationFile>, RegistrationError> {
        let application = self.application(application_id)?;
        let organization = self.organization(&application.organization_id)?;
        access::require_viewer(actor, &organization)?;

        let mut files = self.repository.files_for(application_id)?;
        files.sort_by_key(|file| {
            (
                self.requirements.order_of(application.kind, &file.file_name),
                file.id,
            )
        });
        Ok(files)
    }

    /// Feedback on an application's files, newest first.
    pub fn application_feedback(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<Feedback>, RegistrationError> {
        let application = self.application(application_id)?;
        let organization = self.organization(&application.organization_id)?;
        access::require_viewer(actor, &organization)?;

        let mut feedback = self.repository.feedback_for(application_id)?;
        feedback.sort_by(|a, b| b.date_sent.cmp(&a.date_sent).then(b.id.cmp(&a.id)));
        Ok(feedback)
    }

    pub fn mark_feedback_read(
        &self,
        actor: &Actor,
        feedback_id: &FeedbackId,
    ) -> Result<Feedback, RegistrationError> {
        let mut feedback = self
            .repository
            .fetch_feedback(feedback_id)?
            .ok_or(RegistrationError::NotFound("feedback"))?;
        let file = self
            .repository
            .fetch_file(&feedback.file_id)?
            .ok_or(RegistrationError::NotFound("file"))?;
        let application = self.application(&file.application_id)?;
        let organization = self.organization(&application.organization_id)?;
        access::require_owner(actor, &organization)?;

        if !feedback.is_read {
            feedback.is_read = true;
            self.repository.update_feedback(feedback.clone())?;
        }
        Ok(feedback)
    }

    pub fn organization_overview(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<OrganizationOverview, RegistrationError> {
        let organization = self.organization(organization_id)?;
        access::require_viewer(actor, &organization)?;

        let mut applications = self.repository.applications_for(organization_id)?;
        applications.sort_by_key(|application| (application.academic_year, application.id));
        let renewal_open = governing_application_verified(&applications)
            && !has_renewal_for(&applications, AcademicYear::at(now));

        Ok(OrganizationOverview {
            organization,
            applications,
            renewal_open,
        })
    }

    /// Applications awaiting attention, oldest submission first.
    pub fn review_queue(
        &self,
        actor: &Actor,
        kind: Option<ApplicationType>,
        status: ApplicationStatus,
    ) -> Result<Vec<QueueEntry>, RegistrationError> {
        access::require_reviewer(actor)?;
        let mut applications = self.repository.applications_with_status(kind, status)?;
        applications.sort_by_key(|application| (application.submission_date, application.id));

        applications
            .into_iter()
            .map(|application| -> Result<QueueEntry, RegistrationError> {
                let organization_name = self
                    .repository
                    .fetch_organization(&application.organization_id)?
                    .map(|organization| organization.name)
                    .unwrap_or_default();
                Ok(QueueEntry {
                    application,
                    organization_name,
                })
            })
            .collect()
    }

    /// Demote organizations whose activation and renewal have both lapsed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, RepositoryError> {
        let organizations = self.repository.organizations()?;
        let checked = organizations.len();
        let mut deactivated = Vec::new();

        for mut organization in organizations {
            if !self.expiry.is_expired(&organization, now) {
                continue;
            }
            organization.status = OrganizationStatus::Inactive;
            let id = organization.id;
            self.repository.update_organization(organization)?;
            info!(organization_id = %id, "organization deactivated after expiry");
            notify::dispatch(
                self.notifier.as_ref(),
                Notice::new(NoticeKind::OrganizationExpired, id),
            );
            deactivated.push(id);
        }

        Ok(SweepReport {
            checked,
            deactivated,
        })
    }

    /// Manual sweep trigger for reviewers.
    pub fn trigger_expiry_sweep(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, RegistrationError> {
        access::require_reviewer(actor)?;
        Ok(self.sweep_expired(now)?)
    }

    /// Load an existing organization, with a matching `New` application, at startup.
    pub fn seed_organization(
        &self,
        seed: OrganizationSeed,
    ) -> Result<Organization, RegistrationError> {
        let organization = self.repository.insert_organization(Organization {
            id: OrganizationId(next_id(&ORGANIZATION_SEQUENCE)),
            owner: seed.owner,
            name: seed.name,
            status: seed.status,
            activation_date: seed.activation_date,
            last_renewal_date: seed.last_renewal_date,
            current_academic_year: Some(seed.academic_year),
        })?;
        let status = match seed.status {
            OrganizationStatus::Incomplete => ApplicationStatus::Incomplete,
            OrganizationStatus::Active | OrganizationStatus::Inactive => {
                ApplicationStatus::Verified
            }
        };
        self.repository.insert_application(Application {
            id: ApplicationId(next_id(&APPLICATION_SEQUENCE)),
            organization_id: organization.id,
            kind: ApplicationType::New,
            academic_year: seed.academic_year,
            status,
            submission_date: seed.activation_date,
        })?;
        Ok(organization)
    }

    fn application(&self, id: &ApplicationId) -> Result<Application, RegistrationError> {
        self.repository
            .fetch_application(id)?
            .ok_or(RegistrationError::NotFound("application"))
    }

    fn organization(&self, id: &OrganizationId) -> Result<Organization, RegistrationError> {
        self.repository
            .fetch_organization(id)?
            .ok_or(RegistrationError::NotFound("organization"))
    }

    fn logo_title(&self) -> Result<&'static str, RegistrationError> {
        self.requirements
            .find(ApplicationType::Renewal, LOGO_KEY)
            .map(|document| document.title)
            .ok_or(RegistrationError::NotFound("logo requirement"))
    }

    /// Newest application, of either type, filed for the preceding academic year.
    fn previous_year_application(
        &self,
        application: &Application,
    ) -> Result<Option<Application>, RegistrationError> {
        let previous_year = application.academic_year.previous();
        Ok(self
            .repository
            .applications_for(&application.organization_id)?
            .into_iter()
            .filter(|candidate| candidate.academic_year == previous_year)
            .max_by_key(|candidate| candidate.id))
    }

    fn store_document(
        &self,
        application: &Application,
        title: &str,
        original_filename: String,
        content: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<(ApplicationFile, bool), RegistrationError> {
        let existing = self.repository.file_named(&application.id, title)?;
        let replaced = existing.is_some();
        let id = existing
            .map(|file| file.id)
            .unwrap_or_else(|| FileId(next_id(&FILE_SEQUENCE)));

        let file = ApplicationFile {
            id,
            application_id: application.id,
            file_name: title.to_string(),
            original_filename,
            content,
            status: FileStatus::Pending,
            submission_date: now,
        };
        self.repository.save_file(file.clone())?;
        info!(
            application_id = %application.id,
            file_id = %file.id,
            document = title,
            replaced,
            "document stored"
        );
        Ok((file, replaced))
    }

    fn refresh_status(&self, application_id: &ApplicationId, now: DateTime<Utc>) -> StatusRefresh {
        match self.recompute_status(application_id, now) {
            Ok(outcome) => StatusRefresh::Updated(outcome),
            Err(error) => {
                warn!(%application_id, %error, "status recomputation failed");
                StatusRefresh::Failed(error)
            }
        }
    }
}

/// The organization's first `New` application decides whether it may renew.
fn governing_application_verified(applications: &[Application]) -> bool {
    applications
        .iter()
        .filter(|application| application.kind == ApplicationType::New)
        .min_by_key(|application| (application.academic_year, application.id))
        .is_some_and(|application| application.status == ApplicationStatus::Verified)
}

fn has_renewal_for(applications: &[Application], academic_year: AcademicYear) -> bool {
    applications.iter().any(|application| {
        application.kind == ApplicationType::Renewal && application.academic_year == academic_year
    })
}

fn require_renewal(application: &Application) -> Result<(), RegistrationError> {
    if application.kind == ApplicationType::Renewal {
        Ok(())
    } else {
        Err(RegistrationError::Validation(
            "only renewal applications can carry a logo forward".to_string(),
        ))
    }
}

fn validate_upload(upload: &DocumentUpload) -> Result<(), RegistrationError> {
    let filename = upload.original_filename.trim();
    if filename.is_empty() {
        return Err(RegistrationError::Validation(
            "uploaded file needs a filename".to_string(),
        ));
    }
    let is_pdf = mime_guess::from_path(filename)
        .first()
        .is_some_and(|guess| guess == mime::APPLICATION_PDF);
    if !is_pdf {
        return Err(RegistrationError::Validation(
            "only PDF documents are accepted".to_string(),
        ));
    }
    if upload.content.is_empty() {
        return Err(RegistrationError::Validation(
            "uploaded file is empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_feedback(draft: FeedbackDraft) -> Result<FeedbackDraft, RegistrationError> {
    let subject = draft.subject.trim().to_string();
    let message = draft.message.trim().to_string();
    if subject.is_empty() || message.is_empty() {
        return Err(RegistrationError::Validation(
            "feedback needs both a subject and a message".to_string(),
        ));
    }
    Ok(FeedbackDraft { subject, message })
}

/// Error raised by the registration service.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Why a status recomputation could not complete.
#[derive(Debug, thiserror::Error)]
pub enum RecomputeError {
    #[error("application {0} not found")]
    ApplicationMissing(ApplicationId),
    #[error("organization {0} not found")]
    OrganizationMissing(OrganizationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
