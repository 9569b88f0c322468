use super::domain::{
    AcademicYear, Announcement, AnnouncementId, AnnouncementRecipient, Application,
    ApplicationFile, ApplicationId, ApplicationStatus, ApplicationType, Feedback, FeedbackId,
    FileId, Organization, OrganizationId, UserId,
};
use super::tracker::StatusChange;

/// Storage abstraction so the service module can be exercised in isolation.
pub trait RegistrationRepository: Send + Sync {
    fn insert_organization(&self, organization: Organization)
        -> Result<Organization, RepositoryError>;
    fn update_organization(&self, organization: Organization) -> Result<(), RepositoryError>;
    fn fetch_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError>;
    fn organization_for_owner(&self, owner: &UserId)
        -> Result<Option<Organization>, RepositoryError>;
    fn organizations(&self) -> Result<Vec<Organization>, RepositoryError>;

    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    fn applications_for(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn find_application(
        &self,
        organization_id: &OrganizationId,
        kind: Option<ApplicationType>,
        academic_year: AcademicYear,
    ) -> Result<Option<Application>, RepositoryError>;
    fn applications_with_status(
        &self,
        kind: Option<ApplicationType>,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, RepositoryError>;

    /// Insert or replace a file by id.
    fn save_file(&self, file: ApplicationFile) -> Result<(), RepositoryError>;
    fn fetch_file(&self, id: &FileId) -> Result<Option<ApplicationFile>, RepositoryError>;
    fn files_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<ApplicationFile>, RepositoryError>;
    fn file_named(
        &self,
        application_id: &ApplicationId,
        file_name: &str,
    ) -> Result<Option<ApplicationFile>, RepositoryError>;

    fn insert_feedback(&self, feedback: Feedback) -> Result<Feedback, RepositoryError>;
    fn fetch_feedback(&self, id: &FeedbackId) -> Result<Option<Feedback>, RepositoryError>;
    fn update_feedback(&self, feedback: Feedback) -> Result<(), RepositoryError>;
    fn feedback_for(&self, application_id: &ApplicationId)
        -> Result<Vec<Feedback>, RepositoryError>;

    /// Persist every write of a status change or none of them.
    fn commit_status_change(&self, change: StatusChange) -> Result<(), RepositoryError>;

    fn insert_announcement(
        &self,
        announcement: Announcement,
        recipients: Vec<AnnouncementRecipient>,
    ) -> Result<Announcement, RepositoryError>;
    fn announcements(&self) -> Result<Vec<Announcement>, RepositoryError>;
    fn fetch_announcement(
        &self,
        id: &AnnouncementId,
    ) -> Result<Option<Announcement>, RepositoryError>;
    fn announcement_recipients(
        &self,
        id: &AnnouncementId,
    ) -> Result<Vec<AnnouncementRecipient>, RepositoryError>;
    /// Remove an announcement together with its recipients.
    fn delete_announcement(&self, id: &AnnouncementId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
