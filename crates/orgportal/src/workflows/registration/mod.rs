//! Student organization registration and renewal.
//!
//! Organizations upload a fixed set of PDF documents per application. Once
//! every required title is present the application is submitted for review;
//! once the OSOAD has verified every file the organization becomes active. A
//! daily sweep demotes organizations whose activation and renewal have both
//! lapsed. The OSOAD can also broadcast announcements to organizations.

mod access;
pub mod announcement;
pub mod domain;
pub mod expiry;
pub mod memory;
pub mod notify;
pub mod repository;
pub mod requirements;
pub mod router;
pub mod seed;
pub mod service;
pub mod throttle;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use access::AccessDenied;
pub use announcement::{
    AnnouncementDetails, AnnouncementDraft, AnnouncementReceipt, AnnouncementSummary, Audience,
    RecipientView,
};
pub use domain::{
    AcademicYear, Actor, Announcement, AnnouncementId, AnnouncementRecipient, Application,
    ApplicationFile, ApplicationId, ApplicationStatus, ApplicationType, Feedback, FeedbackId,
    FileId, FileStatus, Organization, OrganizationId, OrganizationStatus, Role, UserId,
};
pub use expiry::{ExpiryPolicy, ExpiryScheduler, SweepReport};
pub use memory::InMemoryRegistrationRepository;
pub use notify::{Notice, NoticeKind, Notifier, NotifyError};
pub use repository::{RegistrationRepository, RepositoryError};
pub use requirements::{RequiredDocument, RequirementTable};
pub use router::{registration_router, ROLE_HEADER, USER_HEADER};
pub use seed::{OrganizationSeed, OrganizationSeedImporter, SeedImportError};
pub use service::{
    ApplicationStatusView, DocumentReceipt, DocumentUpload, FeedbackDraft, FileReview,
    OrganizationOverview, PreviousLogo, QueueEntry, RecomputeError, RegistrationError,
    RegistrationReceipt, RegistrationService, RequirementProgress, ReviewReceipt, StatusRefresh,
};
pub use throttle::{AttemptLimiter, Throttled};
pub use tracker::RecomputeOutcome;
