//! Completeness gate and status transitions for applications.
//!
//! An application is complete once every required document title for its type
//! has a file, and verified once it is complete and every file it holds has
//! been marked `Verified`. `plan_transition` only ever moves an application
//! forward along Incomplete -> Pending -> Verified.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Application, ApplicationFile, ApplicationStatus, ApplicationType, FileStatus, Organization,
    OrganizationStatus,
};
use super::requirements::RequirementTable;

/// Aggregated view of an application's files against its requirement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completeness {
    pub all_required_uploaded: bool,
    pub all_verified: bool,
}

impl Completeness {
    pub fn assess(
        table: &RequirementTable,
        kind: ApplicationType,
        files: &[ApplicationFile],
    ) -> Self {
        let uploaded: HashSet<&str> = files.iter().map(|file| file.file_name.as_str()).collect();
        let all_required_uploaded = table
            .documents(kind)
            .iter()
            .all(|document| uploaded.contains(document.title));
        // No files means nothing has been verified yet.
        let all_verified =
            !files.is_empty() && files.iter().all(|file| file.status == FileStatus::Verified);

        Self {
            all_required_uploaded,
            all_verified,
        }
    }
}

/// Writes produced by one transition; committed together by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub application: Application,
    pub organization: Option<Organization>,
}

/// Result of a recomputation as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecomputeOutcome {
    pub previous: ApplicationStatus,
    pub current: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_status: Option<OrganizationStatus>,
}

impl RecomputeOutcome {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Apply the transition rules in order; `None` when nothing changes.
pub fn plan_transition(
    application: &Application,
    organization: &Organization,
    completeness: Completeness,
    now: DateTime<Utc>,
) -> Option<StatusChange> {
    match application.status {
        ApplicationStatus::Incomplete if completeness.all_required_uploaded => {
            let mut application = application.clone();
            application.status = ApplicationStatus::Pending;
            application.submission_date = Some(now);
            Some(StatusChange {
                application,
                organization: None,
            })
        }
        ApplicationStatus::Pending
            if completeness.all_required_uploaded && completeness.all_verified =>
        {
            let mut verified = application.clone();
            verified.status = ApplicationStatus::Verified;
            let organization = activate_organization(&verified, organization, now);
            Some(StatusChange {
                application: verified,
                organization,
            })
        }
        _ => None,
    }
}

fn activate_organization(
    application: &Application,
    organization: &Organization,
    now: DateTime<Utc>,
) -> Option<Organization> {
    let mut updated = organization.clone();
    match application.kind {
        ApplicationType::New => {
            if updated.status == OrganizationStatus::Incomplete {
                updated.status = OrganizationStatus::Active;
                updated.activation_date.get_or_insert(now);
            }
        }
        ApplicationType::Renewal => {
            updated.status = OrganizationStatus::Active;
            updated.activation_date = Some(now);
            updated.last_renewal_date = Some(now);
        }
    }
    if updated.current_academic_year < Some(application.academic_year) {
        updated.current_academic_year = Some(application.academic_year);
    }

    (updated != *organization).then_some(updated)
}
