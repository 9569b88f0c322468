use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    AcademicYear, Announcement, AnnouncementId, AnnouncementRecipient, Application,
    ApplicationFile, ApplicationId, ApplicationStatus, ApplicationType, Feedback, FeedbackId,
    FileId, Organization, OrganizationId, UserId,
};
use super::repository::{RegistrationRepository, RepositoryError};
use super::tracker::StatusChange;

#[derive(Debug, Default)]
struct Store {
    organizations: BTreeMap<OrganizationId, Organization>,
    applications: BTreeMap<ApplicationId, Application>,
    files: BTreeMap<FileId, ApplicationFile>,
    feedback: BTreeMap<FeedbackId, Feedback>,
    announcements: BTreeMap<AnnouncementId, Announcement>,
    recipients: BTreeMap<AnnouncementId, Vec<AnnouncementRecipient>>,
}

/// Process-local store; one mutex serializes every write.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistrationRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryRegistrationRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl RegistrationRepository for InMemoryRegistrationRepository {
    fn insert_organization(
        &self,
        organization: Organization,
    ) -> Result<Organization, RepositoryError> {
        let mut store = self.lock()?;
        let taken = store.organizations.contains_key(&organization.id)
            || store
                .organizations
                .values()
                .any(|existing| existing.owner == organization.owner);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        store
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    fn update_organization(&self, organization: Organization) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        match store.organizations.get_mut(&organization.id) {
            Some(slot) => {
                *slot = organization;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        Ok(self.lock()?.organizations.get(id).cloned())
    }

    fn organization_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Option<Organization>, RepositoryError> {
        Ok(self
            .lock()?
            .organizations
            .values()
            .find(|organization| organization.owner == *owner)
            .cloned())
    }

    fn organizations(&self) -> Result<Vec<Organization>, RepositoryError> {
        Ok(self.lock()?.organizations.values().cloned().collect())
    }

    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut store = self.lock()?;
        if !store
            .organizations
            .contains_key(&application.organization_id)
        {
            return Err(RepositoryError::NotFound);
        }
        let duplicate = store.applications.values().any(|existing| {
            existing.id == application.id
                || (existing.organization_id == application.organization_id
                    && existing.kind == application.kind
                    && existing.academic_year == application.academic_year)
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        store.applications.insert(application.id, application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn applications_for(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .filter(|application| application.organization_id == *organization_id)
            .cloned()
            .collect())
    }

    fn find_application(
        &self,
        organization_id: &OrganizationId,
        kind: Option<ApplicationType>,
        academic_year: AcademicYear,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .find(|application| {
                application.organization_id == *organization_id
                    && application.academic_year == academic_year
                    && kind.map_or(true, |kind| application.kind == kind)
            })
            .cloned())
    }

    fn applications_with_status(
        &self,
        kind: Option<ApplicationType>,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .filter(|application| {
                application.status == status && kind.map_or(true, |kind| application.kind == kind)
            })
            .cloned()
            .collect())
    }

    fn save_file(&self, file: ApplicationFile) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        if !store.applications.contains_key(&file.application_id) {
            return Err(RepositoryError::NotFound);
        }
        store.files.insert(file.id, file);
        Ok(())
    }

    fn fetch_file(&self, id: &FileId) -> Result<Option<ApplicationFile>, RepositoryError> {
        Ok(self.lock()?.files.get(id).cloned())
    }

    fn files_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<ApplicationFile>, RepositoryError> {
        Ok(self
            .lock()?
            .files
            .values()
            .filter(|file| file.application_id == *application_id)
            .cloned()
            .collect())
    }

    fn file_named(
        &self,
        application_id: &ApplicationId,
        file_name: &str,
    ) -> Result<Option<ApplicationFile>, RepositoryError> {
        Ok(self
            .lock()?
            .files
            .values()
            .find(|file| file.application_id == *application_id && file.file_name == file_name)
            .cloned())
    }

    fn insert_feedback(&self, feedback: Feedback) -> Result<Feedback, RepositoryError> {
        let mut store = self.lock()?;
        if store.feedback.contains_key(&feedback.id) {
            return Err(RepositoryError::Conflict);
        }
        if !store.files.contains_key(&feedback.file_id) {
            return Err(RepositoryError::NotFound);
        }
        store.feedback.insert(feedback.id, feedback.clone());
        Ok(feedback)
    }

    fn fetch_feedback(&self, id: &FeedbackId) -> Result<Option<Feedback>, RepositoryError> {
        Ok(self.lock()?.feedback.get(id).cloned())
    }

    fn update_feedback(&self, feedback: Feedback) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        match store.feedback.get_mut(&feedback.id) {
            Some(slot) => {
                *slot = feedback;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn feedback_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Feedback>, RepositoryError> {
        let store = self.lock()?;
        Ok(store
            .feedback
            .values()
            .filter(|feedback| {
                store
                    .files
                    .get(&feedback.file_id)
                    .is_some_and(|file| file.application_id == *application_id)
            })
            .cloned()
            .collect())
    }

    fn commit_status_change(&self, change: StatusChange) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        if !store.applications.contains_key(&change.application.id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(organization) = &change.organization {
            if !store.organizations.contains_key(&organization.id) {
                return Err(RepositoryError::NotFound);
            }
        }

        store
            .applications
            .insert(change.application.id, change.application);
        if let Some(organization) = change.organization {
            store.organizations.insert(organization.id, organization);
        }
        Ok(())
    }

    fn insert_announcement(
        &self,
        announcement: Announcement,
        recipients: Vec<AnnouncementRecipient>,
    ) -> Result<Announcement, RepositoryError> {
        let mut store = self.lock()?;
        if store.announcements.contains_key(&announcement.id) {
            return Err(RepositoryError::Conflict);
        }
        let unknown = recipients
            .iter()
            .any(|recipient| !store.organizations.contains_key(&recipient.organization_id));
        if unknown {
            return Err(RepositoryError::NotFound);
        }
        store.recipients.insert(announcement.id, recipients);
        store
            .announcements
            .insert(announcement.id, announcement.clone());
        Ok(announcement)
    }

    fn announcements(&self) -> Result<Vec<Announcement>, RepositoryError> {
        Ok(self.lock()?.announcements.values().cloned().collect())
    }

    fn fetch_announcement(
        &self,
        id: &AnnouncementId,
    ) -> Result<Option<Announcement>, RepositoryError> {
        Ok(self.lock()?.announcements.get(id).cloned())
    }

    fn announcement_recipients(
        &self,
        id: &AnnouncementId,
    ) -> Result<Vec<AnnouncementRecipient>, RepositoryError> {
        Ok(self
            .lock()?
            .recipients
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn delete_announcement(&self, id: &AnnouncementId) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        if store.announcements.remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        store.recipients.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::registration::domain::OrganizationStatus;

    fn organization(id: u64, owner: u64) -> Organization {
        Organization {
            id: OrganizationId(id),
            owner: UserId(owner),
            name: format!("Org {id}"),
            status: OrganizationStatus::Incomplete,
            activation_date: None,
            last_renewal_date: None,
            current_academic_year: None,
        }
    }

    fn application(id: u64, organization: u64, kind: ApplicationType) -> Application {
        Application {
            id: ApplicationId(id),
            organization_id: OrganizationId(organization),
            kind,
            academic_year: AcademicYear::starting(2025),
            status: ApplicationStatus::Incomplete,
            submission_date: None,
        }
    }

    #[test]
    fn one_organization_per_owner() {
        let repository = InMemoryRegistrationRepository::default();
        repository
            .insert_organization(organization(1, 10))
            .expect("first insert");
        match repository.insert_organization(organization(2, 10)) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn one_application_per_type_and_year() {
        let repository = InMemoryRegistrationRepository::default();
        repository
            .insert_organization(organization(1, 10))
            .expect("organization");
        repository
            .insert_application(application(1, 1, ApplicationType::New))
            .expect("new application");
        repository
            .insert_application(application(2, 1, ApplicationType::Renewal))
            .expect("renewal application");
        assert!(matches!(
            repository.insert_application(application(3, 1, ApplicationType::Renewal)),
            Err(RepositoryError::Conflict)
        ));
        let found = repository
            .find_application(
                &OrganizationId(1),
                Some(ApplicationType::Renewal),
                AcademicYear::starting(2025),
            )
            .expect("query")
            .expect("renewal present");
        assert_eq!(found.id, ApplicationId(2));
    }

    #[test]
    fn status_change_for_unknown_organization_writes_nothing() {
        let repository = InMemoryRegistrationRepository::default();
        repository
            .insert_organization(organization(1, 10))
            .expect("organization");
        repository
            .insert_application(application(1, 1, ApplicationType::New))
            .expect("application");

        let mut pending = application(1, 1, ApplicationType::New);
        pending.status = ApplicationStatus::Pending;
        let result = repository.commit_status_change(StatusChange {
            application: pending,
            organization: Some(organization(99, 11)),
        });

        assert!(matches!(result, Err(RepositoryError::NotFound)));
        let stored = repository
            .fetch_application(&ApplicationId(1))
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.status, ApplicationStatus::Incomplete);
    }

    #[test]
    fn deleting_an_announcement_drops_its_recipients() {
        let repository = InMemoryRegistrationRepository::default();
        repository
            .insert_organization(organization(1, 10))
            .expect("organization");
        let announcement = Announcement {
            id: AnnouncementId(5),
            subject: "Orientation".to_string(),
            message: "Bring your officers.".to_string(),
            date_sent: chrono::DateTime::<chrono::Utc>::from_timestamp(1_750_000_000, 0)
                .expect("valid timestamp"),
        };
        let recipient = AnnouncementRecipient {
            announcement_id: announcement.id,
            organization_id: OrganizationId(1),
            user_id: UserId(10),
            is_read: false,
        };
        repository
            .insert_announcement(announcement.clone(), vec![recipient])
            .expect("announcement stored");
        assert_eq!(
            repository
                .announcement_recipients(&announcement.id)
                .expect("recipients")
                .len(),
            1
        );

        repository
            .delete_announcement(&announcement.id)
            .expect("deleted");
        assert!(repository
            .fetch_announcement(&announcement.id)
            .expect("fetch")
            .is_none());
        assert!(repository
            .announcement_recipients(&announcement.id)
            .expect("recipients")
            .is_empty());
        assert!(matches!(
            repository.delete_announcement(&announcement.id),
            Err(RepositoryError::NotFound)
        ));
    }
}
