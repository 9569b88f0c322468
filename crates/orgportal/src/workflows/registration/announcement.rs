use std::collections::BTreeSet;
use std::sync::atomic::AtomicU64;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::access;
use super::domain::{
    Actor, Announcement, AnnouncementId, AnnouncementRecipient, OrganizationId, UserId,
};
use super::notify::{self, Notice, NoticeKind, Notifier};
use super::repository::RegistrationRepository;
use super::service::{next_id, RegistrationError, RegistrationService};

static ANNOUNCEMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Who an announcement goes to: `"all"` or `{"organizations": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    All,
    Organizations(Vec<OrganizationId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnnouncementDraft {
    pub subject: String,
    pub message: String,
    pub audience: Audience,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnouncementReceipt {
    pub announcement: Announcement,
    pub recipients: Vec<AnnouncementRecipient>,
}

/// History row: the announcement without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnouncementSummary {
    pub id: AnnouncementId,
    pub subject: String,
    pub date_sent: DateTime<Utc>,
    pub recipient_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnouncementDetails {
    pub announcement: Announcement,
    pub recipient_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientView {
    pub organization_id: OrganizationId,
    pub organization_name: String,
    pub user_id: UserId,
    pub is_read: bool,
}

impl<R, N> RegistrationService<R, N>
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    /// Record an announcement and notify every addressed organization.
    ///
    /// Selected ids that match no organization are skipped.
    pub fn send_announcement(
        &self,
        actor: &Actor,
        draft: AnnouncementDraft,
        now: DateTime<Utc>,
    ) -> Result<AnnouncementReceipt, RegistrationError> {
        access::require_reviewer(actor)?;
        let subject = draft.subject.trim();
        if subject.is_empty() {
            return Err(RegistrationError::Validation(
                "subject is required".to_string(),
            ));
        }
        let message = draft.message.trim();
        if message.is_empty() {
            return Err(RegistrationError::Validation(
                "message is required".to_string(),
            ));
        }

        let organizations = self.repository.organizations()?;
        let addressed: Vec<_> = match &draft.audience {
            Audience::All => organizations,
            Audience::Organizations(ids) => {
                if ids.is_empty() {
                    return Err(RegistrationError::Validation(
                        "select at least one organization".to_string(),
                    ));
                }
                let ids: BTreeSet<&OrganizationId> = ids.iter().collect();
                organizations
                    .into_iter()
                    .filter(|organization| ids.contains(&organization.id))
                    .collect()
            }
        };

        let id = AnnouncementId(next_id(&ANNOUNCEMENT_SEQUENCE));
        let recipients: Vec<AnnouncementRecipient> = addressed
            .iter()
            .map(|organization| AnnouncementRecipient {
                announcement_id: id,
                organization_id: organization.id,
                user_id: organization.owner,
                is_read: false,
            })
            .collect();
        let announcement = self.repository.insert_announcement(
            Announcement {
                id,
                subject: subject.to_string(),
                message: message.to_string(),
                date_sent: now,
            },
            recipients.clone(),
        )?;

        info!(
            announcement_id = %announcement.id,
            recipients = recipients.len(),
            "announcement sent"
        );
        for recipient in &recipients {
            notify::dispatch(
                self.notifier.as_ref(),
                Notice::new(NoticeKind::Announcement, recipient.organization_id)
                    .detail("announcement_id", announcement.id.to_string())
                    .detail("subject", announcement.subject.clone())
                    .detail("message", announcement.message.clone()),
            );
        }

        Ok(AnnouncementReceipt {
            announcement,
            recipients,
        })
    }

    /// Sent announcements, newest first.
    pub fn announcements(&self, actor: &Actor) -> Result<Vec<AnnouncementSummary>, RegistrationError> {
        access::require_reviewer(actor)?;
        let mut announcements = self.repository.announcements()?;
        announcements.sort_by(|a, b| b.date_sent.cmp(&a.date_sent).then(b.id.cmp(&a.id)));

        announcements
            .into_iter()
            .map(|announcement| -> Result<AnnouncementSummary, RegistrationError> {
                let recipient_count = self
                    .repository
                    .announcement_recipients(&announcement.id)?
                    .len();
                Ok(AnnouncementSummary {
                    id: announcement.id,
                    subject: announcement.subject,
                    date_sent: announcement.date_sent,
                    recipient_count,
                })
            })
            .collect()
    }

    pub fn announcement_details(
        &self,
        actor: &Actor,
        id: &AnnouncementId,
    ) -> Result<AnnouncementDetails, RegistrationError> {
        access::require_reviewer(actor)?;
        let announcement = self.announcement(id)?;
        let recipient_count = self.repository.announcement_recipients(id)?.len();
        Ok(AnnouncementDetails {
            announcement,
            recipient_count,
        })
    }

    /// Recipients ordered by organization name.
    pub fn announcement_recipients(
        &self,
        actor: &Actor,
        id: &AnnouncementId,
    ) -> Result<Vec<RecipientView>, RegistrationError> {
        access::require_reviewer(actor)?;
        self.announcement(id)?;

        let mut recipients = self
            .repository
            .announcement_recipients(id)?
            .into_iter()
            .map(|recipient| -> Result<RecipientView, RegistrationError> {
                let organization_name = self
                    .repository
                    .fetch_organization(&recipient.organization_id)?
                    .map(|organization| organization.name)
                    .unwrap_or_default();
                Ok(RecipientView {
                    organization_id: recipient.organization_id,
                    organization_name,
                    user_id: recipient.user_id,
                    is_read: recipient.is_read,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        recipients.sort_by(|a, b| {
            a.organization_name
                .cmp(&b.organization_name)
                .then(a.organization_id.cmp(&b.organization_id))
        });
        Ok(recipients)
    }

    pub fn delete_announcement(
        &self,
        actor: &Actor,
        id: &AnnouncementId,
    ) -> Result<(), RegistrationError> {
        access::require_reviewer(actor)?;
        self.announcement(id)?;
        self.repository.delete_announcement(id)?;
        info!(announcement_id = %id, "announcement deleted");
        Ok(())
    }

    fn announcement(&self, id: &AnnouncementId) -> Result<Announcement, RegistrationError> {
        self.repository
            .fetch_announcement(id)?
            .ok_or(RegistrationError::NotFound("announcement"))
    }
}
