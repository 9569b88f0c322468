use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{ApplicationId, OrganizationId};

/// Outbound message hook; the mail sender lives behind this trait.
pub trait Notifier: Send + Sync {
    fn send(&self, notice: Notice) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    ApplicationSubmitted,
    ApplicationVerified,
    FileReviewed,
    OrganizationExpired,
    Announcement,
}

/// Rendered-message payload handed to the mail sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub organization_id: OrganizationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    pub details: BTreeMap<String, String>,
}

impl Notice {
    pub fn new(kind: NoticeKind, organization_id: OrganizationId) -> Self {
        Self {
            kind,
            organization_id,
            application_id: None,
            details: BTreeMap::new(),
        }
    }

    pub fn for_application(mut self, application_id: ApplicationId) -> Self {
        self.application_id = Some(application_id);
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// Send and log failures; notices never fail the caller.
pub(crate) fn dispatch<N: Notifier + ?Sized>(notifier: &N, notice: Notice) {
    let kind = notice.kind;
    let organization_id = notice.organization_id;
    if let Err(error) = notifier.send(notice) {
        warn!(?kind, %organization_id, %error, "notice delivery failed");
    }
}
