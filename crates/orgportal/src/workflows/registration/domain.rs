use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identity issued by the external user store.
    UserId
);
numeric_id!(OrganizationId);
numeric_id!(
    /// One registration or renewal cycle.
    ApplicationId
);
numeric_id!(FileId);
numeric_id!(FeedbackId);
numeric_id!(AnnouncementId);

/// Roles recognised by the portal; the user store decides who holds which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Office of Student Organizations and Activities Development.
    Osoad,
    OrganizationPresident,
    Applicant,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Osoad => "osoad",
            Role::OrganizationPresident => "organization_president",
            Role::Applicant => "applicant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "osoad" | "admin" => Some(Role::Osoad),
            "organization_president" | "president" => Some(Role::OrganizationPresident),
            "applicant" => Some(Role::Applicant),
            _ => None,
        }
    }

    pub const fn is_reviewer(self) -> bool {
        matches!(self, Role::Osoad)
    }
}

/// Authenticated caller as reported by the user store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    New,
    Renewal,
}

impl ApplicationType {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationType::New => "new",
            ApplicationType::Renewal => "renewal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Some(ApplicationType::New),
            "renewal" => Some(ApplicationType::Renewal),
            _ => None,
        }
    }
}

/// Lifecycle of an application. Variants are declared in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[serde(alias = "Incomplete")]
    Incomplete,
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Verified")]
    Verified,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Incomplete => "Incomplete",
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Verified => "Verified",
        }
    }
}

/// Review state of a single uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Verified")]
    Verified,
    #[serde(alias = "Needs Revision", alias = "needs revision")]
    NeedsRevision,
    #[serde(alias = "Rejected")]
    Rejected,
}

impl FileStatus {
    pub const fn label(self) -> &'static str {
        match self {
            FileStatus::Pending => "Pending",
            FileStatus::Verified => "Verified",
            FileStatus::NeedsRevision => "Needs Revision",
            FileStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    #[serde(alias = "Incomplete")]
    Incomplete,
    #[serde(alias = "Active")]
    Active,
    #[serde(alias = "Inactive")]
    Inactive,
}

impl OrganizationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OrganizationStatus::Incomplete => "Incomplete",
            OrganizationStatus::Active => "Active",
            OrganizationStatus::Inactive => "Inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "incomplete" => Some(OrganizationStatus::Incomplete),
            "active" => Some(OrganizationStatus::Active),
            "inactive" => Some(OrganizationStatus::Inactive),
            _ => None,
        }
    }
}

/// Rolling twelve month label such as `2025-2026`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AcademicYear {
    start: i32,
}

impl AcademicYear {
    pub const fn starting(start: i32) -> Self {
        Self { start }
    }

    /// Academic year a calendar date files under: the date's year onward.
    pub fn for_date(date: NaiveDate) -> Self {
        Self::starting(date.year())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self::for_date(now.date_naive())
    }

    pub const fn previous(self) -> Self {
        Self::starting(self.start.saturating_sub(1))
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, i64::from(self.start) + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("academic year must look like 2025-2026, found '{0}'")]
pub struct AcademicYearParseError(pub String);

impl FromStr for AcademicYear {
    type Err = AcademicYearParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || AcademicYearParseError(value.to_string());
        let (first, second) = value.trim().split_once('-').ok_or_else(invalid)?;
        let first: i32 = first.trim().parse().map_err(|_| invalid())?;
        let second: i32 = second.trim().parse().map_err(|_| invalid())?;
        if first.checked_add(1) != Some(second) {
            return Err(invalid());
        }
        Ok(Self::starting(first))
    }
}

impl Serialize for AcademicYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AcademicYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub owner: UserId,
    pub name: String,
    pub status: OrganizationStatus,
    pub activation_date: Option<DateTime<Utc>>,
    pub last_renewal_date: Option<DateTime<Utc>>,
    pub current_academic_year: Option<AcademicYear>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub organization_id: OrganizationId,
    pub kind: ApplicationType,
    pub academic_year: AcademicYear,
    pub status: ApplicationStatus,
    pub submission_date: Option<DateTime<Utc>>,
}

/// A document occupying one required slot of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFile {
    pub id: FileId,
    pub application_id: ApplicationId,
    /// Title of the required document this file satisfies.
    pub file_name: String,
    pub original_filename: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub status: FileStatus,
    pub submission_date: DateTime<Utc>,
}

/// Reviewer note attached to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub file_id: FileId,
    pub subject: String,
    pub message: String,
    pub date_sent: DateTime<Utc>,
    pub is_read: bool,
}

/// OSOAD broadcast addressed to one or more organizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub subject: String,
    pub message: String,
    pub date_sent: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRecipient {
    pub announcement_id: AnnouncementId,
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub is_read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn academic_year_follows_calendar_year_of_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date");
        let year = AcademicYear::for_date(date);
        assert_eq!(year.to_string(), "2025-2026");
        assert_eq!(year.previous().to_string(), "2024-2025");
    }

    #[test]
    fn academic_year_parse_rejects_non_consecutive_years() {
        assert_eq!(
            "2024-2025".parse::<AcademicYear>(),
            Ok(AcademicYear::starting(2024))
        );
        assert!("2024-2026".parse::<AcademicYear>().is_err());
        assert!("2024".parse::<AcademicYear>().is_err());
    }

    #[test]
    fn academic_year_at_the_edge_of_i32_is_rejected_not_overflowed() {
        assert_eq!(
            "2147483647-0".parse::<AcademicYear>(),
            Err(AcademicYearParseError("2147483647-0".to_string()))
        );
        assert!(serde_json::from_str::<AcademicYear>("\"2147483647--2147483648\"").is_err());

        let last = AcademicYear::starting(i32::MAX);
        assert_eq!(last.to_string(), "2147483647-2147483648");
        assert_eq!(
            AcademicYear::starting(i32::MIN).previous(),
            AcademicYear::starting(i32::MIN)
        );
    }

    #[test]
    fn statuses_accept_legacy_labels() {
        let status: FileStatus = serde_json::from_str("\"Needs Revision\"").expect("alias");
        assert_eq!(status, FileStatus::NeedsRevision);
        let status: FileStatus = serde_json::from_str("\"verified\"").expect("snake case");
        assert_eq!(status, FileStatus::Verified);
        assert!(ApplicationStatus::Incomplete < ApplicationStatus::Pending);
        assert!(ApplicationStatus::Pending < ApplicationStatus::Verified);
    }

    #[test]
    fn file_content_is_never_serialized() {
        let file = ApplicationFile {
            id: FileId(7),
            application_id: ApplicationId(3),
            file_name: "Board of Officers".to_string(),
            original_filename: "officers.pdf".to_string(),
            content: b"%PDF-1.7".to_vec(),
            status: FileStatus::Pending,
            submission_date: DateTime::<Utc>::from_timestamp(1_750_000_000, 0)
                .expect("valid timestamp"),
        };
        let value = serde_json::to_value(&file).expect("serializes");
        assert!(value.get("content").is_none());
        assert_eq!(value["status"], "pending");
    }
}
