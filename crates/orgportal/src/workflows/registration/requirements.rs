use std::collections::HashSet;

use serde::Serialize;

use super::domain::ApplicationType;

/// Slot key of the logo document, the only file that can be carried forward.
pub const LOGO_KEY: &str = "logo_with_explanation";

/// One required document slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredDocument {
    /// URL-safe slot name.
    pub key: &'static str,
    /// Stored as `ApplicationFile::file_name`.
    pub title: &'static str,
}

const fn doc(key: &'static str, title: &'static str) -> RequiredDocument {
    RequiredDocument { key, title }
}

const NEW_DOCUMENTS: &[RequiredDocument] = &[
    doc("form_1a", "Form 1A - Application for Recognition"),
    doc("form_2", "Form 2 - Letter of Acceptance"),
    doc("form_3", "Form 3 - List of Programs/Projects/Activities"),
    doc("form_4", "Form 4 - List of Members"),
    doc("board_of_officers", "Board of Officers"),
    doc("constitution_and_bylaws", "Constitution and Bylaws"),
    doc(LOGO_KEY, "Logo with Explanation"),
];

const RENEWAL_DOCUMENTS: &[RequiredDocument] = &[
    doc("form_1b", "Form 1B - Application for Renewal of Recognition"),
    doc("form_2", "Form 2 - Letter of Acceptance"),
    doc("form_3", "Form 3 - List of Programs/Projects/Activities"),
    doc("form_4", "Form 4 - List of Members"),
    doc("board_of_officers", "Board of Officers"),
    doc(
        "updated_constitution_and_bylaws",
        "Updated Constitution and Bylaws",
    ),
    doc(
        "accomplishment_report",
        "Accomplishment Report and Documentation",
    ),
    doc(
        "financial_statement",
        "Financial Statement of the Previous Academic Year",
    ),
    doc(LOGO_KEY, "Logo with Explanation"),
];

/// Required documents per application type.
#[derive(Debug, Clone)]
pub struct RequirementTable {
    new: Vec<RequiredDocument>,
    renewal: Vec<RequiredDocument>,
}

impl RequirementTable {
    pub fn standard() -> Self {
        Self {
            new: NEW_DOCUMENTS.to_vec(),
            renewal: RENEWAL_DOCUMENTS.to_vec(),
        }
    }

    pub fn documents(&self, kind: ApplicationType) -> &[RequiredDocument] {
        match kind {
            ApplicationType::New => &self.new,
            ApplicationType::Renewal => &self.renewal,
        }
    }

    pub fn find(&self, kind: ApplicationType, key: &str) -> Option<&RequiredDocument> {
        self.documents(kind)
            .iter()
            .find(|document| document.key == key)
    }

    /// Required titles that are not among `uploaded`.
    pub fn missing<'a, I>(&self, kind: ApplicationType, uploaded: I) -> Vec<&RequiredDocument>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let uploaded: HashSet<&str> = uploaded.into_iter().collect();
        self.documents(kind)
            .iter()
            .filter(|document| !uploaded.contains(document.title))
            .collect()
    }

    /// Position of a file within the table; unknown names sort last.
    pub fn order_of(&self, kind: ApplicationType, file_name: &str) -> usize {
        self.documents(kind)
            .iter()
            .position(|document| document.title == file_name)
            .unwrap_or(usize::MAX)
    }
}

impl Default for RequirementTable {
    fn default() -> Self {
        Self::standard()
    }
}
