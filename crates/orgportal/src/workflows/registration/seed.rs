//! CSV loader for organizations that already exist when the portal starts.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{AcademicYear, OrganizationStatus, UserId};

/// One parsed seed row, ready for `RegistrationService::seed_organization`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationSeed {
    pub owner: UserId,
    pub name: String,
    pub status: OrganizationStatus,
    pub activation_date: Option<DateTime<Utc>>,
    pub last_renewal_date: Option<DateTime<Utc>>,
    pub academic_year: AcademicYear,
}

pub struct OrganizationSeedImporter;

impl OrganizationSeedImporter {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Vec<OrganizationSeed>, SeedImportError> {
        let file = File::open(path.as_ref()).map_err(SeedImportError::Io)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<OrganizationSeed>, SeedImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut seeds = Vec::new();

        for (index, record) in csv_reader.deserialize::<SeedRow>().enumerate() {
            // Header is line 1.
            let line = index + 2;
            let row = record?;
            seeds.push(row.into_seed(line)?);
        }

        Ok(seeds)
    }
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    owner: u64,
    name: String,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    activation_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_renewal_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    current_academic_year: Option<String>,
}

impl SeedRow {
    fn into_seed(self, line: usize) -> Result<OrganizationSeed, SeedImportError> {
        let invalid = |field: &'static str, value: &str| SeedImportError::InvalidField {
            line,
            field,
            value: value.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name", ""));
        }
        let status =
            OrganizationStatus::parse(&self.status).ok_or_else(|| invalid("status", &self.status))?;
        let activation_date = self
            .activation_date
            .as_deref()
            .map(|raw| parse_timestamp(raw).ok_or_else(|| invalid("activation_date", raw)))
            .transpose()?;
        let last_renewal_date = self
            .last_renewal_date
            .as_deref()
            .map(|raw| parse_timestamp(raw).ok_or_else(|| invalid("last_renewal_date", raw)))
            .transpose()?;

        let academic_year = match self.current_academic_year.as_deref() {
            Some(raw) => raw
                .parse::<AcademicYear>()
                .map_err(|_| invalid("current_academic_year", raw))?,
            // Fall back to the most recent recorded date.
            None => last_renewal_date
                .or(activation_date)
                .map(AcademicYear::at)
                .ok_or_else(|| invalid("current_academic_year", ""))?,
        };

        Ok(OrganizationSeed {
            owner: UserId(self.owner),
            name: self.name,
            status,
            activation_date,
            last_renewal_date,
            academic_year,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, thiserror::Error)]
pub enum SeedImportError {
    #[error("failed to open seed file")]
    Io(#[source] std::io::Error),
    #[error("malformed seed csv")]
    Csv(#[from] csv::Error),
    #[error("line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "owner,name,status,activation_date,last_renewal_date,current_academic_year\n";

    #[test]
    fn parses_rows_with_optional_dates() {
        let csv = format!(
            "{HEADER}\
             7,Chess Guild,Active,2024-08-01,,2024-2025\n\
             8, Robotics Society ,inactive,2022-06-15T08:00:00Z,2023-06-20,\n\
             9,Film Circle,Incomplete,,,2025-2026\n"
        );

        let seeds = OrganizationSeedImporter::from_reader(csv.as_bytes()).expect("seed parses");
        assert_eq!(seeds.len(), 3);

        assert_eq!(seeds[0].owner, UserId(7));
        assert_eq!(seeds[0].status, OrganizationStatus::Active);
        assert_eq!(seeds[0].academic_year, AcademicYear::starting(2024));
        assert!(seeds[0].last_renewal_date.is_none());

        assert_eq!(seeds[1].name, "Robotics Society");
        assert_eq!(seeds[1].status, OrganizationStatus::Inactive);
        assert_eq!(seeds[1].academic_year, AcademicYear::starting(2023));
        assert_eq!(
            seeds[1].activation_date.map(|date| date.to_rfc3339()),
            Some("2022-06-15T08:00:00+00:00".to_string())
        );

        assert!(seeds[2].activation_date.is_none());
        assert_eq!(seeds[2].academic_year, AcademicYear::starting(2025));
    }

    #[test]
    fn reports_line_and_field_for_bad_values() {
        let csv = format!("{HEADER}7,Chess Guild,Active,2024-08-01,,2024-2025\n8,Debate,Dormant,,,2024-2025\n");

        match OrganizationSeedImporter::from_reader(csv.as_bytes()) {
            Err(SeedImportError::InvalidField { line, field, value }) => {
                assert_eq!(line, 3);
                assert_eq!(field, "status");
                assert_eq!(value, "Dormant");
            }
            other => panic!("expected invalid status, got {other:?}"),
        }
    }

    #[test]
    fn requires_an_academic_year_or_a_date_to_derive_it() {
        let csv = format!("{HEADER}7,Chess Guild,Incomplete,,,\n");
        assert!(matches!(
            OrganizationSeedImporter::from_reader(csv.as_bytes()),
            Err(SeedImportError::InvalidField {
                field: "current_academic_year",
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_academic_year_is_an_invalid_field() {
        let csv = format!("{HEADER}7,Chess Guild,Active,,,2147483647-0\n");
        match OrganizationSeedImporter::from_reader(csv.as_bytes()) {
            Err(SeedImportError::InvalidField { line, field, value }) => {
                assert_eq!(line, 2);
                assert_eq!(field, "current_academic_year");
                assert_eq!(value, "2147483647-0");
            }
            other => panic!("expected invalid academic year, got {other:?}"),
        }
    }

    #[test]
    fn malformed_owner_is_a_csv_error() {
        let csv = format!("{HEADER}seven,Chess Guild,Active,,,2024-2025\n");
        assert!(matches!(
            OrganizationSeedImporter::from_reader(csv.as_bytes()),
            Err(SeedImportError::Csv(_))
        ));
    }
}
