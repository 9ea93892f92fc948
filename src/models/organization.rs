//! Organization records and their tracked fields.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An organization as parsed from the source site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Organization {
    /// Site-assigned tag, unique per organization
    pub symbol: String,

    /// Display name
    pub name: String,

    /// Member count (absent when the site shows no number)
    pub member_count: Option<u32>,

    /// Primary language
    pub language: Option<String>,

    /// Recruitment status
    pub recruitment: Option<String>,

    /// Archetype (corporation, PMC, faith, ...)
    pub archetype: Option<String>,

    /// Commitment level
    pub commitment: Option<String>,

    /// Role-play flag as shown by the site
    pub role_play: Option<String>,

    /// Logo URL
    pub url_image: Option<String>,

    /// Organization page URL
    pub url: Option<String>,
}

impl Organization {
    /// Current value of a tracked field, rendered as text.
    pub fn field_value(&self, field: TrackedField) -> Option<String> {
        match field {
            TrackedField::Name => Some(self.name.clone()),
            TrackedField::MemberCount => self.member_count.map(|n| n.to_string()),
            TrackedField::Language => self.language.clone(),
            TrackedField::Recruitment => self.recruitment.clone(),
            TrackedField::Archetype => self.archetype.clone(),
            TrackedField::Commitment => self.commitment.clone(),
            TrackedField::RolePlay => self.role_play.clone(),
            TrackedField::UrlImage => self.url_image.clone(),
            TrackedField::Url => self.url.clone(),
        }
    }
}

/// Fields whose changes are recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Name,
    MemberCount,
    Language,
    Recruitment,
    Archetype,
    Commitment,
    RolePlay,
    UrlImage,
    Url,
}

impl TrackedField {
    /// All tracked fields in comparison order.
    pub const ALL: [TrackedField; 9] = [
        TrackedField::Name,
        TrackedField::MemberCount,
        TrackedField::Language,
        TrackedField::Recruitment,
        TrackedField::Archetype,
        TrackedField::Commitment,
        TrackedField::RolePlay,
        TrackedField::UrlImage,
        TrackedField::Url,
    ];

    /// Field name as stored in history and used as the snapshot column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Name => "name",
            TrackedField::MemberCount => "member_count",
            TrackedField::Language => "language",
            TrackedField::Recruitment => "recruitment",
            TrackedField::Archetype => "archetype",
            TrackedField::Commitment => "commitment",
            TrackedField::RolePlay => "role_play",
            TrackedField::UrlImage => "url_image",
            TrackedField::Url => "url",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the organization still exists on the source site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrgStatus {
    #[default]
    Active,
    Inactive,
}

impl OrgStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgStatus::Active => "active",
            OrgStatus::Inactive => "inactive",
        }
    }

    /// Parse a stored status; unknown values read as active.
    pub fn parse(s: &str) -> Self {
        match s {
            "inactive" => OrgStatus::Inactive,
            _ => OrgStatus::Active,
        }
    }
}

impl fmt::Display for OrgStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The latest known state of one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationSnapshot {
    pub org: Organization,
    pub status: OrgStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl OrganizationSnapshot {
    pub fn symbol(&self) -> &str {
        &self.org.symbol
    }

    pub fn is_active(&self) -> bool {
        self.status == OrgStatus::Active
    }
}

/// Parse a member count as shown by the site (`"1,234"`, `"12 members"`).
pub fn parse_member_count(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_renders_member_count() {
        let org = Organization {
            symbol: "ORG1".into(),
            name: "Alpha".into(),
            member_count: Some(100),
            ..Organization::default()
        };
        assert_eq!(
            org.field_value(TrackedField::MemberCount),
            Some("100".to_string())
        );
        assert_eq!(
            org.field_value(TrackedField::Name),
            Some("Alpha".to_string())
        );
        assert_eq!(org.field_value(TrackedField::Language), None);
    }

    #[test]
    fn test_parse_member_count() {
        assert_eq!(parse_member_count("1,234"), Some(1234));
        assert_eq!(parse_member_count(" 12 "), Some(12));
        assert_eq!(parse_member_count("n/a"), None);
        assert_eq!(parse_member_count(""), None);
    }

    #[test]
    fn test_status_round_trip_names() {
        assert_eq!(OrgStatus::parse("inactive"), OrgStatus::Inactive);
        assert_eq!(OrgStatus::parse("active"), OrgStatus::Active);
        assert_eq!(OrgStatus::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_tracked_field_names_are_unique() {
        let mut names: Vec<_> = TrackedField::ALL.iter().map(|f| f.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TrackedField::ALL.len());
    }
}
