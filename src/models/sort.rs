use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::StudentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    BirthDate,
    Email,
    Active,
    ClassId,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::BirthDate => "birthDate",
            SortField::Email => "email",
            SortField::Active => "active",
            SortField::ClassId => "classId",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(SortField::Name),
            "birthDate" | "birth-date" | "birth_date" => Ok(SortField::BirthDate),
            "email" => Ok(SortField::Email),
            "active" | "status" => Ok(SortField::Active),
            "classId" | "class-id" | "class_id" | "class" => Ok(SortField::ClassId),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

/// Last sort chosen by the user. Persisted by the preference store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortPreference {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortPreference {
    fn default() -> Self {
        Self {
            field: SortField::Name,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortPreference {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Single-key comparison over `field`, reversed for descending order.
    /// Text fields compare case-insensitively; a missing value sorts before
    /// any present one.
    pub fn compare(&self, a: &StudentRecord, b: &StudentRecord) -> Ordering {
        let ordering = match self.field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::BirthDate => a.birth_date.cmp(&b.birth_date),
            SortField::Email => a
                .email
                .as_deref()
                .map(str::to_lowercase)
                .cmp(&b.email.as_deref().map(str::to_lowercase)),
            SortField::Active => a.active.cmp(&b.active),
            SortField::ClassId => a.class_id.cmp(&b.class_id),
        };

        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Stable sort: ties keep the order the server returned them in.
    pub fn sort(&self, students: &mut [StudentRecord]) {
        students.sort_by(|a, b| self.compare(a, b));
    }
}
