use crate::models::StudentRecord;

/// Transient listing filters. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: String,
    pub class_id: Option<i64>,
    pub status: Option<bool>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.class_id.is_none() && self.status.is_none()
    }

    /// Name substring match (case-insensitive), exact class id, exact status.
    pub fn matches(&self, student: &StudentRecord) -> bool {
        let search = self.search.trim();
        if !search.is_empty()
            && !student
                .name
                .to_lowercase()
                .contains(&search.to_lowercase())
        {
            return false;
        }
        if let Some(class_id) = self.class_id {
            if student.class_id != Some(class_id) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if student.active != status {
                return false;
            }
        }
        true
    }
}

/// Parses the status select value: "active"/"inactive" or "true"/"false".
/// An empty value clears the filter.
pub fn parse_status(value: &str) -> Result<Option<bool>, String> {
    match value.trim().to_lowercase().as_str() {
        "" | "all" => Ok(None),
        "active" | "ativo" | "true" => Ok(Some(true)),
        "inactive" | "inativo" | "false" => Ok(Some(false)),
        other => Err(format!("unknown status: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn student(name: &str, class_id: Option<i64>, active: bool) -> StudentRecord {
        StudentRecord {
            id: 1,
            name: name.to_string(),
            birth_date: NaiveDate::from_ymd_opt(2012, 3, 4).unwrap(),
            email: None,
            class_id,
            active,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = FilterCriteria::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&student("Ana", None, false)));
    }

    #[test]
    fn whitespace_search_counts_as_empty() {
        let filter = FilterCriteria {
            search: "   ".to_string(),
            ..Default::default()
        };
        assert!(filter.is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let filter = FilterCriteria {
            search: "LIV".to_string(),
            ..Default::default()
        };
        assert!(filter.matches(&student("Olivia", None, true)));
        assert!(!filter.matches(&student("Bruno", None, true)));
    }

    #[test]
    fn class_and_status_are_exact() {
        let filter = FilterCriteria {
            search: String::new(),
            class_id: Some(2),
            status: Some(true),
        };
        assert!(filter.matches(&student("Ana", Some(2), true)));
        assert!(!filter.matches(&student("Ana", Some(3), true)));
        assert!(!filter.matches(&student("Ana", None, true)));
        assert!(!filter.matches(&student("Ana", Some(2), false)));
    }

    #[test]
    fn parses_status_values() {
        assert_eq!(parse_status("").unwrap(), None);
        assert_eq!(parse_status("active").unwrap(), Some(true));
        assert_eq!(parse_status("false").unwrap(), Some(false));
        assert!(parse_status("maybe").is_err());
    }
}
