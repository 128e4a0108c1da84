use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::api::SchoolApi;
use crate::error::AppError;
use crate::models::{FilterCriteria, StudentPayload, StudentRecord};
use crate::services::form_mode::FormMode;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw text of the student form inputs. `active` comes from a select whose
/// only truthy value is `"true"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentFormValues {
    pub name: String,
    pub birth_date: String,
    pub email: String,
    pub class_id: String,
    pub active: String,
}

impl Default for StudentFormValues {
    fn default() -> Self {
        Self {
            name: String::new(),
            birth_date: String::new(),
            email: String::new(),
            class_id: String::new(),
            active: "true".to_string(),
        }
    }
}

impl StudentFormValues {
    pub fn from_record(student: &StudentRecord) -> Self {
        Self {
            name: student.name.clone(),
            birth_date: student.birth_date.format(DATE_FORMAT).to_string(),
            email: student.email.clone().unwrap_or_default(),
            class_id: student
                .class_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            active: student.active.to_string(),
        }
    }

    pub fn validate(&self) -> Result<StudentPayload, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Nome é obrigatório".to_string()));
        }

        let birth_date = self.birth_date.trim();
        if birth_date.is_empty() {
            return Err(AppError::Validation(
                "Data de nascimento é obrigatória".to_string(),
            ));
        }
        let birth_date = NaiveDate::parse_from_str(birth_date, DATE_FORMAT)
            .map_err(|_| AppError::Validation("Data de nascimento inválida".to_string()))?;

        let email = Some(self.email.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        let class_id = match self.class_id.trim() {
            "" => None,
            raw => Some(
                raw.parse::<i64>()
                    .map_err(|_| AppError::Validation("Turma inválida".to_string()))?,
            ),
        };

        Ok(StudentPayload {
            name: name.to_string(),
            birth_date,
            email,
            class_id,
            active: self.active.trim() == "true",
        })
    }
}

pub struct StudentFormController {
    api: Arc<dyn SchoolApi>,
    editing_id: Option<i64>,
    pub values: StudentFormValues,
}

impl StudentFormController {
    pub fn new(api: Arc<dyn SchoolApi>) -> Self {
        Self {
            api,
            editing_id: None,
            values: StudentFormValues::default(),
        }
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.editing_id
    }

    pub fn begin_edit(&mut self, student: &StudentRecord) {
        self.editing_id = Some(student.id);
        self.values = StudentFormValues::from_record(student);
    }

    /// Looks the student up in the unfiltered list and enters edit mode.
    pub async fn begin_edit_by_id(&mut self, id: i64) -> Result<(), AppError> {
        let students = self.api.list_students(&FilterCriteria::default()).await?;
        let student = students
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound("Aluno não encontrado".to_string()))?;
        self.begin_edit(student);
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.editing_id = None;
        self.values = StudentFormValues::default();
    }

    pub async fn submit(&mut self) -> Result<FormMode, AppError> {
        let payload = self.values.validate()?;
        let mode = FormMode::from_editing(self.editing_id);

        let saved = match mode {
            FormMode::Create => self.api.create_student(&payload).await?,
            FormMode::Update(id) => self.api.update_student(id, &payload).await?,
        };
        info!("student {} saved ({:?})", saved.id, mode);

        self.cancel();
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemorySchoolApi;

    fn filled() -> StudentFormValues {
        StudentFormValues {
            name: "Ana Souza".to_string(),
            birth_date: "2014-08-21".to_string(),
            email: String::new(),
            class_id: String::new(),
            active: "true".to_string(),
        }
    }

    #[test]
    fn optional_fields_become_none() {
        let payload = filled().validate().unwrap();
        assert_eq!(payload.email, None);
        assert_eq!(payload.class_id, None);
        assert!(payload.active);
        assert_eq!(payload.birth_date, NaiveDate::from_ymd_opt(2014, 8, 21).unwrap());
    }

    #[test]
    fn active_is_true_only_for_true() {
        for raw in ["false", "", "yes", "1"] {
            let values = StudentFormValues {
                active: raw.to_string(),
                ..filled()
            };
            assert!(!values.validate().unwrap().active, "{raw:?} should be inactive");
        }
    }

    #[test]
    fn reports_missing_or_bad_fields() {
        let cases = [
            (StudentFormValues { name: " ".into(), ..filled() }, "Nome é obrigatório"),
            (
                StudentFormValues { birth_date: "".into(), ..filled() },
                "Data de nascimento é obrigatória",
            ),
            (
                StudentFormValues { birth_date: "21/08/2014".into(), ..filled() },
                "Data de nascimento inválida",
            ),
            (StudentFormValues { class_id: "3A".into(), ..filled() }, "Turma inválida"),
        ];
        for (values, expected) in cases {
            assert_eq!(values.validate().unwrap_err().user_message("x"), expected);
        }
    }

    #[tokio::test]
    async fn empty_name_issues_no_request() {
        let api = Arc::new(InMemorySchoolApi::new());
        let mut form = StudentFormController::new(api.clone());
        form.values = StudentFormValues {
            name: String::new(),
            ..filled()
        };

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(api.request_count(), 0);
        assert_eq!(form.values.birth_date, "2014-08-21");
    }

    #[tokio::test]
    async fn edit_by_id_loads_record_and_updates() {
        let api = Arc::new(InMemorySchoolApi::new());
        let mut form = StudentFormController::new(api.clone());
        form.values = StudentFormValues {
            email: "ana@escola.br".to_string(),
            ..filled()
        };
        assert_eq!(form.submit().await.unwrap(), FormMode::Create);

        let id = api.students()[0].id;
        form.begin_edit_by_id(id).await.unwrap();
        assert_eq!(form.editing_id(), Some(id));
        assert_eq!(form.values.email, "ana@escola.br");

        form.values.active = "false".to_string();
        assert_eq!(form.submit().await.unwrap(), FormMode::Update(id));
        assert!(!api.students()[0].active);
        assert_eq!(form.values, StudentFormValues::default());
    }

    #[tokio::test]
    async fn edit_unknown_id_is_not_found() {
        let api = Arc::new(InMemorySchoolApi::new());
        let mut form = StudentFormController::new(api);
        let err = form.begin_edit_by_id(404).await.unwrap_err();
        assert_eq!(err.user_message("x"), "Aluno não encontrado");
        assert_eq!(form.editing_id(), None);
    }
}
