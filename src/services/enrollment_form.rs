use std::sync::Arc;

use tracing::info;

use crate::api::SchoolApi;
use crate::error::AppError;
use crate::models::EnrollmentRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentFormValues {
    pub student_id: String,
    pub class_id: String,
}

impl EnrollmentFormValues {
    pub fn validate(&self) -> Result<EnrollmentRequest, AppError> {
        let student_id = self.student_id.trim().parse::<i64>();
        let class_id = self.class_id.trim().parse::<i64>();
        match (student_id, class_id) {
            (Ok(student_id), Ok(class_id)) => Ok(EnrollmentRequest {
                student_id,
                class_id,
            }),
            _ => Err(AppError::Validation(
                "Aluno e turma válidos são necessários".to_string(),
            )),
        }
    }
}

/// Create-only: an enrollment is a command, not a record the client edits.
/// Capacity and duplicate checks belong to the server.
pub struct EnrollmentFormController {
    api: Arc<dyn SchoolApi>,
    pub values: EnrollmentFormValues,
}

impl EnrollmentFormController {
    pub fn new(api: Arc<dyn SchoolApi>) -> Self {
        Self {
            api,
            values: EnrollmentFormValues::default(),
        }
    }

    pub fn reset(&mut self) {
        self.values = EnrollmentFormValues::default();
    }

    pub async fn submit(&mut self) -> Result<EnrollmentRequest, AppError> {
        let request = self.values.validate()?;
        self.api.enroll(&request).await?;
        info!(
            "student {} enrolled in class {}",
            request.student_id, request.class_id
        );
        self.reset();
        Ok(request)
    }
}
