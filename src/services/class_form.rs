use std::sync::Arc;

use tracing::info;

use crate::api::SchoolApi;
use crate::error::AppError;
use crate::models::{ClassPayload, ClassRecord};
use crate::services::form_mode::FormMode;

pub const INVALID_CLASS_MESSAGE: &str = "Nome e capacidade válidos são necessários";

/// Raw text of the class form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassFormValues {
    pub name: String,
    pub capacity: String,
}

impl ClassFormValues {
    pub fn validate(&self) -> Result<ClassPayload, AppError> {
        let name = self.name.trim();
        let capacity = self.capacity.trim().parse::<i64>().ok().filter(|c| *c >= 1);
        match capacity {
            Some(capacity) if !name.is_empty() => Ok(ClassPayload {
                name: name.to_string(),
                capacity,
            }),
            _ => Err(AppError::Validation(INVALID_CLASS_MESSAGE.to_string())),
        }
    }
}

pub struct ClassFormController {
    api: Arc<dyn SchoolApi>,
    editing_id: Option<i64>,
    pub values: ClassFormValues,
}

impl ClassFormController {
    pub fn new(api: Arc<dyn SchoolApi>) -> Self {
        Self {
            api,
            editing_id: None,
            values: ClassFormValues::default(),
        }
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.editing_id
    }

    pub fn begin_edit(&mut self, class: &ClassRecord) {
        self.editing_id = Some(class.id);
        self.values = ClassFormValues {
            name: class.name.clone(),
            capacity: class.capacity.to_string(),
        };
    }

    pub fn cancel(&mut self) {
        self.editing_id = None;
        self.values = ClassFormValues::default();
    }

    /// Validates locally, then creates or updates. The form is reset only
    /// when the server accepts the request.
    pub async fn submit(&mut self) -> Result<FormMode, AppError> {
        let payload = self.values.validate()?;
        let mode = FormMode::from_editing(self.editing_id);

        let saved = match mode {
            FormMode::Create => self.api.create_class(&payload).await?,
            FormMode::Update(id) => self.api.update_class(id, &payload).await?,
        };
        info!("class {} saved ({:?})", saved.id, mode);

        self.cancel();
        Ok(mode)
    }
}
