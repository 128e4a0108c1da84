/// Whether a submit creates a record or updates the one being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(i64),
}

impl FormMode {
    pub fn from_editing(editing_id: Option<i64>) -> Self {
        match editing_id {
            Some(id) => FormMode::Update(id),
            None => FormMode::Create,
        }
    }
}
