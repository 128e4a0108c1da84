use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::api::{ExportFormat, SchoolApi};
use crate::error::AppError;
use crate::models::{
    ClassPayload, ClassRecord, EnrollmentRequest, FilterCriteria, StudentPayload, StudentRecord,
};

#[derive(Default)]
struct Store {
    classes: Vec<ClassRecord>,
    students: Vec<StudentRecord>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local stand-in for the REST backend, with the same capacity and
/// not-found rules. Counts every request it serves.
#[derive(Default)]
pub struct InMemorySchoolApi {
    store: Mutex<Store>,
    requests: AtomicUsize,
    fail_student_reads: AtomicBool,
}

fn rejected(status: StatusCode, detail: &str) -> AppError {
    AppError::Rejected {
        status,
        detail: Some(detail.to_string()),
    }
}

impl InMemorySchoolApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(classes: Vec<ClassRecord>, students: Vec<StudentRecord>) -> Self {
        let next_id = classes
            .iter()
            .map(|c| c.id)
            .chain(students.iter().map(|s| s.id))
            .max()
            .unwrap_or(0);
        Self {
            store: Mutex::new(Store {
                classes,
                students,
                next_id,
            }),
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Makes every student read fail with a 503 and no detail.
    pub fn set_fail_student_reads(&self, fail: bool) {
        self.fail_student_reads.store(fail, Ordering::SeqCst);
    }

    pub fn classes(&self) -> Vec<ClassRecord> {
        self.lock().classes.clone()
    }

    pub fn students(&self) -> Vec<StudentRecord> {
        self.lock().students.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SchoolApi for InMemorySchoolApi {
    async fn list_classes(&self) -> Result<Vec<ClassRecord>, AppError> {
        self.hit();
        Ok(self.classes())
    }

    async fn create_class(&self, class: &ClassPayload) -> Result<ClassRecord, AppError> {
        self.hit();
        let mut store = self.lock();
        if store.classes.iter().any(|c| c.name == class.name) {
            return Err(rejected(StatusCode::BAD_REQUEST, "Turma já existe"));
        }
        let record = ClassRecord {
            id: store.next_id(),
            name: class.name.clone(),
            capacity: class.capacity,
        };
        store.classes.push(record.clone());
        Ok(record)
    }

    async fn update_class(&self, id: i64, class: &ClassPayload) -> Result<ClassRecord, AppError> {
        self.hit();
        let mut store = self.lock();
        let record = store
            .classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| rejected(StatusCode::NOT_FOUND, "Turma não encontrada"))?;
        record.name = class.name.clone();
        record.capacity = class.capacity;
        Ok(record.clone())
    }

    async fn list_students(
        &self,
        filters: &FilterCriteria,
    ) -> Result<Vec<StudentRecord>, AppError> {
        self.hit();
        if self.fail_student_reads.load(Ordering::SeqCst) {
            return Err(AppError::Rejected {
                status: StatusCode::SERVICE_UNAVAILABLE,
                detail: None,
            });
        }
        Ok(self
            .lock()
            .students
            .iter()
            .filter(|s| filters.matches(s))
            .cloned()
            .collect())
    }

    async fn create_student(&self, student: &StudentPayload) -> Result<StudentRecord, AppError> {
        self.hit();
        let mut store = self.lock();
        let record = StudentRecord {
            id: store.next_id(),
            name: student.name.clone(),
            birth_date: student.birth_date,
            email: student.email.clone(),
            class_id: student.class_id,
            active: student.active,
        };
        store.students.push(record.clone());
        Ok(record)
    }

    async fn update_student(
        &self,
        id: i64,
        student: &StudentPayload,
    ) -> Result<StudentRecord, AppError> {
        self.hit();
        let mut store = self.lock();
        let record = store
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| rejected(StatusCode::NOT_FOUND, "Aluno não encontrado"))?;
        record.name = student.name.clone();
        record.birth_date = student.birth_date;
        record.email = student.email.clone();
        record.class_id = student.class_id;
        record.active = student.active;
        Ok(record.clone())
    }

    async fn delete_student(&self, id: i64) -> Result<(), AppError> {
        self.hit();
        let mut store = self.lock();
        let before = store.students.len();
        store.students.retain(|s| s.id != id);
        if store.students.len() == before {
            return Err(rejected(StatusCode::NOT_FOUND, "Aluno não encontrado"));
        }
        Ok(())
    }

    async fn enroll(&self, request: &EnrollmentRequest) -> Result<(), AppError> {
        self.hit();
        let mut store = self.lock();
        let capacity = store
            .classes
            .iter()
            .find(|c| c.id == request.class_id)
            .map(|c| c.capacity);
        if !store.students.iter().any(|s| s.id == request.student_id) {
            return Err(rejected(StatusCode::NOT_FOUND, "Aluno não encontrado"));
        }
        let capacity =
            capacity.ok_or_else(|| rejected(StatusCode::NOT_FOUND, "Turma não encontrada"))?;
        let occupied = store
            .students
            .iter()
            .filter(|s| s.class_id == Some(request.class_id))
            .count() as i64;
        if occupied >= capacity {
            return Err(rejected(StatusCode::BAD_REQUEST, "Turma está lotada"));
        }
        if let Some(student) = store
            .students
            .iter_mut()
            .find(|s| s.id == request.student_id)
        {
            student.class_id = Some(request.class_id);
            student.active = true;
        }
        Ok(())
    }

    async fn export_students(&self, format: ExportFormat) -> Result<String, AppError> {
        self.hit();
        let students = self.students();
        match format {
            ExportFormat::Json => Ok(serde_json::to_string(&students)?),
            ExportFormat::Csv => {
                let mut out = String::from("id,name,birthDate,email,active,classId\n");
                for s in &students {
                    out.push_str(&format!(
                        "{},{},{},{},{},{}\n",
                        s.id,
                        s.name,
                        s.birth_date,
                        s.email.as_deref().unwrap_or(""),
                        s.active,
                        s.class_id.map(|id| id.to_string()).unwrap_or_default()
                    ));
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn seeded() -> InMemorySchoolApi {
        InMemorySchoolApi::with_data(
            vec![ClassRecord {
                id: 1,
                name: "3A".to_string(),
                capacity: 1,
            }],
            vec![
                StudentRecord {
                    id: 10,
                    name: "Ana".to_string(),
                    birth_date: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(),
                    email: None,
                    class_id: None,
                    active: false,
                },
                StudentRecord {
                    id: 11,
                    name: "Bia".to_string(),
                    birth_date: NaiveDate::from_ymd_opt(2012, 1, 2).unwrap(),
                    email: None,
                    class_id: None,
                    active: true,
                },
            ],
        )
    }

    #[tokio::test]
    async fn enrollment_respects_capacity() {
        let api = seeded();
        api.enroll(&EnrollmentRequest {
            student_id: 10,
            class_id: 1,
        })
        .await
        .expect("first enrollment fits");

        let enrolled = api.students().into_iter().find(|s| s.id == 10).unwrap();
        assert_eq!(enrolled.class_id, Some(1));
        assert!(enrolled.active);

        let err = api
            .enroll(&EnrollmentRequest {
                student_id: 11,
                class_id: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(err.user_message("fallback"), "Turma está lotada");
    }

    #[tokio::test]
    async fn new_records_get_fresh_ids() {
        let api = seeded();
        let class = api
            .create_class(&ClassPayload {
                name: "5C".to_string(),
                capacity: 20,
            })
            .await
            .unwrap();
        assert_eq!(class.id, 12);
        assert_eq!(api.request_count(), 1);
    }
}
