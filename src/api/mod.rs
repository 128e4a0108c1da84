pub mod dto;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::AppError;
use crate::models::{
    ClassPayload, ClassRecord, EnrollmentRequest, FilterCriteria, StudentPayload, StudentRecord,
};

pub use memory::InMemorySchoolApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unsupported export format: {}", other)),
        }
    }
}

/// REST surface of the school backend. The backend owns persistence,
/// validation and capacity enforcement.
#[async_trait]
pub trait SchoolApi: Send + Sync {
    async fn list_classes(&self) -> Result<Vec<ClassRecord>, AppError>;
    async fn create_class(&self, class: &ClassPayload) -> Result<ClassRecord, AppError>;
    async fn update_class(&self, id: i64, class: &ClassPayload) -> Result<ClassRecord, AppError>;
    async fn list_students(&self, filters: &FilterCriteria) -> Result<Vec<StudentRecord>, AppError>;
    async fn create_student(&self, student: &StudentPayload) -> Result<StudentRecord, AppError>;
    async fn update_student(
        &self,
        id: i64,
        student: &StudentPayload,
    ) -> Result<StudentRecord, AppError>;
    async fn delete_student(&self, id: i64) -> Result<(), AppError>;
    async fn enroll(&self, request: &EnrollmentRequest) -> Result<(), AppError>;
    async fn export_students(&self, format: ExportFormat) -> Result<String, AppError>;
}

pub struct HttpSchoolApi {
    client: Client,
    base_url: Url,
}

impl HttpSchoolApi {
    pub fn new(config: &ClientConfig) -> Result<Self, AppError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Config(format!("invalid endpoint {}: {}", path, e)))
    }

    fn students_url(&self, filters: &FilterCriteria) -> Result<Url, AppError> {
        let mut url = self.endpoint("students")?;
        if !filters.is_empty() {
            let mut query = url.query_pairs_mut();
            let search = filters.search.trim();
            if !search.is_empty() {
                query.append_pair("search", search);
            }
            if let Some(class_id) = filters.class_id {
                query.append_pair("classId", &class_id.to_string());
            }
            if let Some(status) = filters.status {
                query.append_pair("status", if status { "true" } else { "false" });
            }
        }
        Ok(url)
    }

    /// Turns a non-success status into `AppError::Rejected`, keeping the
    /// server's `detail` when the body carries one.
    async fn check_status(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!("backend returned {}: {}", status, body);
        Err(AppError::Rejected {
            status,
            detail: dto::parse_detail(&body),
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SchoolApi for HttpSchoolApi {
    async fn list_classes(&self) -> Result<Vec<ClassRecord>, AppError> {
        let response = self.client.get(self.endpoint("classes")?).send().await?;
        Self::read_json(response).await
    }

    async fn create_class(&self, class: &ClassPayload) -> Result<ClassRecord, AppError> {
        let response = self
            .client
            .post(self.endpoint("classes")?)
            .json(class)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn update_class(&self, id: i64, class: &ClassPayload) -> Result<ClassRecord, AppError> {
        let response = self
            .client
            .put(self.endpoint(&format!("classes/{}", id))?)
            .json(class)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn list_students(
        &self,
        filters: &FilterCriteria,
    ) -> Result<Vec<StudentRecord>, AppError> {
        let url = self.students_url(filters)?;
        debug!("fetching students from {}", url);
        let response = self.client.get(url).send().await?;
        Self::read_json(response).await
    }

    async fn create_student(&self, student: &StudentPayload) -> Result<StudentRecord, AppError> {
        let response = self
            .client
            .post(self.endpoint("students")?)
            .json(student)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn update_student(
        &self,
        id: i64,
        student: &StudentPayload,
    ) -> Result<StudentRecord, AppError> {
        let response = self
            .client
            .put(self.endpoint(&format!("students/{}", id))?)
            .json(student)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn delete_student(&self, id: i64) -> Result<(), AppError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("students/{}", id))?)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn enroll(&self, request: &EnrollmentRequest) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.endpoint("enrollments")?)
            .json(request)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn export_students(&self, format: ExportFormat) -> Result<String, AppError> {
        let mut url = self.endpoint("reports/students")?;
        url.query_pairs_mut().append_pair("format", format.as_str());
        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.text().await?)
    }
}
