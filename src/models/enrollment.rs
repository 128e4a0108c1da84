use serde::{Deserialize, Serialize};

/// Write-only command sent to `POST /enrollments`. The server owns the
/// capacity and duplicate checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub student_id: i64,
    pub class_id: i64,
}
