use std::path::{Path, PathBuf};

use tracing::info;

use crate::api::{ExportFormat, SchoolApi};
use crate::error::AppError;

pub fn default_file_name(format: ExportFormat) -> String {
    format!("alunos.{}", format.as_str())
}

/// Some backends return the CSV report JSON-encoded as a single string.
/// Such bodies are unwrapped back into raw CSV text.
pub fn normalize_body(format: ExportFormat, body: String) -> String {
    if format == ExportFormat::Csv && body.trim_start().starts_with('"') {
        if let Ok(csv) = serde_json::from_str::<String>(&body) {
            return csv;
        }
    }
    body
}

/// Downloads the student report and writes it to `target`, or to
/// `alunos.<format>` in the current directory.
pub async fn export_students(
    api: &dyn SchoolApi,
    format: ExportFormat,
    target: Option<&Path>,
) -> Result<PathBuf, AppError> {
    let body = api.export_students(format).await?;
    let body = normalize_body(format, body);

    let path = target
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_file_name(format)));
    tokio::fs::write(&path, body.as_bytes()).await?;

    info!("exported {} bytes to {}", body.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemorySchoolApi;

    #[test]
    fn json_encoded_csv_is_unwrapped() {
        let body = r#""id,name\n1,Ana\n""#.to_string();
        assert_eq!(normalize_body(ExportFormat::Csv, body), "id,name\n1,Ana\n");
    }

    #[test]
    fn raw_csv_and_json_pass_through() {
        let csv = "id,name\n1,Ana\n".to_string();
        assert_eq!(normalize_body(ExportFormat::Csv, csv.clone()), csv);

        let json = r#""just a string""#.to_string();
        assert_eq!(normalize_body(ExportFormat::Json, json.clone()), json);
    }

    #[test]
    fn file_name_follows_format() {
        assert_eq!(default_file_name(ExportFormat::Csv), "alunos.csv");
        assert_eq!(default_file_name(ExportFormat::Json), "alunos.json");
    }

    #[tokio::test]
    async fn writes_report_to_target() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = dir.path().join("relatorio.json");
        let api = InMemorySchoolApi::new();

        let path = export_students(&api, ExportFormat::Json, Some(&target))
            .await
            .expect("Failed to export");

        assert_eq!(path, target);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
