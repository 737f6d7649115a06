//! CSV artifact generation.
//!
//! Filenames combine the sanitized report name with a second-resolution
//! timestamp; the orchestrator serializes executions per tenant, so
//! differently-named reports can never collide here.

use chrono::Utc;
use std::path::{Path, PathBuf};

use reportflow_core::catalog::FieldDef;
use reportflow_core::error::{ReportFlowError, Result};

use crate::row::Row;

/// A written artifact: where it landed and how big it is.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Writes report rows as CSV files under a scoped directory.
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Serialize `rows` with a header built from `fields` labels, in schema
    /// order. Returns the file path and byte size.
    pub fn write(&self, report_name: &str, fields: &[FieldDef], rows: &[Row]) -> Result<Artifact> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ReportFlowError::Artifact(format!("Create artifacts dir: {e}")))?;

        let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
        let filename = format!("{}_{timestamp}.csv", sanitize_name(report_name));
        let path = self.dir.join(filename);

        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| ReportFlowError::Artifact(format!("Create CSV: {e}")))?;
        writer
            .write_record(fields.iter().map(|f| f.label))
            .map_err(|e| ReportFlowError::Artifact(format!("Write header: {e}")))?;
        for row in rows {
            writer
                .write_record(fields.iter().map(|f| row.value_or_empty(f.key)))
                .map_err(|e| ReportFlowError::Artifact(format!("Write row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| ReportFlowError::Artifact(format!("Flush CSV: {e}")))?;

        let size = std::fs::metadata(&path)
            .map_err(|e| ReportFlowError::Artifact(format!("Stat CSV: {e}")))?
            .len();
        tracing::debug!("💾 Wrote {} ({size} bytes)", path.display());
        Ok(Artifact { path, size })
    }
}

/// Delete an artifact, tolerating a file that is already gone.
pub fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("🧹 Removed artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("⚠️ Failed to remove artifact {}: {e}", path.display()),
    }
}

/// Lowercase alphanumerics, everything else to underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportflow_core::catalog::report_info;
    use reportflow_core::types::ReportType;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("reportflow-artifact-{tag}"))
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = temp_dir("roundtrip");
        let writer = ArtifactWriter::new(&dir);
        let fields = report_info(ReportType::Sales).fields;
        let rows = vec![
            Row::new()
                .with("date", "2026-04-01")
                .with("orderCount", "2")
                .with("totalSales", "150.50"),
        ];

        let artifact = writer.write("Daily Sales", fields, &rows).unwrap();
        assert!(artifact.path.exists());
        assert!(artifact.size > 0);

        let content = std::fs::read_to_string(&artifact.path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Orders,Total Sales,Average Order Value,Total Discounts,Total Tax,Net Sales"
        );
        // Unset columns serialize as empty cells in schema order.
        assert_eq!(lines.next().unwrap(), "2026-04-01,2,150.50,,,,");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_filename_sanitized() {
        let dir = temp_dir("sanitize");
        let writer = ArtifactWriter::new(&dir);
        let fields = report_info(ReportType::Sales).fields;

        let artifact = writer.write("Q2 Sales / EU!", fields, &[]).unwrap();
        let filename = artifact.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(filename.starts_with("q2_sales___eu__"), "{filename}");
        assert!(filename.ends_with(".csv"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_remove_artifact_tolerates_missing() {
        remove_artifact(Path::new("/nonexistent/reportflow.csv"));
    }
}
