// Diagnostic records for failed portal runs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// Page URL at the time of the failure.
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct DiagnosticsWriter {
    report_path: PathBuf,
    page_path: PathBuf,
}

impl DiagnosticsWriter {
    pub fn new(report_path: PathBuf, page_path: PathBuf) -> Self {
        Self {
            report_path,
            page_path,
        }
    }

    /// Write the record, plus the page source when there is one. Write
    /// failures are logged and swallowed so the original error survives.
    pub async fn record(&self, record: &DiagnosticRecord, page_source: Option<&str>) {
        tracing::error!("{} (at {})", record.message, record.location);

        match serde_json::to_vec_pretty(record) {
            Ok(json) => write_or_warn(&self.report_path, &json).await,
            Err(e) => tracing::warn!("Could not serialize the diagnostic record: {}", e),
        }

        if let Some(source) = page_source {
            write_or_warn(&self.page_path, source.as_bytes()).await;
        }
    }
}

async fn write_or_warn(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            tracing::warn!("Could not create {}: {}", parent.display(), e);
            return;
        }
    }
    match tokio::fs::write(path, contents).await {
        Ok(()) => tracing::info!("Diagnostics written to {}", path.display()),
        Err(e) => tracing::warn!("Could not write {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_record_writes_report_and_page() {
        let dir = std::env::temp_dir().join(format!("quota-diagnostics-{}", std::process::id()));
        let writer = DiagnosticsWriter::new(dir.join("report.json"), dir.join("page.html"));
        let record = DiagnosticRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            message: "quota element not found".to_string(),
            location: "https://portal.example/home".to_string(),
        };

        writer.record(&record, Some("<html></html>")).await;

        let report: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.join("report.json")).unwrap()).unwrap();
        assert_eq!(report["message"], "quota element not found");
        assert_eq!(report["location"], "https://portal.example/home");
        assert_eq!(report["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(std::fs::read_to_string(dir.join("page.html")).unwrap(), "<html></html>");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
