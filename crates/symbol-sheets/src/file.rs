//! Local file list source: one symbol per line.

use crate::error::{Result, SheetsError};
use async_trait::async_trait;
use notional_deploy_core::{OutcomeRow, SymbolSource};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Newline-delimited symbol list in a local file.
///
/// Clearing truncates the file. Outcomes go to an optional tab-separated log.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    log_path: Option<PathBuf>,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            log_path: None,
        }
    }

    /// Appends outcome rows to `log_path`.
    #[must_use]
    pub fn with_outcome_log(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(log_path.into());
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_lines(&self) -> Result<Vec<String>> {
        let text = fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SheetsError::NotFound(self.path.display().to_string())
            } else {
                SheetsError::Io(e)
            }
        })?;
        Ok(text.lines().map(str::to_string).collect())
    }

    async fn truncate(&self) -> Result<()> {
        fs::write(&self.path, b"").await?;
        info!(path = %self.path.display(), "Cleared symbol file");
        Ok(())
    }

    async fn append_log(&self, log_path: &Path, rows: &[OutcomeRow]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(Vec::new());
        for row in rows {
            writer.write_record([row.symbol.as_str(), row.status.as_str()])?;
        }
        let out = writer
            .into_inner()
            .map_err(|e| SheetsError::Io(e.into_error()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .await?;
        file.write_all(&out).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SymbolSource for FileSource {
    async fn read_symbols(&self) -> notional_deploy_core::Result<Vec<String>> {
        Ok(self.read_lines().await?)
    }

    async fn clear_symbols(&self) -> notional_deploy_core::Result<()> {
        Ok(self.truncate().await?)
    }

    async fn record_outcomes(&self, rows: &[OutcomeRow]) -> notional_deploy_core::Result<()> {
        match &self.log_path {
            Some(log_path) if !rows.is_empty() => Ok(self.append_log(log_path, rows).await?),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notional_deploy_core::ServiceError;
    use tempfile::TempDir;

    fn row(symbol: &str, status: &str) -> OutcomeRow {
        OutcomeRow {
            symbol: symbol.to_string(),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn reads_lines_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("symbols.txt");
        std::fs::write(&path, "Ticker\naapl\n\n msft \n").unwrap();

        let source = FileSource::new(&path);
        let lines = source.read_symbols().await.unwrap();
        assert_eq!(lines, vec!["Ticker", "aapl", "", " msft "]);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let source = FileSource::new(dir.path().join("absent.txt"));
        let err = source.read_symbols().await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn clear_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("symbols.txt");
        std::fs::write(&path, "AAPL\nMSFT\n").unwrap();

        let source = FileSource::new(&path);
        source.clear_symbols().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        assert!(source.read_symbols().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outcomes_append_across_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("symbols.txt");
        let log = dir.path().join("outcomes.tsv");
        std::fs::write(&path, "AAPL\n").unwrap();

        let source = FileSource::new(&path).with_outcome_log(&log);
        source.record_outcomes(&[row("AAPL", "SKIPPED (no fill)")]).await.unwrap();
        source
            .record_outcomes(&[row("MSFT", "ERROR: no price available")])
            .await
            .unwrap();

        let text = std::fs::read_to_string(&log).unwrap();
        assert_eq!(text, "AAPL\tSKIPPED (no fill)\nMSFT\tERROR: no price available\n");
    }

    #[tokio::test]
    async fn multiline_status_stays_one_record() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("outcomes.tsv");
        let status = "ERROR: api error (502): <html>\nBad\tGateway</html>";

        let source = FileSource::new(dir.path().join("symbols.txt")).with_outcome_log(&log);
        source.record_outcomes(&[row("AAPL", status)]).await.unwrap();
        source.record_outcomes(&[row("MSFT", "SKIPPED (no fill)")]).await.unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(&log)
            .unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "AAPL");
        assert_eq!(&records[0][1], status);
        assert_eq!(&records[1][1], "SKIPPED (no fill)");
    }

    #[tokio::test]
    async fn outcomes_without_log_are_dropped() {
        let dir = TempDir::new().unwrap();
        let source = FileSource::new(dir.path().join("symbols.txt"));
        source.record_outcomes(&[row("AAPL", "x")]).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
