//! Google Sheets list source.
//!
//! The symbol list lives in one column of a worksheet. Outcomes are written
//! as `[symbol, status]` rows into the log columns of the same worksheet.

use crate::auth::{ServiceAccountKey, TokenProvider};
use crate::error::{Result, SheetsError};
use async_trait::async_trait;
use notional_deploy_core::{OutcomeRow, SheetConfig, SymbolSource};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const SHEETS_URL: &str = "https://sheets.googleapis.com";
const DRIVE_URL: &str = "https://www.googleapis.com";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const FALLBACK_CLEAR_ROWS: usize = 1000;
/// Row 1 holds the column headers.
const LOG_FIRST_ROW: u32 = 2;

// =============================================================================
// Configuration
// =============================================================================

/// Endpoint and transport settings for the Sheets source.
#[derive(Debug, Clone)]
pub struct SheetsClientConfig {
    pub sheets_url: String,
    pub drive_url: String,
    pub timeout_secs: u64,
}

impl Default for SheetsClientConfig {
    fn default() -> Self {
        Self {
            sheets_url: SHEETS_URL.to_string(),
            drive_url: DRIVE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SheetsClientConfig {
    /// Points both Sheets and Drive at one URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.sheets_url = url.clone();
        self.drive_url = url;
        self
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueWrite {
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct BatchClear<'a> {
    ranges: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct DriveFiles {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

// =============================================================================
// SheetsSource
// =============================================================================

/// Symbol list backed by a Google Sheets worksheet.
#[derive(Debug)]
pub struct SheetsSource {
    config: SheetsClientConfig,
    sheet: SheetConfig,
    http: Client,
    tokens: TokenProvider,
    spreadsheet_id: OnceCell<String>,
}

impl SheetsSource {
    /// Creates a source for `sheet` authenticated as `key`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: SheetsClientConfig, sheet: SheetConfig, key: ServiceAccountKey) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SheetsError::Network(format!("failed to build HTTP client: {e}")))?;

        let spreadsheet_id = match sheet.sheet_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => OnceCell::new_with(Some(id.to_string())),
            _ => OnceCell::new(),
        };

        Ok(Self {
            tokens: TokenProvider::new(key, http.clone()),
            config,
            sheet,
            http,
            spreadsheet_id,
        })
    }

    /// Creates a source with the service account read from `GOOGLE_CREDS_JSON`.
    ///
    /// # Errors
    /// Returns `Credentials` if the variable is missing or unparsable.
    pub fn from_env(sheet: SheetConfig) -> Result<Self> {
        Self::new(SheetsClientConfig::default(), sheet, ServiceAccountKey::from_env()?)
    }

    /// A1 range inside the configured worksheet, e.g. `'Alpaca Integration'!A:A`.
    fn range(&self, columns: &str) -> String {
        format!("'{}'!{}", self.sheet.worksheet.replace('\'', "''"), columns)
    }

    fn symbol_range(&self) -> String {
        let column = &self.sheet.symbol_column;
        if column.contains(':') {
            self.range(column)
        } else {
            self.range(&format!("{column}:{column}"))
        }
    }

    /// Outcome range anchored below the header row, e.g. `C:D` becomes `C2:D`.
    fn log_range(&self) -> String {
        let columns = self.sheet.log_columns.as_str();
        let (first, last) = columns.split_once(':').unwrap_or((columns, columns));
        if first.chars().any(|c| c.is_ascii_digit()) {
            self.range(columns)
        } else {
            self.range(&format!("{first}{LOG_FIRST_ROW}:{last}"))
        }
    }

    /// Resolves the spreadsheet id, searching Drive by name when no id is configured.
    async fn spreadsheet_id(&self) -> Result<&str> {
        let id = self
            .spreadsheet_id
            .get_or_try_init(|| async {
                let name = &self.sheet.sheet_name;
                let query = format!(
                    "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
                    name.replace('\\', "\\\\").replace('\'', "\\'")
                );
                let url = endpoint(&self.config.drive_url, &["drive", "v3", "files"])?;
                let request = self
                    .http
                    .get(url)
                    .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);
                let found: DriveFiles = self.send(request).await?;
                let file = found
                    .files
                    .into_iter()
                    .next()
                    .ok_or_else(|| SheetsError::NotFound(format!("spreadsheet named '{name}'")))?;
                info!(sheet = %name, id = %file.id, "Resolved spreadsheet by name");
                Ok::<_, SheetsError>(file.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn values_url(&self, range: &str, suffix: &str) -> Result<Url> {
        let id = self.spreadsheet_id().await?;
        let last = format!("{range}{suffix}");
        endpoint(
            &self.config.sheets_url,
            &["v4", "spreadsheets", id, "values", last.as_str()],
        )
    }

    /// Adds the bearer token, sends, and maps non-success statuses.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let token = self.tokens.token().await?;
        let response = request.bearer_auth(token.expose_secret()).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(SheetsError::RateLimit { retry_after_secs });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SheetsError::Authentication(text),
                StatusCode::NOT_FOUND => SheetsError::NotFound(text),
                _ => SheetsError::api(status.as_u16(), text),
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn read_column(&self) -> Result<Vec<String>> {
        let url = self.values_url(&self.symbol_range(), "").await?;
        let request = self.http.get(url).query(&[("majorDimension", "COLUMNS")]);
        let range: ValueRange = self.send(request).await?;
        Ok(range.values.into_iter().next().unwrap_or_default())
    }

    async fn batch_clear(&self) -> Result<()> {
        let id = self.spreadsheet_id().await?;
        let url = endpoint(
            &self.config.sheets_url,
            &["v4", "spreadsheets", id, "values:batchClear"],
        )?;
        let range = self.symbol_range();
        let request = self.http.post(url).json(&BatchClear {
            ranges: [range.as_str()],
        });
        let _: IgnoredAny = self.send(request).await?;
        Ok(())
    }

    /// Overwrites the symbol column with blanks, one per used row of the worksheet.
    async fn blank_column(&self) -> Result<()> {
        let url = self.values_url(&self.range("A:ZZ"), "").await?;
        let used: ValueRange = self.send(self.http.get(url)).await?;
        let rows = if used.values.is_empty() {
            FALLBACK_CLEAR_ROWS
        } else {
            used.values.len()
        };

        let column = self
            .sheet
            .symbol_column
            .split(':')
            .next()
            .unwrap_or("A")
            .to_string();
        let target = self.range(&format!("{column}1:{column}{rows}"));
        let url = self.values_url(&target, "").await?;
        let request = self
            .http
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&ValueWrite {
                major_dimension: "ROWS",
                values: vec![vec![String::new()]; rows],
            });
        let _: IgnoredAny = self.send(request).await?;
        info!(rows, "Cleared symbol column by overwriting with blanks");
        Ok(())
    }

    async fn append_rows(&self, rows: &[OutcomeRow]) -> Result<()> {
        let url = self.values_url(&self.log_range(), ":append").await?;
        let request = self
            .http
            .post(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&ValueWrite {
                major_dimension: "ROWS",
                values: rows
                    .iter()
                    .map(|row| vec![row.symbol.clone(), row.status.clone()])
                    .collect(),
            });
        let _: IgnoredAny = self.send(request).await?;
        info!(rows = rows.len(), columns = %self.sheet.log_columns, "Logged outcomes");
        Ok(())
    }
}

/// Joins path segments onto a base URL, percent-encoding each segment.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| SheetsError::Configuration(format!("invalid base URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| SheetsError::Configuration(format!("base URL '{base}' cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl SymbolSource for SheetsSource {
    async fn read_symbols(&self) -> notional_deploy_core::Result<Vec<String>> {
        let column = self.read_column().await?;
        debug!(cells = column.len(), "Read symbol column");
        Ok(column)
    }

    async fn clear_symbols(&self) -> notional_deploy_core::Result<()> {
        match self.batch_clear().await {
            Ok(()) => {
                info!(range = %self.symbol_range(), "Cleared symbol column");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Batch clear failed, overwriting with blanks");
                Ok(self.blank_column().await?)
            }
        }
    }

    async fn record_outcomes(&self, rows: &[OutcomeRow]) -> notional_deploy_core::Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        Ok(self.append_rows(rows).await?)
    }
}
