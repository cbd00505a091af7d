//! Symbol list sources: a Google Sheets worksheet column or a local file.

pub mod auth;
pub mod error;
pub mod file;
pub mod sheets;

pub use auth::{ServiceAccountKey, TokenProvider, CREDENTIALS_ENV};
pub use error::{Result, SheetsError};
pub use file::FileSource;
pub use sheets::{SheetsClientConfig, SheetsSource};
