mod check;
mod plan;
mod run;

pub use check::run_check;
pub use plan::run_plan;
pub use run::run_deploy;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use notional_deploy_alpaca::{AlpacaClient, AlpacaClientConfig};
use notional_deploy_core::{ConfigLoader, DeployerConfig, SymbolSource, DEFAULT_CONFIG_PATH};
use notional_deploy_engine::RunCoordinator;
use notional_deploy_sheets::{FileSource, SheetsSource};

/// Where configuration and symbols come from for one invocation.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub config: Option<PathBuf>,
    pub symbols_file: Option<PathBuf>,
    pub outcome_log: Option<PathBuf>,
}

impl SourceOptions {
    fn load_config(&self) -> anyhow::Result<DeployerConfig> {
        match &self.config {
            Some(path) => ConfigLoader::load_from(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display())),
            None => ConfigLoader::load()
                .with_context(|| format!("Failed to load configuration from {DEFAULT_CONFIG_PATH}")),
        }
    }

    fn symbol_source(&self, config: &DeployerConfig) -> anyhow::Result<Box<dyn SymbolSource>> {
        match &self.symbols_file {
            Some(path) => {
                let mut source = FileSource::new(path);
                if let Some(log) = &self.outcome_log {
                    source = source.with_outcome_log(log);
                }
                tracing::info!(path = %source.path().display(), "Reading symbols from file");
                Ok(Box::new(source))
            }
            None => {
                let source = SheetsSource::from_env(config.sheet.clone())
                    .context("Failed to set up Google Sheets access")?;
                Ok(Box::new(source))
            }
        }
    }
}

fn alpaca_client(config: &DeployerConfig) -> anyhow::Result<Arc<AlpacaClient>> {
    let client = AlpacaClient::from_env(AlpacaClientConfig::from_broker_config(&config.broker))
        .context("Failed to create Alpaca client")?;
    Ok(Arc::new(client))
}

fn coordinator(config: DeployerConfig, client: Arc<AlpacaClient>) -> RunCoordinator {
    RunCoordinator::new(config, client.clone(), client)
}
