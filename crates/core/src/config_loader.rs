use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::debug;

use crate::config::DeployerConfig;
use crate::error::{Result, ServiceError};

/// Default location of the optional TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Deployer.toml";

/// Prefix for nested environment overrides, e.g. `DEPLOY_POLLING__FILL_ATTEMPTS`.
pub const ENV_PREFIX: &str = "DEPLOY_";

/// Flat environment variables kept for compatibility with existing deployments.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("BUY_FRACTION", "allocation.buy_fraction"),
    ("MIN_NOTIONAL", "allocation.min_notional"),
    ("SPEND_CAP_FRACTION", "allocation.spend_cap_fraction"),
    ("TAKE_PROFIT_PCT", "exits.take_profit_pct"),
    ("STOP_LOSS_PCT", "exits.stop_loss_pct"),
    ("SHEET_ID", "sheet.sheet_id"),
    ("SHEET_NAME", "sheet.sheet_name"),
    ("WORKSHEET_NAME", "sheet.worksheet"),
    ("ALPACA_BASE_URL", "broker.base_url"),
    ("ALPACA_DATA_URL", "broker.data_url"),
];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value fails validation.
    pub fn load() -> Result<DeployerConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration by merging defaults, a TOML file, and environment variables.
    ///
    /// A missing TOML file is not an error; the remaining layers still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<DeployerConfig> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading deployer configuration");

        let config: DeployerConfig = Self::figment(path)
            .extract()
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// The layered provider stack, lowest precedence first.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(DeployerConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(legacy_env())
    }
}

fn legacy_env() -> Env {
    let keys: Vec<&str> = LEGACY_ENV.iter().map(|(env, _)| *env).collect();
    Env::raw()
        .only(&keys)
        .map(|key| legacy_path(key.as_str()).into())
}

fn legacy_path(key: &str) -> String {
    LEGACY_ENV
        .iter()
        .find(|(env, _)| key.eq_ignore_ascii_case(env))
        .map_or_else(|| key.to_string(), |(_, path)| (*path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("does-not-exist.toml").expect("defaults load");
            assert_eq!(config, DeployerConfig::default());
            Ok(())
        });
    }

    #[test]
    fn toml_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Deployer.toml",
                r#"
                [allocation]
                buy_fraction = "0.10"

                [polling]
                fill_attempts = 30
                "#,
            )?;

            let config = ConfigLoader::load_from("Deployer.toml").expect("toml load");
            assert_eq!(config.allocation.buy_fraction, dec!(0.10));
            assert_eq!(config.allocation.min_notional, dec!(1.00));
            assert_eq!(config.polling.fill_attempts, 30);
            Ok(())
        });
    }

    #[test]
    fn nested_env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("Deployer.toml", "[polling]\nfill_attempts = 30\n")?;
            jail.set_env("DEPLOY_POLLING__FILL_ATTEMPTS", "90");

            let config = ConfigLoader::load_from("Deployer.toml").expect("env load");
            assert_eq!(config.polling.fill_attempts, 90);
            Ok(())
        });
    }

    #[test]
    fn legacy_flat_variables_are_honoured() {
        Jail::expect_with(|jail| {
            jail.set_env("MIN_NOTIONAL", "\"2.50\"");
            jail.set_env("WORKSHEET_NAME", "Buys");
            jail.set_env("ALPACA_BASE_URL", "https://api.alpaca.markets");

            let config = ConfigLoader::load_from("none.toml").expect("legacy load");
            assert_eq!(config.allocation.min_notional, dec!(2.50));
            assert_eq!(config.sheet.worksheet, "Buys");
            assert!(!config.broker.is_paper());
            Ok(())
        });
    }

    #[test]
    fn invalid_values_fail_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("ALPACA_BASE_URL", "http://localhost:8080");
            let err = ConfigLoader::load_from("none.toml").unwrap_err();
            assert!(matches!(err, ServiceError::Configuration(_)));
            Ok(())
        });
    }

    #[test]
    fn bundled_sample_matches_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Deployer.toml",
                include_str!("../../../config/Deployer.toml"),
            )?;
            let config = ConfigLoader::load_from("Deployer.toml").expect("sample load");
            assert_eq!(config, DeployerConfig::default());
            Ok(())
        });
    }

    #[test]
    fn legacy_path_lookup_is_case_insensitive() {
        assert_eq!(legacy_path("stop_loss_pct"), "exits.stop_loss_pct");
        assert_eq!(legacy_path("OTHER"), "OTHER");
    }
}
