use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat, FileSourceFile};
use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::broadcaster;

const ENV_PREFIX: &str = "AMPLIFIER_DEPLOYER";

/// Operator settings, independent of the network being targeted.
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct Settings {
    #[serde(with = "humantime_serde")]
    pub grpc_timeout: Duration,
    /// Directory holding the compiled `<contract_name>.wasm` files.
    pub artifact_dir: PathBuf,
    pub broadcast: broadcaster::Config,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grpc_timeout: Duration::from_secs(30),
            artifact_dir: PathBuf::from("artifacts"),
            broadcast: broadcaster::Config::default(),
        }
    }
}

/// Merges the given files in order, then applies `AMPLIFIER_DEPLOYER_*` environment overrides.
/// Nested keys are separated by `__`, e.g. `AMPLIFIER_DEPLOYER_BROADCAST__GAS_ADJUSTMENT`.
pub fn load(
    files: Vec<File<FileSourceFile, FileFormat>>,
) -> error_stack::Result<Settings, ConfigError> {
    Config::builder()
        .add_source(files)
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize::<Settings>()
        .map_err(Report::from)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use config::File;

    use super::{load, Settings};
    use crate::dec_coin::DecCoin;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deployer-settings-{}", rand::random::<u64>()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn no_files_yields_defaults() {
        assert_eq!(load(vec![]).unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = write_config(
            "config.toml",
            r#"
            grpc_timeout = '5s'

            [broadcast]
            gas_adjustment = 1.5
            tx_fetch_interval = '250ms'
            "#,
        );

        let settings = load(vec![File::from(path)]).unwrap();

        assert_eq!(settings.grpc_timeout, Duration::from_secs(5));
        assert_eq!(settings.broadcast.gas_adjustment, 1.5);
        assert_eq!(settings.broadcast.tx_fetch_interval, Duration::from_millis(250));
        assert_eq!(
            settings.broadcast.tx_fetch_max_retries,
            Settings::default().broadcast.tx_fetch_max_retries
        );
        assert_eq!(settings.artifact_dir, Settings::default().artifact_dir);
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let first = write_config("first.toml", "artifact_dir = '/tmp/first'\n");
        let second = write_config(
            "second.toml",
            "artifact_dir = '/tmp/second'\n[broadcast]\ngas_price = '0.007uamplifier'\n",
        );

        let settings = load(vec![File::from(first), File::from(second)]).unwrap();

        assert_eq!(settings.artifact_dir, PathBuf::from("/tmp/second"));
        assert_eq!(
            settings.broadcast.gas_price,
            Some(DecCoin::new(0.007, "uamplifier").unwrap())
        );
    }

    #[test]
    fn invalid_duration_fails() {
        let path = write_config("config.toml", "grpc_timeout = 'soon'\n");

        assert!(load(vec![File::from(path)]).is_err());
    }
}
