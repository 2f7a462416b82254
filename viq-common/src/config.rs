//! Configuration loading and root folder resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database file name created inside the root folder
pub const DATABASE_FILE_NAME: &str = "vaultiq.db";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing level when `RUST_LOG` is unset ("error" .. "trace")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which Asset Directory backend mirrors minted vaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetDirectoryKind {
    /// Local SQLite table in the root folder database
    #[default]
    Sqlite,
    /// Remote HTTP directory (`POST {url}/assets`)
    Http,
    /// No mirror; directory writes are skipped
    None,
}

/// Asset Directory section of the TOML config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDirectoryConfig {
    #[serde(default)]
    pub kind: AssetDirectoryKind,
    /// Base URL, required when `kind = "http"`
    #[serde(default)]
    pub url: Option<String>,
}

/// Ledger section of the TOML config (simulated ledger latencies)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub submit_latency_ms: u64,
    #[serde(default)]
    pub confirm_latency_ms: u64,
}

/// Contents of `vaultiq.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Base URL of the Verification Service
    #[serde(default)]
    pub verification_url: Option<String>,
    #[serde(default)]
    pub asset_directory: AssetDirectoryConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}: {}", path.display(), e)))
}

/// Load the config file at `path`, or the platform default location when `None`.
///
/// A missing file yields the default config; a present but unparsable file is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path(),
    };

    match path {
        Some(p) if p.exists() => {
            tracing::info!("Loading config from {}", p.display());
            load_toml_config(&p)
        }
        _ => {
            tracing::debug!("No config file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write a TOML config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve a string setting: CLI → environment → TOML
pub fn resolve_setting(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<String> {
    if let Some(value) = cli_arg {
        return Some(value.to_string());
    }
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    toml_value.map(str::to_string)
}

/// Root folder resolution: CLI → environment → TOML → OS default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    if cfg!(target_os = "linux") {
        // ~/.config/vaultiq/vaultiq.toml first, then /etc/vaultiq/vaultiq.toml
        let user_config = dirs::config_dir().map(|d| d.join("vaultiq").join("vaultiq.toml"));
        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }
        let system_config = PathBuf::from("/etc/vaultiq/vaultiq.toml");
        system_config.exists().then_some(system_config)
    } else {
        dirs::config_dir().map(|d| d.join("vaultiq").join("vaultiq.toml"))
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "macos") {
        // ~/Library/Application Support/vaultiq
        dirs::data_dir()
            .map(|d| d.join("vaultiq"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/vaultiq"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\vaultiq
        dirs::data_local_dir()
            .map(|d| d.join("vaultiq"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\vaultiq"))
    } else {
        // ~/.local/share/vaultiq (or /var/lib/vaultiq for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("vaultiq"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/vaultiq"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_toml_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("vaultiq.toml");

        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/srv/vaultiq")),
            port: Some(5800),
            verification_url: Some("http://localhost:5000".to_string()),
            asset_directory: AssetDirectoryConfig {
                kind: AssetDirectoryKind::Http,
                url: Some("http://localhost:5000".to_string()),
            },
            ..Default::default()
        };

        write_toml_config(&config, &path).unwrap();
        let loaded = load_toml_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("port = 9000\n").unwrap();
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.asset_directory.kind, AssetDirectoryKind::Sqlite);
        assert_eq!(config.ledger.submit_latency_ms, 0);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "port = [not valid").unwrap();

        let err = load_toml_config(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_write_under_a_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("occupied");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = write_toml_config(&TomlConfig::default(), &blocker.join("vaultiq.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        let config = load_or_default(Some(&path)).unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    #[serial]
    fn test_root_folder_priority() {
        let toml_config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };

        std::env::set_var("VIQ_TEST_ROOT_FOLDER", "/from/env");
        assert_eq!(
            resolve_root_folder(Some(Path::new("/from/cli")), "VIQ_TEST_ROOT_FOLDER", &toml_config),
            PathBuf::from("/from/cli")
        );
        assert_eq!(
            resolve_root_folder(None, "VIQ_TEST_ROOT_FOLDER", &toml_config),
            PathBuf::from("/from/env")
        );

        std::env::remove_var("VIQ_TEST_ROOT_FOLDER");
        assert_eq!(
            resolve_root_folder(None, "VIQ_TEST_ROOT_FOLDER", &toml_config),
            PathBuf::from("/from/toml")
        );
    }

    #[test]
    #[serial]
    fn test_resolve_setting_priority() {
        std::env::remove_var("VIQ_TEST_SETTING");
        assert_eq!(resolve_setting(None, "VIQ_TEST_SETTING", Some("toml")), Some("toml".to_string()));
        assert_eq!(resolve_setting(None, "VIQ_TEST_SETTING", None), None);

        std::env::set_var("VIQ_TEST_SETTING", "env");
        assert_eq!(resolve_setting(None, "VIQ_TEST_SETTING", Some("toml")), Some("env".to_string()));
        assert_eq!(resolve_setting(Some("cli"), "VIQ_TEST_SETTING", Some("toml")), Some("cli".to_string()));
        std::env::remove_var("VIQ_TEST_SETTING");
    }

    #[test]
    fn test_database_path() {
        assert_eq!(
            database_path(Path::new("/srv/vaultiq")),
            PathBuf::from("/srv/vaultiq/vaultiq.db")
        );
    }
}
