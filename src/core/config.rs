use crate::core::error::{ConfigError, RampError, RampResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Project configuration for sqlramp
/// Searched in order: sqlramp.toml, .sqlramp.toml, .config/sqlramp.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampConfig {
  #[serde(default)]
  pub project: ProjectConfig,
  pub warehouse: WarehouseConfig,
  #[serde(default)]
  pub ledger: LedgerConfig,
}

/// Repository layout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
  /// Directory holding the SQL object definitions (the monitored source tree)
  #[serde(default = "default_model_dir")]
  pub model_dir: String,

  /// Directory holding committed release files and the release candidate
  #[serde(default = "default_releases_dir")]
  pub releases_dir: String,
}

fn default_model_dir() -> String {
  "model".to_string()
}

fn default_releases_dir() -> String {
  "releases".to_string()
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      model_dir: default_model_dir(),
      releases_dir: default_releases_dir(),
    }
  }
}

/// Warehouse databases and the branches that map onto them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
  /// Production database name
  pub production_db: String,

  /// Staging database name
  pub staging_db: String,

  /// Branch whose releases land in production (default: "main")
  #[serde(default = "default_production_branch")]
  pub production_branch: String,

  /// Branch whose releases land in staging (default: "develop")
  #[serde(default = "default_staging_branch")]
  pub staging_branch: String,
}

fn default_production_branch() -> String {
  "main".to_string()
}

fn default_staging_branch() -> String {
  "develop".to_string()
}

/// Release ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
  /// Schema-qualified ledger table name
  #[serde(default = "default_ledger_table")]
  pub table: String,
}

fn default_ledger_table() -> String {
  "public.release_ledger".to_string()
}

impl Default for LedgerConfig {
  fn default() -> Self {
    Self {
      table: default_ledger_table(),
    }
  }
}

impl RampConfig {
  /// Find config file in search order: sqlramp.toml, .sqlramp.toml, .config/sqlramp.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("sqlramp.toml"),
      path.join(".sqlramp.toml"),
      path.join(".config").join("sqlramp.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from sqlramp.toml (searches multiple locations)
  pub fn load(path: &Path) -> RampResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      RampError::Config(ConfigError::NotFound {
        search_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: RampConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate()?;

    Ok(config)
  }

  /// Check if config exists at the given path
  pub fn exists(path: &Path) -> bool {
    Self::find_config_path(path).is_some()
  }

  fn validate(&self) -> RampResult<()> {
    if self.warehouse.production_db.trim().is_empty() {
      return Err(RampError::Config(ConfigError::MissingField {
        field: "warehouse.production_db".to_string(),
      }));
    }
    if self.warehouse.staging_db.trim().is_empty() {
      return Err(RampError::Config(ConfigError::MissingField {
        field: "warehouse.staging_db".to_string(),
      }));
    }
    Ok(())
  }
}

/// Per-user warehouse connection settings, read from `~/.sqlramp.toml`
/// (overridable via the SQLRAMP_USER_CONFIG environment variable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
  pub connection: ConnectionConfig,
}

/// Connection parameters for the execution backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
  /// Identity recorded in the ledger's applied_by column
  pub user: String,

  #[serde(default = "default_host")]
  pub host: String,

  #[serde(default = "default_port")]
  pub port: u16,

  #[serde(default)]
  pub password: Option<String>,
}

fn default_host() -> String {
  "localhost".to_string()
}

fn default_port() -> u16 {
  5432
}

impl UserConfig {
  /// Default location of the user connection file
  pub fn default_path() -> RampResult<PathBuf> {
    if let Ok(path) = std::env::var("SQLRAMP_USER_CONFIG") {
      return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".sqlramp.toml"))
  }

  /// Load the user connection file
  pub fn load() -> RampResult<Self> {
    let path = Self::default_path()?;
    if !path.exists() {
      return Err(RampError::Config(ConfigError::UserConfigNotFound { path }));
    }

    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: UserConfig =
      toml_edit::de::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
  }
}
