//! Production configuration system
//!
//! Provides centralized configuration management with:
//! - Environment variable support
//! - Config file loading (optional)
//! - Runtime defaults reproducing the historical cluster tables
//! - Validation and type safety

use crate::date_range::PartialDate;
use crate::error::AccountingError;
use crate::node_memory::{HostnameMemoryRule, NodeMemoryProfile};
use crate::quantity::parse_quantity;
use crate::report::ReportKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Report window and layout
    pub report: ReportConfig,

    /// Paths configuration
    pub paths: PathsConfig,

    /// Node memory fallback rules
    pub memory: MemoryConfig,

    /// Equipment owner tables
    pub owners: OwnersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Far-future sentinel, `YYYY[MM[DD[HH[MM[SS]]]]]`, closing open ranges.
    pub max_date: String,
    pub reports: Vec<String>,
    pub cores: u64,
    pub limit_users: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub accounting_files: Vec<PathBuf>,
    pub log_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Tried in order; the first matching pattern wins.
    pub hostname_rules: Vec<HostnameRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostnameRuleConfig {
    pub pattern: String,
    /// Total node memory, e.g. `"128G"`.
    pub node_memory: String,
    pub cores: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnersConfig {
    pub queue_owner: HashMap<String, String>,
    pub owner_owner: HashMap<String, String>,
    pub owner_parent: HashMap<String, String>,
    pub core_owners: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_date: "40000101".to_string(),
            reports: ReportKind::ALL.iter().map(|k| k.name().to_string()).collect(),
            cores: 0,
            limit_users: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            accounting_files: Vec::new(),
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let rule = |pattern: &str, node_memory: &str, cores: u64, label: &str| HostnameRuleConfig {
            pattern: pattern.to_string(),
            node_memory: node_memory.to_string(),
            cores,
            label: Some(label.to_string()),
        };

        Self {
            hostname_rules: vec![
                rule(r"^h7s3b1[56]", "64G", 24, "ARC2"),
                rule(r"^h[12367]s", "24G", 12, "ARC2"),
                rule(r"^dc[1-4]s", "128G", 24, "ARC3"),
                rule(r"^c2s0b[0-3]n", "24G", 8, "ARC1"),
                rule(r"^c[1-3]s", "12G", 8, "ARC1"),
                rule(r"^smp[1-4]", "128G", 16, "ARC1"),
                rule(r"^g8s([789]|10)n", "256G", 16, "POLARIS"),
                rule(r"^g[0-9]s", "64G", 16, "POLARIS/ARC2"),
                rule(r"^hb01s", "256G", 20, "MARC1"),
                rule(r"^hb02n", "3T", 48, "MARC1"),
            ],
        }
    }
}

impl Default for OwnersConfig {
    fn default() -> Self {
        let table = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };

        Self {
            queue_owner: table(&[
                ("env1_sgpc.q", "sgpc"),
                ("env1_glomap.q", "glomap"),
                ("speme1.q", "speme"),
                ("env1_neiss.q", "neiss"),
                ("env1_tomcat.q", "tomcat"),
                ("chem1.q", "chem"),
                ("civ1.q", "civil"),
                ("mhd1.q", "mhd"),
            ]),
            owner_owner: table(&[("ISS", "ARC"), ("UKMHD", "MAPS")]),
            owner_parent: table(&[
                ("ENV", "ENV"),
                ("ENG", "ENG"),
                ("MAPS", "MAPS"),
                ("FBS", "FBS"),
                ("ARC", "ARC"),
                ("Arts", "Arts"),
                ("LUBS", "LUBS"),
                ("ESSL", "ESSL"),
                ("PVAC", "PVAC"),
                ("MEDH", "MEDH"),
                ("minphys", "ENV"),
                ("glocat", "ENV"),
                ("glomap", "ENV"),
                ("tomcat", "ENV"),
                ("palaeo1", "ENV"),
                ("sgpc", "ENV"),
                ("neiss", "ENV"),
                ("speme", "ENG"),
                ("civil", "ENG"),
                ("mhd", "MAPS"),
                ("skyblue", "MAPS"),
                ("chem", "MAPS"),
                ("maths", "MAPS"),
                ("astro", "MAPS"),
                ("codita", "MAPS"),
                ("omics", "FBS"),
                ("cryoem", "FBS"),
            ]),
            core_owners: ["Arts", "ENG", "ENV", "ESSL", "FBS", "LUBS", "MAPS", "MEDH", "PVAC"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            report: ReportConfig::default(),
            paths: PathsConfig::default(),
            memory: MemoryConfig::default(),
            owners: OwnersConfig::default(),
        }
    }
}

impl HostnameRuleConfig {
    pub fn compile(&self) -> Result<HostnameMemoryRule, AccountingError> {
        let memory = parse_quantity(&self.node_memory)?;
        let memory_per_core = NodeMemoryProfile::new(self.cores, memory)
            .and_then(|p| p.memory_per_core())
            .ok_or_else(|| {
                AccountingError::Configuration(format!(
                    "hostname rule '{}' needs non-zero cores and at least one byte of memory per core",
                    self.pattern
                ))
            })?;
        HostnameMemoryRule::new(&self.pattern, memory_per_core)
    }
}

impl MemoryConfig {
    /// Compiled rules in declaration order.
    pub fn compile_rules(&self) -> Result<Vec<HostnameMemoryRule>, AccountingError> {
        self.hostname_rules.iter().map(HostnameRuleConfig::compile).collect()
    }
}

impl Config {
    /// Load configuration from an explicit file, or the first default
    /// location that exists, then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = explicit {
            info!(config_file = %path.display(), "Loading configuration from file");
            config = Self::load_from_file(path)?;
        } else {
            let config_paths = [
                PathBuf::from("sge-accounting.toml"),
                PathBuf::from(".sge-accounting.toml"),
                dirs::config_dir()
                    .map(|d| d.join("sge-accounting").join("config.toml"))
                    .unwrap_or_default(),
            ];

            for path in &config_paths {
                if !path.as_os_str().is_empty() && path.exists() {
                    info!(config_file = %path.display(), "Loading configuration from file");
                    config = Self::load_from_file(path)?;
                    break;
                }
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    #[cfg(feature = "toml")]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    #[cfg(not(feature = "toml"))]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        anyhow::bail!(
            "Config file {} given but this build has no TOML support (enable the `basic` feature)",
            path.display()
        )
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Report overrides
        if let Ok(val) = env::var("SGE_ACCOUNTING_MAX_DATE") {
            self.report.max_date = val;
        }
        if let Ok(val) = env::var("SGE_ACCOUNTING_CORES") {
            self.report.cores = val.parse().context("Invalid SGE_ACCOUNTING_CORES")?;
        }
        if let Ok(val) = env::var("SGE_ACCOUNTING_LIMIT_USERS") {
            self.report.limit_users = Some(val.parse().context("Invalid SGE_ACCOUNTING_LIMIT_USERS")?);
        }

        // Path overrides
        if let Ok(val) = env::var("SGE_ACCOUNTING_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        PartialDate::parse(&self.report.max_date).context("Invalid report.max_date")?;

        for name in &self.report.reports {
            name.parse::<ReportKind>()
                .map_err(anyhow::Error::msg)
                .context("Invalid report.reports entry")?;
        }

        if self.memory.hostname_rules.is_empty() {
            warn!("No hostname memory rules configured, jobs without node_type will not be adjusted");
        }
        self.memory.compile_rules().context("Invalid memory.hostname_rules")?;

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(anyhow::anyhow!(
                "Log format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            ));
        }

        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            return Err(anyhow::anyhow!(
                "Log output must be 'console', 'file' or 'both', got '{}'",
                self.logging.output
            ));
        }

        Ok(())
    }

    pub fn report_kinds(&self) -> Result<Vec<ReportKind>> {
        self.report
            .reports
            .iter()
            .map(|name| name.parse::<ReportKind>().map_err(anyhow::Error::msg))
            .collect()
    }

    /// Save current configuration to file
    #[cfg(feature = "toml")]
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Install the configuration for this run. Returns the already installed
/// configuration if called twice.
pub fn init_config(config: Config) -> &'static Config {
    CONFIG.get_or_init(|| config)
}
