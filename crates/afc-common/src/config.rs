//! ---
//! afc_section: "01-core-functionality"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Shared configuration and logging for the conformance harness."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_inquiry_dir() -> PathBuf {
    PathBuf::from("test_vectors/latest/inquiries")
}

fn default_response_dir() -> PathBuf {
    PathBuf::from("test_vectors/latest/responses")
}

fn default_mask_dir() -> PathBuf {
    PathBuf::from("test_vectors/latest/masks")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_case_logs() -> bool {
    true
}

fn default_supported_versions() -> Vec<String> {
    vec!["1.4".to_owned()]
}

fn default_known_ruleset_ids() -> Vec<String> {
    vec![
        "US_47_CFR_PART_15_SUBPART_E".to_owned(),
        "CA_RES_DBS-06".to_owned(),
    ]
}

fn default_min_vertices() -> usize {
    3
}

fn default_max_vertices() -> usize {
    15
}

fn default_min_vertex_spacing_m() -> f64 {
    1.0
}

// 130 km protocol limit plus a 25 km tolerance margin.
fn default_max_vertex_spacing_m() -> f64 {
    155_000.0
}

fn default_tests() -> Vec<String> {
    vec!["all".to_owned()]
}

/// Primary configuration object for the conformance harness.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub tests: TestsConfig,
}

/// Metadata describing where a [`HarnessConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedHarnessConfig {
    pub config: HarnessConfig,
    pub source: PathBuf,
}

impl HarnessConfig {
    pub const ENV_CONFIG_PATH: &str = "AFC_HARNESS_CONFIG";

    /// Load configuration from disk, respecting the `AFC_HARNESS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedHarnessConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedHarnessConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedHarnessConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no harness configuration found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading harness configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<HarnessConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.validation.validate()?;
        if self.tests.run.is_empty() {
            return Err(anyhow!("tests.run must name at least one test (or \"all\")"));
        }
        Ok(())
    }
}

impl std::str::FromStr for HarnessConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: HarnessConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Directories used for inquiries, masks, received responses and per-test logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_inquiry_dir")]
    pub inquiry_dir: PathBuf,
    #[serde(default = "default_response_dir")]
    pub response_dir: PathBuf,
    #[serde(default = "default_mask_dir")]
    pub mask_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            inquiry_dir: default_inquiry_dir(),
            response_dir: default_response_dir(),
            mask_dir: default_mask_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Write one `<test>.log` per test case under `directory`.
    #[serde(default = "default_case_logs")]
    pub case_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            case_logs: default_case_logs(),
        }
    }
}

/// Rule-set knobs consumed by the validators.
///
/// `strict_geometry` promotes the polygon advisories (vertex count, spacing,
/// self-intersection, duplicates) from warnings to hard failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub strict_geometry: bool,
    #[serde(default = "default_supported_versions")]
    pub supported_versions: Vec<String>,
    #[serde(default = "default_known_ruleset_ids")]
    pub known_ruleset_ids: Vec<String>,
    #[serde(default = "default_min_vertices")]
    pub min_vertices: usize,
    #[serde(default = "default_max_vertices")]
    pub max_vertices: usize,
    #[serde(default = "default_min_vertex_spacing_m")]
    pub min_vertex_spacing_m: f64,
    #[serde(default = "default_max_vertex_spacing_m")]
    pub max_vertex_spacing_m: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict_geometry: false,
            supported_versions: default_supported_versions(),
            known_ruleset_ids: default_known_ruleset_ids(),
            min_vertices: default_min_vertices(),
            max_vertices: default_max_vertices(),
            min_vertex_spacing_m: default_min_vertex_spacing_m(),
            max_vertex_spacing_m: default_max_vertex_spacing_m(),
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.supported_versions.is_empty() {
            return Err(anyhow!(
                "validation.supported_versions must list at least one protocol version"
            ));
        }
        if self.min_vertices > self.max_vertices {
            return Err(anyhow!(
                "validation.min_vertices ({}) exceeds max_vertices ({})",
                self.min_vertices,
                self.max_vertices
            ));
        }
        if !(self.min_vertex_spacing_m.is_finite() && self.min_vertex_spacing_m >= 0.0) {
            return Err(anyhow!(
                "validation.min_vertex_spacing_m must be a non-negative finite distance"
            ));
        }
        if !(self.max_vertex_spacing_m.is_finite()
            && self.max_vertex_spacing_m > self.min_vertex_spacing_m)
        {
            return Err(anyhow!(
                "validation.max_vertex_spacing_m ({}) must be finite and greater than min_vertex_spacing_m ({})",
                self.max_vertex_spacing_m,
                self.min_vertex_spacing_m
            ));
        }
        Ok(())
    }
}

/// Selection of test cases to execute; `["all"]` runs every inquiry on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestsConfig {
    #[serde(default = "default_tests")]
    pub run: Vec<String>,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            run: default_tests(),
        }
    }
}

impl TestsConfig {
    pub fn runs_all(&self) -> bool {
        self.run
            .first()
            .map(|name| name.trim().eq_ignore_ascii_case("all"))
            .unwrap_or(false)
    }
}
