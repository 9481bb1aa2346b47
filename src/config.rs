//! TOML configuration for `cmx`.
//!
//! Every section is optional and falls back to defaults, so an empty file
//! is a valid configuration. [`Config::minimal`] is used when the default
//! config path does not exist.
//!
//! ```toml
//! [state]
//! dir = ".ce-state"
//!
//! [extraction]
//! framework = "react"
//! min_props = 1
//! propless_components = ["Separator"]
//!
//! [composition]
//! required_suffixes = ["Trigger", "Content", "Item", "List"]
//!
//! [composition.overrides]
//! Card = []
//!
//! [generation]
//! provider = "openai"
//! model = "gpt-4o-mini"
//! timeout_secs = 60
//!
//! [components]
//! root = "./src/components/ui"
//! include_globs = ["**/*.tsx"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use component_manifest_core::ast::{AstAnalyzer, DEFAULT_PRIMITIVE_PACKAGES};
use component_manifest_core::composition::{CompositionAnalyzer, CompositionRules};
use component_manifest_core::extract::{ExtractionPolicy, HybridExtractor};
use serde::Deserialize;

/// Environment variable that overrides `[state].dir`.
pub const STATE_DIR_ENV: &str = "CE_STATE_DIR";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub composition: CompositionConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub components: ComponentsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".ce-state")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_framework")]
    pub framework: String,
    #[serde(default = "default_min_props")]
    pub min_props: usize,
    #[serde(default)]
    pub propless_components: Vec<String>,
    #[serde(default = "default_primitive_packages")]
    pub primitive_packages: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            framework: default_framework(),
            min_props: default_min_props(),
            propless_components: Vec::new(),
            primitive_packages: default_primitive_packages(),
        }
    }
}

fn default_framework() -> String {
    "react".to_string()
}
fn default_min_props() -> usize {
    1
}
fn default_primitive_packages() -> Vec<String> {
    DEFAULT_PRIMITIVE_PACKAGES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompositionConfig {
    #[serde(default = "default_required_suffixes")]
    pub required_suffixes: Vec<String>,
    #[serde(default = "default_overrides")]
    pub overrides: BTreeMap<String, Vec<String>>,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            required_suffixes: default_required_suffixes(),
            overrides: default_overrides(),
        }
    }
}

fn default_required_suffixes() -> Vec<String> {
    CompositionRules::default().required_suffixes
}
fn default_overrides() -> BTreeMap<String, Vec<String>> {
    CompositionRules::default().overrides
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: None,
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ComponentsConfig {
    #[serde(default = "default_components_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            root: default_components_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_components_root() -> PathBuf {
    PathBuf::from("./src/components")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.tsx".to_string(), "**/*.jsx".to_string()]
}

impl Config {
    /// All-defaults configuration.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Checkpoint root: `CE_STATE_DIR` when set and non-empty, else `[state].dir`.
    pub fn state_dir(&self) -> PathBuf {
        match std::env::var(STATE_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => self.state.dir.clone(),
        }
    }

    pub fn composition_rules(&self) -> CompositionRules {
        CompositionRules {
            required_suffixes: self.composition.required_suffixes.clone(),
            overrides: self.composition.overrides.clone(),
        }
    }

    pub fn extraction_policy(&self) -> ExtractionPolicy {
        ExtractionPolicy {
            min_props: self.extraction.min_props,
            propless_components: self.extraction.propless_components.clone(),
        }
    }

    /// Extraction coordinator wired from this configuration.
    pub fn extractor(&self) -> HybridExtractor {
        HybridExtractor::new(
            AstAnalyzer::new(self.extraction.primitive_packages.clone()),
            CompositionAnalyzer::new(self.composition_rules()),
            self.extraction_policy(),
        )
    }
}

/// Read the config at `path`, or [`Config::minimal`] when `path` does not exist
/// and `allow_missing` is set.
pub fn load_or_minimal(path: &Path, allow_missing: bool) -> Result<Config> {
    if allow_missing && !path.exists() {
        return Ok(Config::minimal());
    }
    load_config(path)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.extraction.framework.trim().is_empty() {
        bail!("extraction.framework must not be empty");
    }

    if config.composition.required_suffixes.is_empty() {
        bail!("composition.required_suffixes must not be empty");
    }
    if config
        .composition
        .required_suffixes
        .iter()
        .any(|s| s.trim().is_empty())
    {
        bail!("composition.required_suffixes must not contain empty entries");
    }

    if config.generation.timeout_secs == 0 {
        bail!("generation.timeout_secs must be > 0");
    }

    match config.generation.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.generation.is_enabled() && config.generation.model.is_none() {
        bail!(
            "generation.model must be specified when provider is '{}'",
            config.generation.provider
        );
    }

    if let Some(t) = config.generation.temperature {
        if !(0.0..=2.0).contains(&t) {
            bail!("generation.temperature must be in [0.0, 2.0]");
        }
    }

    Ok(())
}
