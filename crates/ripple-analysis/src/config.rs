//! Layered engine configuration
//!
//! Sources, highest priority first:
//! 1. Environment variables (`RIPPLE_*`)
//! 2. Project config file (`.ripple/config.yaml`)
//! 3. Global config file (`~/.ripple/config.yaml`)
//! 4. Built-in defaults

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ripple_advisor::AdvisorConfig;
use ripple_discovery::{DiscoveryConfig, SearchStrategy};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::error::{AnalysisError, Result};

/// Dependency traversal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Hop limit for indirect dependents (default: 3)
    pub max_hops: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_hops: 3 }
    }
}

/// Assigns criticality tags to entities whose reference matches `pattern`.
///
/// The glob is matched against both `KIND:identifier` and the bare
/// identifier, so `*/api/stocks/*` tags every stock endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRule {
    pub pattern: String,
    pub tags: Vec<String>,
}

/// Domain-criticality lookup used by the risk scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Weight contributed by each tag, 0-3
    pub tag_weights: BTreeMap<String, f64>,
    pub tag_rules: Vec<TagRule>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        let tag_weights = [
            ("financial", 3.0),
            ("critical", 3.0),
            ("pii", 2.5),
            ("auth", 2.0),
            ("internal", 0.5),
        ]
        .into_iter()
        .map(|(tag, weight)| (tag.to_string(), weight))
        .collect();

        Self {
            tag_weights,
            tag_rules: Vec::new(),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<()> {
        for (tag, weight) in &self.tag_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(AnalysisError::Configuration(format!(
                    "tag weight for '{}' must be a non-negative number, got {}",
                    tag, weight
                )));
            }
        }
        for rule in &self.tag_rules {
            globset::Glob::new(&rule.pattern).map_err(|e| {
                AnalysisError::Configuration(format!("invalid tag rule '{}': {}", rule.pattern, e))
            })?;
        }
        Ok(())
    }
}

/// Complete engine configuration, handed to components at construction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub resolver: ResolverConfig,
    pub discovery: DiscoveryConfig,
    pub advisor: AdvisorConfig,
    pub risk: RiskConfig,
}

impl EngineConfig {
    /// Load configuration with precedence env > project > global > defaults
    pub fn load_with_precedence() -> Result<Self> {
        Self::load_layers(None)
    }

    /// Like [`load_with_precedence`](Self::load_with_precedence), with an
    /// explicit file layered above the project file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AnalysisError::Configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Self::load_layers(Some(path))
    }

    fn load_layers(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global) = Self::get_global_config_path() {
            if global.exists() {
                debug!("Loading global config from {:?}", global);
                config.merge_from_file(&global)?;
            }
        }

        let project = Self::get_project_config_path();
        if project.exists() {
            debug!("Loading project config from {:?}", project);
            config.merge_from_file(&project)?;
        }

        if let Some(path) = explicit {
            debug!("Loading config from {:?}", path);
            config.merge_from_file(path)?;
        }

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Get the global configuration path (~/.ripple/config.yaml)
    pub fn get_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ripple").join("config.yaml"))
    }

    /// Get the project configuration path (.ripple/config.yaml)
    pub fn get_project_config_path() -> PathBuf {
        PathBuf::from(".ripple").join("config.yaml")
    }

    /// Merge a YAML file over the current values.
    ///
    /// Only keys present in the file change; nested sections merge key by key.
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        self.merge_from_str(&content).map_err(|e| {
            AnalysisError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Merge YAML text over the current values
    pub fn merge_from_str(&mut self, content: &str) -> Result<()> {
        let overlay: Value = serde_yaml::from_str(content)?;
        if overlay.is_null() {
            return Ok(());
        }
        let mut base = serde_yaml::to_value(&*self)?;
        merge_values(&mut base, overlay);
        *self = serde_yaml::from_value(base)?;
        Ok(())
    }

    /// Apply `RIPPLE_*` environment overrides
    pub fn load_from_env(&mut self) {
        if let Some(hops) = env_parsed::<u32>("RIPPLE_MAX_HOPS") {
            self.resolver.max_hops = hops;
        }

        if let Ok(strategy) = std::env::var("RIPPLE_SEARCH_STRATEGY") {
            match strategy.as_str() {
                "clone_grep" => self.discovery.strategy = SearchStrategy::CloneGrep,
                "remote_search" => self.discovery.strategy = SearchStrategy::RemoteSearch,
                other => warn!("Invalid RIPPLE_SEARCH_STRATEGY value: {}", other),
            }
        }
        if let Some(n) = env_parsed::<usize>("RIPPLE_MAX_CONCURRENCY") {
            self.discovery.max_concurrency = n;
        }
        if let Some(secs) = env_parsed::<u64>("RIPPLE_REPOSITORY_TIMEOUT_SECS") {
            self.discovery.repository_timeout_secs = secs;
        }
        if let Ok(dir) = std::env::var("RIPPLE_CACHE_DIR") {
            debug!("Loading RIPPLE_CACHE_DIR from environment: {}", dir);
            self.discovery.cache_dir = PathBuf::from(dir);
        }

        if let Some(enabled) = env_parsed::<bool>("RIPPLE_ADVISOR_ENABLED") {
            self.advisor.enabled = enabled;
        }
        if let Ok(url) = std::env::var("RIPPLE_ADVISOR_BASE_URL") {
            debug!("Loading RIPPLE_ADVISOR_BASE_URL from environment: {}", url);
            self.advisor.base_url = url;
        }
        if let Ok(model) = std::env::var("RIPPLE_ADVISOR_MODEL") {
            self.advisor.model = model;
        }
        if let Some(secs) = env_parsed::<u64>("RIPPLE_ADVISOR_TIMEOUT_SECS") {
            self.advisor.timeout_secs = secs;
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        if self.resolver.max_hops == 0 {
            return Err(AnalysisError::Configuration(
                "resolver max_hops must be greater than 0".to_string(),
            ));
        }
        self.discovery.validate()?;
        self.advisor.validate()?;
        self.risk.validate()
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) => {
            debug!("Loading {} from environment: {}", name, raw);
            Some(value)
        }
        Err(_) => {
            warn!("Invalid {} value: {}", name, raw);
            None
        }
    }
}

/// Recursively overlay mappings; any other overlay value replaces the base
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
