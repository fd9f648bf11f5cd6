//! Configuration file support for riskshare
//!
//! Loads report configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.risksharerc.json` next to the table export
//! 3. `riskshare.config.json` next to the table export
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::control::EffectivenessTable;
use crate::imaging::ImageOptions;
use crate::projection::ProjectionParams;
use crate::risk::{CategoryPalette, CategoryThresholds};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_TITLE: &str = "Risk Assessment Report";

/// Config file names looked up next to the table export, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = [".risksharerc.json", "riskshare.config.json"];

/// riskshare configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskshareConfig {
    /// Report heading (default: "Risk Assessment Report")
    #[serde(default)]
    pub title: Option<String>,

    /// Add projected scores and the evolution chart (default: false)
    #[serde(default)]
    pub include_projections: Option<bool>,

    /// Custom category thresholds
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,

    /// Custom control effectiveness
    #[serde(default)]
    pub effectiveness: Option<EffectivenessConfig>,

    /// Custom diminishing-returns parameters
    #[serde(default)]
    pub projection: Option<ProjectionConfig>,

    /// Image normalization limits
    #[serde(default)]
    pub images: Option<ImageConfig>,

    /// Names of the columns the report reads
    #[serde(default)]
    pub columns: Option<ColumnConfig>,
}

/// Custom category thresholds (inclusive upper bounds)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Highest Low score (default: 19)
    pub low_max: Option<u32>,
    /// Highest Medium score (default: 49)
    pub medium_max: Option<u32>,
    /// Highest High score (default: 71)
    pub high_max: Option<u32>,
}

/// Custom control effectiveness, each in [0, 1]
///
/// Eliminate is not configurable: it always projects to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectivenessConfig {
    pub substitute: Option<f64>,
    pub engineer: Option<f64>,
    pub visual: Option<f64>,
    pub admin: Option<f64>,
    pub individual: Option<f64>,
}

/// Diminishing-returns parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectionConfig {
    /// Decay base for hard controls (default: 0.4)
    pub hard_decay: Option<f64>,
    /// Decay base for soft controls (default: 0.5)
    pub soft_decay: Option<f64>,
    /// Residual floor for the hard multiplier (default: 0.35)
    pub hard_floor: Option<f64>,
    /// Residual floor for the soft multiplier (default: 0.50)
    pub soft_floor: Option<f64>,
}

/// Image normalization limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Bounding box side in pixels (default: 800)
    pub max_dimension: Option<u32>,
    /// JPEG quality 1-100 (default: 60)
    pub jpeg_quality: Option<u8>,
}

/// Names of the columns the report reads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    /// Category label column (default: "Risk Category")
    pub category: Option<String>,
    /// Numeric score column (default: "Risk Score")
    pub score: Option<String>,
    /// Column used as the modal title (default: "Steps")
    pub title: Option<String>,
}

/// Column names after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnNames {
    pub category: String,
    pub score: String,
    pub title: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            category: "Risk Category".to_string(),
            score: "Risk Score".to_string(),
            title: "Steps".to_string(),
        }
    }
}

/// Resolved configuration with every default filled in
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub title: String,
    pub include_projections: bool,
    pub thresholds: CategoryThresholds,
    pub effectiveness: EffectivenessTable,
    pub projection: ProjectionParams,
    pub images: ImageOptions,
    pub columns: ColumnNames,
    pub palette: CategoryPalette,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn check_fraction(name: &str, value: Option<f64>) -> Result<()> {
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) {
            anyhow::bail!("{} must be between 0 and 1 (got {})", name, v);
        }
    }
    Ok(())
}

impl RiskshareConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        // Thresholds must be strictly increasing
        if let Some(ref t) = self.thresholds {
            let defaults = CategoryThresholds::default();
            let low = t.low_max.unwrap_or(defaults.low_max);
            let medium = t.medium_max.unwrap_or(defaults.medium_max);
            let high = t.high_max.unwrap_or(defaults.high_max);

            if low >= medium {
                anyhow::bail!(
                    "thresholds.low_max ({}) must be less than thresholds.medium_max ({})",
                    low,
                    medium
                );
            }
            if medium >= high {
                anyhow::bail!(
                    "thresholds.medium_max ({}) must be less than thresholds.high_max ({})",
                    medium,
                    high
                );
            }
        }

        if let Some(ref e) = self.effectiveness {
            for (name, val) in [
                ("effectiveness.substitute", e.substitute),
                ("effectiveness.engineer", e.engineer),
                ("effectiveness.visual", e.visual),
                ("effectiveness.admin", e.admin),
                ("effectiveness.individual", e.individual),
            ] {
                check_fraction(name, val)?;
            }
        }

        if let Some(ref p) = self.projection {
            for (name, val) in [
                ("projection.hard_decay", p.hard_decay),
                ("projection.soft_decay", p.soft_decay),
                ("projection.hard_floor", p.hard_floor),
                ("projection.soft_floor", p.soft_floor),
            ] {
                check_fraction(name, val)?;
            }
        }

        if let Some(ref i) = self.images {
            if i.max_dimension == Some(0) {
                anyhow::bail!("images.max_dimension must be positive (got 0)");
            }
            if let Some(q) = i.jpeg_quality {
                if !(1..=100).contains(&q) {
                    anyhow::bail!("images.jpeg_quality must be between 1 and 100 (got {})", q);
                }
            }
        }

        if let Some(ref c) = self.columns {
            for (name, val) in [
                ("columns.category", &c.category),
                ("columns.score", &c.score),
                ("columns.title", &c.title),
            ] {
                if val.as_deref().is_some_and(|v| v.trim().is_empty()) {
                    anyhow::bail!("{} must not be empty", name);
                }
            }
        }

        Ok(())
    }

    /// Resolve config into the form the pipeline consumes
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let thresholds = match &self.thresholds {
            Some(t) => {
                let d = CategoryThresholds::default();
                CategoryThresholds {
                    low_max: t.low_max.unwrap_or(d.low_max),
                    medium_max: t.medium_max.unwrap_or(d.medium_max),
                    high_max: t.high_max.unwrap_or(d.high_max),
                }
            }
            None => CategoryThresholds::default(),
        };

        let effectiveness = match &self.effectiveness {
            Some(e) => {
                let d = EffectivenessTable::default();
                EffectivenessTable {
                    eliminate: d.eliminate,
                    substitute: e.substitute.unwrap_or(d.substitute),
                    engineer: e.engineer.unwrap_or(d.engineer),
                    visual: e.visual.unwrap_or(d.visual),
                    admin: e.admin.unwrap_or(d.admin),
                    individual: e.individual.unwrap_or(d.individual),
                }
            }
            None => EffectivenessTable::default(),
        };

        let projection = match &self.projection {
            Some(p) => {
                let d = ProjectionParams::default();
                ProjectionParams {
                    hard_decay: p.hard_decay.unwrap_or(d.hard_decay),
                    soft_decay: p.soft_decay.unwrap_or(d.soft_decay),
                    hard_floor: p.hard_floor.unwrap_or(d.hard_floor),
                    soft_floor: p.soft_floor.unwrap_or(d.soft_floor),
                }
            }
            None => ProjectionParams::default(),
        };

        let images = match &self.images {
            Some(i) => {
                let d = ImageOptions::default();
                ImageOptions {
                    max_dimension: i.max_dimension.unwrap_or(d.max_dimension),
                    jpeg_quality: i.jpeg_quality.unwrap_or(d.jpeg_quality),
                }
            }
            None => ImageOptions::default(),
        };

        let columns = match &self.columns {
            Some(c) => {
                let d = ColumnNames::default();
                ColumnNames {
                    category: c.category.clone().unwrap_or(d.category),
                    score: c.score.clone().unwrap_or(d.score),
                    title: c.title.clone().unwrap_or(d.title),
                }
            }
            None => ColumnNames::default(),
        };

        Ok(ResolvedConfig {
            title: self
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            include_projections: self.include_projections.unwrap_or(false),
            thresholds,
            effectiveness,
            projection,
            images,
            columns,
            palette: CategoryPalette::default(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Self {
        ResolvedConfig {
            title: DEFAULT_TITLE.to_string(),
            include_projections: false,
            thresholds: CategoryThresholds::default(),
            effectiveness: EffectivenessTable::default(),
            projection: ProjectionParams::default(),
            images: ImageOptions::default(),
            columns: ColumnNames::default(),
            palette: CategoryPalette::default(),
            config_path: None,
        }
    }
}

/// Discover and load the first of [`CONFIG_FILE_NAMES`] present in `dir`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(dir: &Path) -> Result<Option<(RiskshareConfig, PathBuf)>> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .map(|path| load_config_file(&path).map(|config| (config, path)))
        .transpose()
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<RiskshareConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: RiskshareConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `search_dir`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(search_dir: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(search_dir)? {
            Some((config, path)) => (config, Some(path)),
            None => (RiskshareConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
