use std::fs;
use std::path::Path;

use anyhow::{ensure, Context as AnyhowContext, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// How the perceptual maps encode their evidence
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMode {
    /// Hard thresholds, every value is 0 or 1
    Binary,
    /// Logistic / Gaussian squashing into [0, 1]
    Probability,
}

/// Which strategy proposes the elbow joints
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Coordinate-wise random search over the rendered arm outline
    Outline,
    /// Argmax of Gaussian priors times evidence
    Heatmap,
}

#[derive(Clone, Debug, PartialEq, Parser, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[clap(long, default_value = "0")]
    pub seed: u64,

    #[clap(long, value_enum, default_value = "binary")]
    pub field_mode: FieldMode,

    /// Fixed part of the background difference threshold
    #[clap(long, default_value = "16")]
    pub foreground_threshold: f32,

    /// Part of the threshold proportional to the pixel brightness
    #[clap(long, default_value = "0.25")]
    pub foreground_relative: f32,

    /// Logistic scale of the foreground probability
    #[clap(long, default_value = "8")]
    pub foreground_softness: f32,

    #[clap(long, default_value = "0.6")]
    pub skin_red: f32,

    #[clap(long, default_value = "0.3")]
    pub skin_green: f32,

    #[clap(long, default_value = "0.3")]
    pub skin_blue: f32,

    #[clap(long, default_value = "2")]
    pub skin_lower: f32,

    #[clap(long, default_value = "255")]
    pub skin_upper: f32,

    #[clap(long, default_value = "13")]
    pub skin_center: f32,

    #[clap(long, default_value = "6")]
    pub skin_spread: f32,

    #[clap(long, default_value = "16")]
    pub motion_threshold: f32,

    /// Side of the square smoothing window applied before region extraction
    #[clap(long, default_value = "9")]
    pub blur_size: usize,

    #[clap(long, default_value = "0.5")]
    pub blur_threshold: f32,

    #[clap(long, default_value = "64")]
    pub min_region_area: usize,

    #[clap(long, default_value = "3")]
    pub max_candidates: usize,

    #[clap(long, default_value = "3")]
    pub min_candidates: usize,

    /// The no-match cost is diagonal^2 / sentinel_divisor
    #[clap(long, default_value = "64")]
    pub sentinel_divisor: f64,

    /// Move hands to the region boundary point farthest from the shoulder
    #[clap(long)]
    pub refine_hands: bool,

    /// Start tracking once something covers the frame centre
    #[clap(long)]
    pub wait_for_presence: bool,

    #[clap(long, default_value = "8")]
    pub edge_low: f32,

    #[clap(long, default_value = "16")]
    pub edge_high: f32,

    #[clap(long, value_enum, default_value = "outline")]
    pub strategy: StrategyKind,

    #[clap(long, default_value = "200")]
    pub iterations: usize,

    #[clap(long, default_value = "8")]
    pub step_radius: f64,

    #[clap(long, default_value = "5")]
    pub stroke_width: f64,

    #[clap(long, default_value = "1")]
    pub overlap_weight: f64,

    #[clap(long, default_value = "12")]
    pub spatial_sigma: f64,

    #[clap(long, default_value = "24")]
    pub anatomical_sigma: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["upose"])
    }
}

impl Config {
    /// Load a JSON config, missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// A config file replaces the command-line tracking flags as a whole.
    /// Keys it leaves out take their defaults, not the flag values.
    pub fn resolve(self, config_file: Option<&Path>) -> Result<Config> {
        match config_file {
            Some(path) => Config::from_json_file(path),
            None => {
                self.validate()?;
                Ok(self)
            }
        }
    }

    /// Search radius and prior widths must be usable numbers
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.step_radius.is_finite(),
            "step_radius must be finite, got {}",
            self.step_radius
        );
        for (name, sigma) in [
            ("spatial_sigma", self.spatial_sigma),
            ("anatomical_sigma", self.anatomical_sigma),
        ] {
            ensure!(
                sigma.is_finite() && sigma > 0.,
                "{name} must be finite and positive, got {sigma}"
            );
        }
        Ok(())
    }
}
