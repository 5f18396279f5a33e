//! Router configuration
//!
//! Every section deserializes with defaults, so a partial JSON file is enough.

use crate::rules::{DesignRules, MinOptMax};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// How the line placer reacts to obstacles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PnsMode {
    MarkObstacles,
    #[default]
    Shove,
    Walkaround,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CornerStyle {
    #[default]
    Square,
    Chamfer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub mode: PnsMode,
    pub allow_drc_violations: bool,
    pub shove_iteration_limit: usize,
    pub branch_search_timeout_ms: u64,
    pub cluster_area_expansion_limit: f64,
    pub follow_locked_segments: bool,
    pub start_diagonal: bool,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            mode: PnsMode::Shove,
            allow_drc_violations: false,
            shove_iteration_limit: 32,
            branch_search_timeout_ms: 100,
            cluster_area_expansion_limit: 16.0,
            follow_locked_segments: false,
            start_diagonal: false,
        }
    }
}

impl RoutingSettings {
    pub fn branch_search_timeout(&self) -> Duration {
        Duration::from_millis(self.branch_search_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanderSettings {
    pub min_amplitude: i64,
    pub max_amplitude: i64,
    pub spacing: i64,
    pub step: i64,
    pub corner_style: CornerStyle,
    pub corner_radius_percentage: i32,
    pub target_length: MinOptMax,
    pub target_skew: MinOptMax,
    pub length_tolerance: i64,
    pub single_sided: bool,
    /// +1 starts meanders on the left of the track direction, -1 on the right
    pub initial_side: i32,
}

impl Default for MeanderSettings {
    fn default() -> Self {
        Self {
            min_amplitude: 200_000,
            max_amplitude: 1_000_000,
            spacing: 600_000,
            step: 50_000,
            corner_style: CornerStyle::Square,
            corner_radius_percentage: 80,
            target_length: MinOptMax::range(99_900_000, 100_000_000, 100_100_000),
            target_skew: MinOptMax::range(-100_000, 0, 100_000),
            length_tolerance: 100_000,
            single_sided: false,
            initial_side: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizesSettings {
    pub track_width: i64,
    pub via_diameter: i64,
    pub via_drill: i64,
    pub diff_pair_width: i64,
    pub diff_pair_gap: i64,
    pub via_layers: (i32, i32),
}

impl Default for SizesSettings {
    fn default() -> Self {
        Self {
            track_width: 250_000,
            via_diameter: 600_000,
            via_drill: 300_000,
            diff_pair_width: 200_000,
            diff_pair_gap: 180_000,
            via_layers: (0, 1),
        }
    }
}

impl SizesSettings {
    /// The other layer of the via pair
    pub fn paired_layer(&self, layer: i32) -> i32 {
        let (top, bottom) = self.via_layers;
        if layer == top {
            bottom
        } else {
            top
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub routing: RoutingSettings,
    pub meander: MeanderSettings,
    pub sizes: SizesSettings,
    pub rules: DesignRules,
}

impl RouterConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse router configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read router configuration {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg = RouterConfig::from_json_str(r#"{ "routing": { "mode": "Walkaround" }, "sizes": { "track_width": 150000 } }"#)
            .unwrap();
        assert_eq!(cfg.routing.mode, PnsMode::Walkaround);
        assert_eq!(cfg.routing.shove_iteration_limit, 32);
        assert_eq!(cfg.sizes.track_width, 150_000);
        assert_eq!(cfg.sizes.via_drill, 300_000);
        assert_eq!(cfg.routing.branch_search_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_bad_config_reports_context() {
        let err = RouterConfig::from_json_str("{ not json").unwrap_err();
        assert!(err.to_string().contains("router configuration"));
    }
}
