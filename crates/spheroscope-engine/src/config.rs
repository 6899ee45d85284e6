//! Tunable parameters for segmentation, refinement, and the workflow.

use serde::{Deserialize, Serialize};

use crate::types::EngineError;

/// Which side of the Otsu threshold counts as a cell during automatic
/// detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellPolarity {
    /// Cells are brighter than the background (fluorescence, inverted
    /// phase contrast).
    #[default]
    Bright,
    /// Cells are darker than the background (bright-field).
    Dark,
}

/// Configuration for the analysis engine.
///
/// All parameters have defaults matching the interactive tool's behavior.
/// Fields are public; call [`validate`](Self::validate) after building a
/// config from untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum red-channel difference from the seed accepted by region
    /// growing.
    pub magic_wand_tolerance: u8,

    /// Noise floor for region growing: a blob must have strictly more
    /// pixels than this to produce a contour.
    pub min_blob_pixels: usize,

    /// Ramer-Douglas-Peucker tolerance applied to radial core contours.
    pub contour_simplify_tolerance: f64,

    /// Half-length in pixels of the brightness profile sampled along
    /// each vertex normal during refinement.
    pub refine_search_distance: u32,

    /// Moving-average window applied after refinement relocates the
    /// vertices.
    pub refine_smoothing_window: usize,

    /// Ramer-Douglas-Peucker tolerance used by margin smoothing.
    pub margin_simplify_tolerance: f64,

    /// Sampling stride in pixels when collecting painted points.
    pub paint_sample_step: u32,

    /// Minimum number of painted sample points for a painted outline.
    pub min_painted_points: usize,

    /// Maximum number of snapshots kept by the edit history.
    pub history_capacity: usize,

    /// Smallest connected component (in pixels) accepted as a cell by
    /// automatic detection.
    pub cell_min_pixels: usize,

    /// Foreground side of the automatic detection threshold.
    pub cell_polarity: CellPolarity,

    /// Factor applied to cell ellipse radii when hit-testing removals.
    pub cell_hit_scale: f64,
}

impl EngineConfig {
    /// Default region-growing tolerance.
    pub const DEFAULT_MAGIC_WAND_TOLERANCE: u8 = 10;
    /// Default blob noise floor.
    pub const DEFAULT_MIN_BLOB_PIXELS: usize = 20;
    /// Default core contour simplification tolerance.
    pub const DEFAULT_CONTOUR_SIMPLIFY_TOLERANCE: f64 = 1.5;
    /// Default refinement search distance.
    pub const DEFAULT_REFINE_SEARCH_DISTANCE: u32 = 20;
    /// Default refinement smoothing window.
    pub const DEFAULT_REFINE_SMOOTHING_WINDOW: usize = 7;
    /// Default margin smoothing tolerance.
    pub const DEFAULT_MARGIN_SIMPLIFY_TOLERANCE: f64 = 5.0;
    /// Default painted-point sampling stride.
    pub const DEFAULT_PAINT_SAMPLE_STEP: u32 = 2;
    /// Default minimum number of painted points.
    pub const DEFAULT_MIN_PAINTED_POINTS: usize = 20;
    /// Default edit history capacity.
    pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
    /// Default minimum cell size for automatic detection.
    pub const DEFAULT_CELL_MIN_PIXELS: usize = 30;
    /// Default removal hit-test scale.
    pub const DEFAULT_CELL_HIT_SCALE: f64 = 2.0;

    /// Check the invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] naming the first offending
    /// field when a tolerance is negative or non-finite, a stride or
    /// capacity is zero, or the hit scale is not positive.
    pub fn validate(&self) -> Result<(), EngineError> {
        let non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {v}"
                )))
            }
        };
        non_negative("contour_simplify_tolerance", self.contour_simplify_tolerance)?;
        non_negative("margin_simplify_tolerance", self.margin_simplify_tolerance)?;

        if self.paint_sample_step == 0 {
            return Err(EngineError::InvalidConfig(
                "paint_sample_step must be at least 1".to_owned(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "history_capacity must be at least 1".to_owned(),
            ));
        }
        if !(self.cell_hit_scale.is_finite() && self.cell_hit_scale > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "cell_hit_scale must be positive, got {}",
                self.cell_hit_scale
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            magic_wand_tolerance: Self::DEFAULT_MAGIC_WAND_TOLERANCE,
            min_blob_pixels: Self::DEFAULT_MIN_BLOB_PIXELS,
            contour_simplify_tolerance: Self::DEFAULT_CONTOUR_SIMPLIFY_TOLERANCE,
            refine_search_distance: Self::DEFAULT_REFINE_SEARCH_DISTANCE,
            refine_smoothing_window: Self::DEFAULT_REFINE_SMOOTHING_WINDOW,
            margin_simplify_tolerance: Self::DEFAULT_MARGIN_SIMPLIFY_TOLERANCE,
            paint_sample_step: Self::DEFAULT_PAINT_SAMPLE_STEP,
            min_painted_points: Self::DEFAULT_MIN_PAINTED_POINTS,
            history_capacity: Self::DEFAULT_HISTORY_CAPACITY,
            cell_min_pixels: Self::DEFAULT_CELL_MIN_PIXELS,
            cell_polarity: CellPolarity::default(),
            cell_hit_scale: Self::DEFAULT_CELL_HIT_SCALE,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.magic_wand_tolerance, 10);
        assert_eq!(config.min_blob_pixels, 20);
        assert!((config.contour_simplify_tolerance - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.refine_search_distance, 20);
        assert_eq!(config.refine_smoothing_window, 7);
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.cell_polarity, CellPolarity::Bright);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = EngineConfig {
            margin_simplify_tolerance: -1.0,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("margin_simplify_tolerance"));

        let config = EngineConfig {
            paint_sample_step: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));

        let config = EngineConfig {
            cell_hit_scale: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"magic_wand_tolerance": 25, "cell_polarity": "dark"}"#)
                .unwrap();
        assert_eq!(config.magic_wand_tolerance, 25);
        assert_eq!(config.cell_polarity, CellPolarity::Dark);
        assert_eq!(config.history_capacity, EngineConfig::DEFAULT_HISTORY_CAPACITY);
    }
}
