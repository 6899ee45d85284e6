//! Final measurements of an analysis in physical units.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisSnapshot;
use crate::types::Scale;

/// Summary row for one analyzed image.
///
/// Lengths are in micrometers and areas in square micrometers; the
/// shape and texture metrics are dimensionless or in gray levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Mean core radius.
    pub core_radius_um: f64,
    /// Contour-to-halo distance (0 when no halo is marked).
    pub halo_migration_um: f64,
    /// Contour-to-maximum-radius distance (0 when not marked).
    pub max_migration_um: f64,
    /// Number of cells at the last count.
    pub cell_count: usize,
    /// Area between margin and core, 0 when negative or undefined.
    pub migration_area_um2: f64,
    /// Largest vertex-to-vertex distance of the core contour.
    pub max_diameter_um: f64,
    /// See [`MorphologyResult::circularity`](crate::morphometry::MorphologyResult::circularity).
    pub circularity: f64,
    /// Sphericity of the core contour.
    pub sphericity: f64,
    /// Compactness of the core contour.
    pub compactness: f64,
    /// Solidity of the core contour.
    pub solidity: f64,
    /// Convexity of the core contour.
    pub convexity: f64,
    /// Gray-level entropy inside the core.
    pub entropy: f64,
    /// Gray-level skewness inside the core.
    pub skewness: f64,
    /// Gray-level kurtosis inside the core.
    pub kurtosis: f64,
    /// Mean gray level inside the core.
    pub mean: f64,
    /// Gray-level sample variance inside the core.
    pub variance: f64,
    /// Mean gradient magnitude inside the core.
    pub mean_gradient: f64,
    /// Gradient magnitude variance inside the core.
    pub variance_gradient: f64,
    /// Whether the analysis was confirmed.
    pub is_completed: bool,
}

impl AnalysisReport {
    /// Build the report for `snapshot`, converting with `scale`.
    ///
    /// Returns `None` before the core has been analyzed.
    #[must_use]
    pub fn from_snapshot(snapshot: &AnalysisSnapshot, scale: Scale) -> Option<Self> {
        let result = snapshot.last_result.as_ref()?;
        let m = &result.morphology;
        Some(Self {
            core_radius_um: scale.to_micrometers(result.core_radius),
            halo_migration_um: scale.to_micrometers(result.halo_migration.unwrap_or(0.0)),
            max_migration_um: scale.to_micrometers(result.max_migration.unwrap_or(0.0)),
            cell_count: result.cell_count,
            migration_area_um2: scale
                .to_square_micrometers(snapshot.migration_area().unwrap_or(0.0).max(0.0)),
            max_diameter_um: scale.to_micrometers(m.diameter),
            circularity: m.circularity,
            sphericity: m.sphericity,
            compactness: m.compactness,
            solidity: m.solidity,
            convexity: m.convexity,
            entropy: m.entropy,
            skewness: m.skewness,
            kurtosis: m.kurtosis,
            mean: m.mean,
            variance: m.variance,
            mean_gradient: m.mean_gradient,
            variance_gradient: m.variance_gradient,
            is_completed: snapshot.is_completed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::types::{Path, Point};

    #[test]
    fn no_report_before_analysis() {
        assert!(AnalysisReport::from_snapshot(&AnalysisSnapshot::default(), Scale::default()).is_none());
    }

    #[test]
    fn converts_to_micrometers() {
        let img = GrayImage::from_pixel(100, 100, Luma([80]));
        let mut snapshot = AnalysisSnapshot::default();
        snapshot.set_core_contour(
            Path::new(vec![
                Point::new(40.0, 40.0),
                Point::new(60.0, 40.0),
                Point::new(60.0, 60.0),
                Point::new(40.0, 60.0),
            ])
            .closed(),
        );
        snapshot.analyze_core(&img).unwrap();
        // Margin smaller than the core: area clamps at 0.
        snapshot.set_margin_path(
            Path::new(vec![
                Point::new(45.0, 45.0),
                Point::new(55.0, 45.0),
                Point::new(55.0, 55.0),
            ])
            .closed(),
        );

        // 2 px per µm.
        let scale = Scale::new(2.0, 1.0);
        let report = AnalysisReport::from_snapshot(&snapshot, scale).unwrap();
        let result = snapshot.last_result.as_ref().unwrap();
        assert!((report.core_radius_um - result.core_radius / 2.0).abs() < 1e-12);
        assert!((report.max_diameter_um - 800.0f64.sqrt() / 2.0).abs() < 1e-9);
        assert!(report.migration_area_um2.abs() < f64::EPSILON);
        assert!(report.max_migration_um.abs() < f64::EPSILON);
        assert!((report.mean - 80.0).abs() < 1e-9);
        assert!(!report.is_completed);
    }
}
