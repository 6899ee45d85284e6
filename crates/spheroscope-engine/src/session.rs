//! Per-image analysis context with undo/redo.
//!
//! An [`AnalysisSession`] owns one live [`AnalysisSnapshot`], its
//! [`EditHistory`], the [`EngineConfig`], and the [`Scale`]. Every edit
//! mutates the live snapshot, clears the completion flag, and records a
//! deep copy. An edit that fails changes nothing and records nothing.

use image::RgbaImage;

use crate::analysis::{AnalysisSnapshot, CoreResult, WorkflowStep};
use crate::config::EngineConfig;
use crate::geometry::vertex_centroid;
use crate::history::EditHistory;
use crate::particle::Particle;
use crate::pixels::{PixelSource, is_grayscale, to_eight_bit};
use crate::refine::{ContourRefiner, RefinerKind};
use crate::report::AnalysisReport;
use crate::segment::{
    MagicWandResult, contour_from_painted, magic_wand, margin_from_painted, painted_points,
};
use crate::types::{AnalysisError, EngineError, Path, Point, RefineError, Scale, SegmentError};

/// Emitted by [`AnalysisSession::undo`] and [`AnalysisSession::redo`]
/// after the live snapshot was replaced, so callers can recompute
/// whatever depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restored {
    /// History cursor after the restore.
    pub cursor: usize,
    /// Total number of history entries.
    pub entries: usize,
}

/// The analysis of one open image.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    snapshot: AnalysisSnapshot,
    history: EditHistory<AnalysisSnapshot>,
    config: EngineConfig,
    scale: Scale,
}

impl AnalysisSession {
    /// Start an empty analysis.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `config` fails
    /// validation.
    pub fn new(config: EngineConfig, scale: Scale) -> Result<Self, EngineError> {
        config.validate()?;
        let snapshot = AnalysisSnapshot::default();
        let mut history = EditHistory::new(config.history_capacity);
        history.initialize(&snapshot);
        Ok(Self {
            snapshot,
            history,
            config,
            scale,
        })
    }

    /// The live snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &AnalysisSnapshot {
        &self.snapshot
    }

    /// The edit history.
    #[must_use]
    pub const fn history(&self) -> &EditHistory<AnalysisSnapshot> {
        &self.history
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current scale calibration.
    #[must_use]
    pub const fn scale(&self) -> Scale {
        self.scale
    }

    /// Change the scale calibration. Already placed cells keep their
    /// stored areas.
    pub const fn set_scale(&mut self, scale: Scale) {
        self.scale = scale;
    }

    /// Replace the live snapshot with a loaded one and restart history
    /// from it.
    pub fn load(&mut self, snapshot: AnalysisSnapshot) {
        self.snapshot = snapshot;
        self.history.initialize(&self.snapshot);
    }

    /// Record the live snapshot after an edit.
    fn commit(&mut self) {
        self.snapshot.is_completed = false;
        self.history.push(&self.snapshot);
    }

    /// Step 0: convert `image` to 8-bit grayscale when it is not already
    /// grayscale, and advance to the core step.
    ///
    /// Returns the converted image, or `None` when `image` can be used
    /// as is.
    pub fn prepare(&mut self, image: &RgbaImage) -> Option<RgbaImage> {
        let converted = (!is_grayscale(image)).then(|| to_eight_bit(image));
        self.snapshot.complete_preparation();
        self.commit();
        converted
    }

    /// Navigate to a workflow step. Navigation is not an edit and is not
    /// recorded.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::StepLocked`] when `step` is not unlocked.
    pub fn go_to_step(&mut self, step: WorkflowStep) -> Result<(), AnalysisError> {
        self.snapshot.go_to_step(step)
    }

    /// Select the core with the magic wand and analyze it.
    ///
    /// # Errors
    ///
    /// Propagates the [`SegmentError`] from [`magic_wand`].
    pub fn magic_wand<S: PixelSource + ?Sized>(
        &mut self,
        source: &S,
        seed: Point,
    ) -> Result<MagicWandResult, SegmentError> {
        let result = magic_wand(source, seed, &self.config)?;
        self.replace_core(result.contour.clone(), source);
        Ok(result)
    }

    /// Derive the core from a paint layer and analyze it.
    ///
    /// # Errors
    ///
    /// Propagates the [`SegmentError`] from [`contour_from_painted`].
    pub fn paint_core<S: PixelSource + ?Sized>(
        &mut self,
        mask: &RgbaImage,
        source: &S,
    ) -> Result<(), SegmentError> {
        let points = painted_points(mask, self.config.paint_sample_step);
        let contour = contour_from_painted(&points, &self.config)?;
        self.replace_core(contour, source);
        Ok(())
    }

    /// Use a hand-drawn core contour and analyze it.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ContourTooShort`] for fewer than 3 points.
    pub fn draw_core<S: PixelSource + ?Sized>(
        &mut self,
        contour: Path,
        source: &S,
    ) -> Result<(), AnalysisError> {
        if contour.len() < 3 {
            return Err(AnalysisError::ContourTooShort {
                points: contour.len(),
            });
        }
        self.replace_core(contour, source);
        Ok(())
    }

    fn replace_core<S: PixelSource + ?Sized>(&mut self, contour: Path, source: &S) {
        self.snapshot.set_core_contour(contour);
        if let Err(err) = self.snapshot.analyze_core(source) {
            log::warn!("new core contour could not be analyzed: {err}");
        }
        self.commit();
    }

    /// Re-run the core analysis on the current contour.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ContourTooShort`] when there is no usable
    /// contour.
    pub fn analyze<S: PixelSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<CoreResult, AnalysisError> {
        let result = self.snapshot.analyze_core(source)?.clone();
        self.commit();
        Ok(result)
    }

    /// Snap the core contour to nearby edges and re-analyze.
    ///
    /// Normals radiate from the analyzed center, or from the vertex mean
    /// when the core has not been analyzed.
    ///
    /// # Errors
    ///
    /// Propagates the [`RefineError`]; the prior contour is kept.
    pub fn refine<S: PixelSource>(&mut self, source: &S) -> Result<(), RefineError> {
        let contour = &self.snapshot.manual_drawn_path;
        let center = self
            .snapshot
            .last_result
            .as_ref()
            .map(CoreResult::center)
            .or_else(|| vertex_centroid(contour.points()))
            .ok_or(RefineError::ContourTooShort { points: 0 })?;
        let refined = RefinerKind::from_config(&self.config).refine(contour, center, source)?;
        self.replace_core(refined, source);
        Ok(())
    }

    /// Mark the maximum migration radius.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoCoreResult`] before core analysis.
    pub fn set_migration_point(&mut self, position: Point) -> Result<(), AnalysisError> {
        self.snapshot.set_migration_point(position)?;
        self.commit();
        Ok(())
    }

    /// Mark the halo radius.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoCoreResult`] before core analysis.
    pub fn set_halo_point(&mut self, position: Point) -> Result<(), AnalysisError> {
        self.snapshot.set_halo_point(position)?;
        self.commit();
        Ok(())
    }

    /// Place a manual cell; returns `false` for an invalid position.
    pub fn add_cell(&mut self, position: Point) -> bool {
        let added = self.snapshot.add_cell(position, self.scale);
        if added {
            self.commit();
        }
        added
    }

    /// Remove the most recent cell under `position`.
    pub fn remove_cell_at(&mut self, position: Point) -> Option<Particle> {
        let removed = self
            .snapshot
            .remove_cell_at(position, self.config.cell_hit_scale)?;
        self.commit();
        Some(removed)
    }

    /// Remove every cell.
    pub fn clear_cells(&mut self) {
        self.snapshot.clear_cells();
        self.commit();
    }

    /// Run automatic cell detection; returns the number of detected cells.
    pub fn detect_cells<S: PixelSource + ?Sized>(&mut self, source: &S) -> usize {
        let count = self.snapshot.detect_cells(source, &self.config, self.scale);
        self.commit();
        count
    }

    /// Confirm the cell count and unlock the margin step.
    pub fn confirm_cells(&mut self) {
        self.snapshot.confirm_cells();
        self.commit();
    }

    /// Use a hand-drawn migration margin.
    pub fn set_margin_path(&mut self, path: Path) {
        self.snapshot.set_margin_path(path);
        self.commit();
    }

    /// Derive the migration margin from a paint layer.
    ///
    /// # Errors
    ///
    /// Propagates the [`SegmentError`] from [`margin_from_painted`].
    pub fn paint_margin(&mut self, mask: &RgbaImage) -> Result<(), SegmentError> {
        let points = painted_points(mask, self.config.paint_sample_step);
        let margin = margin_from_painted(&points, &self.config)?;
        self.set_margin_path(margin);
        Ok(())
    }

    /// Remove the migration margin.
    pub fn clear_margin(&mut self) {
        self.snapshot.clear_margin();
        self.commit();
    }

    /// Simplify the migration margin; returns `false` when it is too short.
    pub fn smooth_margin(&mut self) -> bool {
        let smoothed = self
            .snapshot
            .smooth_margin(self.config.margin_simplify_tolerance);
        if smoothed {
            self.commit();
        }
        smoothed
    }

    /// Remove the core contour and everything derived from it.
    pub fn clear_contour(&mut self) {
        self.snapshot.clear_contour();
        self.commit();
    }

    /// Mark the analysis complete. Recorded like an edit, but the flag
    /// stays set.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::StepLocked`] outside the margin step.
    pub fn confirm_analysis(&mut self) -> Result<(), AnalysisError> {
        self.snapshot.confirm_analysis()?;
        self.history.push(&self.snapshot);
        Ok(())
    }

    /// Restore the previous history entry.
    pub fn undo(&mut self) -> Option<Restored> {
        let entry = self.history.undo()?.clone();
        self.snapshot = entry;
        Some(self.restored())
    }

    /// Restore the next history entry.
    pub fn redo(&mut self) -> Option<Restored> {
        let entry = self.history.redo()?.clone();
        self.snapshot = entry;
        Some(self.restored())
    }

    const fn restored(&self) -> Restored {
        Restored {
            cursor: self.history.cursor(),
            entries: self.history.len(),
        }
    }

    /// The report for the live snapshot, if the core has been analyzed.
    #[must_use]
    pub fn report(&self) -> Option<AnalysisReport> {
        AnalysisReport::from_snapshot(&self.snapshot, self.scale)
    }
}
