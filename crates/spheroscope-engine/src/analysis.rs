//! The mutable analysis record for one image and its workflow operations.
//!
//! An [`AnalysisSnapshot`] holds everything a user edits: the core
//! contour, the migration margin, the cells, the radii, and the derived
//! [`CoreResult`]. Every method here is synchronous and touches only the
//! snapshot it is called on; history and configuration live in
//! [`AnalysisSession`](crate::session::AnalysisSession).

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::geometry::{nearest_point_at_angle, point_in_polygon, polygon_area, vertex_centroid};
use crate::morphometry::{MorphologyResult, calculate_morphological_metrics};
use crate::particle::{Particle, find_cell_components};
use crate::pixels::PixelSource;
use crate::simplify::simplify;
use crate::types::{AnalysisError, Path, Point, Scale};

/// The five workflow steps, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    /// Convert the image to 8-bit grayscale.
    #[default]
    Prepare,
    /// Define the core contour.
    Core,
    /// Mark the halo and maximum migration radii.
    Radii,
    /// Place or detect migrated cells.
    Cells,
    /// Define the migration margin and confirm.
    Margin,
}

impl WorkflowStep {
    /// All steps in workflow order.
    pub const ALL: [Self; 5] = [
        Self::Prepare,
        Self::Core,
        Self::Radii,
        Self::Cells,
        Self::Margin,
    ];

    /// Zero-based step index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// The step with the given index, if any.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// The following step, saturating at [`Margin`](Self::Margin).
    #[must_use]
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1).unwrap_or(Self::Margin)
    }
}

/// A radius marked from the core center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusData {
    /// Distance from the center in pixels.
    pub radius: f64,
    /// Bearing from the center in radians.
    pub angle: f64,
}

/// The point marking the maximum migration radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxRadiusData {
    /// The marked position.
    pub point: Point,
    /// Bearing of `point` from the center in radians.
    pub angle: f64,
}

/// Derived measurements of the current core contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreResult {
    /// Center x (mean of the contour vertices).
    pub center_x: f64,
    /// Center y (mean of the contour vertices).
    pub center_y: f64,
    /// Mean distance from the center to the contour vertices.
    pub core_radius: f64,
    /// Number of cells at the last count.
    pub cell_count: usize,
    /// Shape and texture metrics of the contour.
    pub morphology: MorphologyResult,
    /// Maximum migration radius from the center, once marked.
    pub max_radius: Option<f64>,
    /// Where the maximum radius was marked.
    pub max_radius_data: Option<MaxRadiusData>,
    /// Distance from the contour to the maximum radius along its bearing.
    pub max_migration: Option<f64>,
    /// Distance from the contour to the halo radius along its bearing.
    pub halo_migration: Option<f64>,
}

impl CoreResult {
    /// The center as a point.
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }
}

/// The editable state of one image's analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    /// Core contour (closed by convention).
    pub manual_drawn_path: Path,
    /// Outer boundary of the migrated cells.
    pub migration_margin_path: Path,
    /// Cells placed or detected so far.
    pub particles: Vec<Particle>,
    /// Halo radius, once marked.
    pub halo_radius_data: Option<RadiusData>,
    /// Result of the last core analysis.
    pub last_result: Option<CoreResult>,
    /// Set by [`confirm_analysis`](Self::confirm_analysis); cleared by
    /// any later edit.
    pub is_completed: bool,
    /// Current workflow step.
    pub workflow_step: WorkflowStep,
    /// Whether the cell count has been confirmed.
    pub cells_confirmed: bool,
}

impl AnalysisSnapshot {
    /// The furthest step the user may navigate to.
    ///
    /// Preparation and the core step are always open; a non-empty core
    /// contour opens radii and cells; a confirmed cell count opens the
    /// margin step.
    #[must_use]
    pub fn unlocked_step(&self) -> WorkflowStep {
        if self.manual_drawn_path.is_empty() {
            WorkflowStep::Core
        } else if self.cells_confirmed {
            WorkflowStep::Margin
        } else {
            WorkflowStep::Cells
        }
    }

    /// Navigate to `step`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::StepLocked`] if `step` is beyond
    /// [`unlocked_step`](Self::unlocked_step).
    pub fn go_to_step(&mut self, step: WorkflowStep) -> Result<(), AnalysisError> {
        if step > self.unlocked_step() {
            return Err(AnalysisError::StepLocked {
                requested: step.index(),
            });
        }
        self.workflow_step = step;
        Ok(())
    }

    /// Mark the 8-bit preparation done, advancing Prepare to Core.
    pub fn complete_preparation(&mut self) {
        self.advance_from(WorkflowStep::Prepare);
    }

    fn advance_from(&mut self, step: WorkflowStep) {
        if self.workflow_step == step {
            self.workflow_step = step.next();
        }
    }

    /// Replace the core contour. Derived results are not recomputed;
    /// call [`analyze_core`](Self::analyze_core) afterwards.
    pub fn set_core_contour(&mut self, contour: Path) {
        self.manual_drawn_path = contour;
    }

    /// Measure the core contour.
    ///
    /// Computes the morphology, the vertex-mean center, the mean core
    /// radius, and the cell count. A previously marked maximum radius is
    /// kept, migration distances are recomputed, and the workflow
    /// advances from Core to Radii.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ContourTooShort`] when the core contour
    /// has fewer than 3 points; the previous result is left untouched.
    #[allow(clippy::cast_precision_loss)]
    pub fn analyze_core<S: PixelSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<&CoreResult, AnalysisError> {
        let path = self.manual_drawn_path.points();
        let Some(center) = vertex_centroid(path).filter(|_| path.len() >= 3) else {
            return Err(AnalysisError::ContourTooShort { points: path.len() });
        };

        let morphology = calculate_morphological_metrics(&self.manual_drawn_path, source);
        let core_radius =
            path.iter().map(|p| p.distance(center)).sum::<f64>() / path.len() as f64;

        let previous = self.last_result.take();
        self.last_result = Some(CoreResult {
            center_x: center.x,
            center_y: center.y,
            core_radius,
            cell_count: self.particles.len(),
            morphology,
            max_radius: previous.as_ref().and_then(|r| r.max_radius),
            max_radius_data: previous.as_ref().and_then(|r| r.max_radius_data),
            max_migration: None,
            halo_migration: None,
        });
        self.update_migration_metrics();
        self.advance_from(WorkflowStep::Core);

        log::debug!(
            "core analyzed: center ({:.1}, {:.1}), radius {core_radius:.1}",
            center.x,
            center.y
        );
        self.last_result.as_ref().ok_or(AnalysisError::NoCoreResult)
    }

    /// Mark the maximum migration radius at `position` and advance from
    /// Radii to Cells.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoCoreResult`] before the core has been
    /// analyzed.
    pub fn set_migration_point(&mut self, position: Point) -> Result<(), AnalysisError> {
        let result = self
            .last_result
            .as_mut()
            .ok_or(AnalysisError::NoCoreResult)?;
        let center = result.center();
        result.max_radius = Some(position.distance(center));
        result.max_radius_data = Some(MaxRadiusData {
            point: position,
            angle: position.bearing_from(center),
        });
        self.update_migration_metrics();
        self.advance_from(WorkflowStep::Radii);
        Ok(())
    }

    /// Mark the halo radius at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoCoreResult`] before the core has been
    /// analyzed.
    pub fn set_halo_point(&mut self, position: Point) -> Result<(), AnalysisError> {
        let center = self
            .last_result
            .as_ref()
            .ok_or(AnalysisError::NoCoreResult)?
            .center();
        self.halo_radius_data = Some(RadiusData {
            radius: position.distance(center),
            angle: position.bearing_from(center),
        });
        self.update_migration_metrics();
        Ok(())
    }

    /// Recompute both migration distances from the current contour and
    /// radii; a distance whose inputs are missing is cleared.
    fn update_migration_metrics(&mut self) {
        let Some(result) = self.last_result.as_mut() else {
            return;
        };
        let center = result.center();
        let contour = self.manual_drawn_path.points();
        let migration = |radius: f64, angle: f64| {
            if contour.len() <= 2 {
                return None;
            }
            let start = nearest_point_at_angle(contour, center, angle)?;
            Some(start.distance(center.offset_polar(angle, radius)))
        };

        result.max_migration = match (result.max_radius, result.max_radius_data) {
            (Some(radius), Some(data)) => migration(radius, data.angle),
            _ => None,
        };
        result.halo_migration = self
            .halo_radius_data
            .and_then(|halo| migration(halo.radius, halo.angle));
    }

    /// Whether a cell may be placed at `position`: the core must be
    /// analyzed with a contour of at least 3 points, `position` must lie
    /// outside the contour, and within the maximum radius when one is
    /// marked.
    #[must_use]
    pub fn is_cell_position_valid(&self, position: Point) -> bool {
        let Some(result) = self.last_result.as_ref() else {
            return false;
        };
        let contour = self.manual_drawn_path.points();
        if contour.len() < 3 || point_in_polygon(position, contour) {
            return false;
        }
        result
            .max_radius
            .is_none_or(|max| position.distance(result.center()) <= max)
    }

    /// Place a manual cell. Returns `false` (and changes nothing) when the
    /// position is not valid.
    pub fn add_cell(&mut self, position: Point, scale: Scale) -> bool {
        if !self.is_cell_position_valid(position) {
            return false;
        }
        self.particles.push(Particle::manual(position, scale));
        self.sync_cell_count();
        true
    }

    /// Remove the most recently added cell whose ellipse, with radii
    /// multiplied by `hit_scale`, contains `position`.
    pub fn remove_cell_at(&mut self, position: Point, hit_scale: f64) -> Option<Particle> {
        let index = self
            .particles
            .iter()
            .rposition(|p| p.ellipse.contains(position, hit_scale))?;
        let removed = self.particles.remove(index);
        self.sync_cell_count();
        Some(removed)
    }

    /// Remove every cell.
    pub fn clear_cells(&mut self) {
        self.particles.clear();
        self.cells_confirmed = false;
        self.sync_cell_count();
    }

    /// Record the cell count, unlock the margin step, and advance from
    /// Cells to Margin.
    pub fn confirm_cells(&mut self) {
        self.sync_cell_count();
        self.cells_confirmed = true;
        self.advance_from(WorkflowStep::Cells);
    }

    fn sync_cell_count(&mut self) {
        let count = self.particles.len();
        if let Some(result) = self.last_result.as_mut() {
            result.cell_count = count;
        }
    }

    /// Replace the detected cells with a fresh automatic detection.
    ///
    /// Manual cells are kept. Returns the number of detected cells.
    pub fn detect_cells<S: PixelSource + ?Sized>(
        &mut self,
        source: &S,
        config: &EngineConfig,
        scale: Scale,
    ) -> usize {
        self.particles.retain(|p| p.is_manual);
        let detected: Vec<Particle> = find_cell_components(source, config)
            .iter()
            .filter_map(|pixels| Particle::from_pixels(pixels, scale, false))
            .filter(|p| self.is_cell_position_valid(p.centroid))
            .collect();
        let count = detected.len();
        self.particles.extend(detected);
        self.sync_cell_count();
        log::debug!("detected {count} cells, {} total", self.particles.len());
        count
    }

    /// Replace the migration margin.
    pub fn set_margin_path(&mut self, path: Path) {
        self.migration_margin_path = path;
    }

    /// Remove the migration margin.
    pub fn clear_margin(&mut self) {
        self.migration_margin_path = Path::default();
    }

    /// Simplify the margin with Ramer-Douglas-Peucker. Returns `false`
    /// when the margin has fewer than 3 points.
    pub fn smooth_margin(&mut self, tolerance: f64) -> bool {
        if self.migration_margin_path.len() < 3 {
            return false;
        }
        self.migration_margin_path = simplify(self.migration_margin_path.points(), tolerance);
        true
    }

    /// Area between the margin and the core, in square pixels.
    ///
    /// `None` without a core result or with a margin of 2 points or fewer.
    /// The value may be negative when the margin lies inside the core.
    #[must_use]
    pub fn migration_area(&self) -> Option<f64> {
        let result = self.last_result.as_ref()?;
        if self.migration_margin_path.len() <= 2 {
            return None;
        }
        Some(polygon_area(self.migration_margin_path.points()) - result.morphology.area)
    }

    /// Mark the analysis complete.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::StepLocked`] unless the workflow is at the
    /// margin step.
    pub fn confirm_analysis(&mut self) -> Result<(), AnalysisError> {
        if self.workflow_step != WorkflowStep::Margin {
            return Err(AnalysisError::StepLocked {
                requested: WorkflowStep::Margin.index(),
            });
        }
        self.is_completed = true;
        Ok(())
    }

    /// Remove the core contour and everything derived from it: the last
    /// result, the halo, and the cells.
    pub fn clear_contour(&mut self) {
        self.manual_drawn_path = Path::default();
        self.last_result = None;
        self.halo_radius_data = None;
        self.particles.clear();
        self.cells_confirmed = false;
    }
}
