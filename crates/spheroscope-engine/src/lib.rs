//! spheroscope-engine: Pure spheroid migration analysis engine (sans-IO).
//!
//! Turns a microscopy image and a few user inputs into a core contour,
//! migration radii, cell positions, and morphometric measurements:
//! region growing -> radial contour -> simplification -> optional
//! edge refinement -> shape and texture metrics.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers and returns structured data. Every operation is
//! synchronous; a caller sharing an analysis between threads must
//! serialize access to it.
//!
//! The per-image entry point is [`AnalysisSession`], which wraps an
//! [`AnalysisSnapshot`] with undo/redo. The free functions in each
//! module are usable on their own.

pub mod analysis;
pub mod config;
pub mod geometry;
pub mod history;
pub mod hull;
pub mod morphometry;
pub mod particle;
pub mod pixels;
pub mod refine;
pub mod report;
pub mod segment;
pub mod session;
pub mod simplify;
pub mod types;

pub use analysis::{AnalysisSnapshot, CoreResult, MaxRadiusData, RadiusData, WorkflowStep};
pub use config::{CellPolarity, EngineConfig};
pub use history::EditHistory;
pub use morphometry::{MorphologyResult, calculate_morphological_metrics};
pub use particle::{Ellipse, Particle};
pub use pixels::PixelSource;
pub use refine::{ContourRefiner, RefinerKind};
pub use report::AnalysisReport;
pub use segment::{MagicWandResult, magic_wand};
pub use session::{AnalysisSession, Restored};
pub use types::{
    AnalysisError, Dimensions, EngineError, GrayImage, Path, Point, RefineError, RgbaImage, Scale,
    SegmentError,
};
