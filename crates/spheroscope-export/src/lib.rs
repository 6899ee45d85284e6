//! spheroscope-export: Pure overlay serializers (sans-IO)
//!
//! Renders an analysis snapshot as an overlay in image coordinates.
//! Currently supports SVG.

pub mod svg;

pub use svg::{SvgMetadata, build_path_data, to_svg};
