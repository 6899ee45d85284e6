//! Pixel access, image decoding, and 8-bit grayscale preparation.
//!
//! Every routine in the engine reads pixels through [`PixelSource`] and
//! derives brightness the same way: `0.299*R + 0.587*G + 0.114*B`.
//! Converting an image to 8-bit grayscale (workflow step 0) makes the
//! red channel equal to that luma, which is what region growing keys on.

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::types::{Dimensions, EngineError, Point};

/// Maximum number of pixels sampled by [`is_grayscale`].
const GRAYSCALE_SAMPLE_LIMIT: usize = 500;

/// Per-channel difference tolerated by [`is_grayscale`] (compression
/// artifacts).
const GRAYSCALE_CHANNEL_TOLERANCE: u8 = 2;

/// Read-only view of an RGBA raster.
///
/// The caller guarantees `(x, y)` lies inside [`dimensions`](Self::dimensions)
/// when calling [`rgba`](Self::rgba); bounds-aware access goes through
/// [`luma_at`].
pub trait PixelSource {
    /// Raster size in pixels.
    fn dimensions(&self) -> Dimensions;

    /// The `(r, g, b, a)` bytes of the pixel at `(x, y)`.
    fn rgba(&self, x: u32, y: u32) -> [u8; 4];

    /// Red channel of the pixel at `(x, y)`.
    fn red(&self, x: u32, y: u32) -> u8 {
        self.rgba(x, y)[0]
    }

    /// Luma of the pixel at `(x, y)`.
    fn luma(&self, x: u32, y: u32) -> f64 {
        let [r, g, b, _] = self.rgba(x, y);
        0.114f64.mul_add(
            f64::from(b),
            0.299f64.mul_add(f64::from(r), 0.587 * f64::from(g)),
        )
    }

    /// Luma of the pixel at `(x, y)` rounded to an 8-bit gray level.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn gray_level(&self, x: u32, y: u32) -> u8 {
        self.luma(x, y).round().clamp(0.0, 255.0) as u8
    }
}

impl PixelSource for RgbaImage {
    fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        self.get_pixel(x, y).0
    }
}

impl PixelSource for GrayImage {
    fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let v = self.get_pixel(x, y).0[0];
        [v, v, v, 255]
    }

    fn gray_level(&self, x: u32, y: u32) -> u8 {
        self.get_pixel(x, y).0[0]
    }
}

/// Luma at a possibly out-of-bounds position. Positions outside the
/// raster read as 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn luma_at<S: PixelSource + ?Sized>(source: &S, x: i64, y: i64) -> f64 {
    if source.dimensions().contains(x, y) {
        source.luma(x as u32, y as u32)
    } else {
        0.0
    }
}

/// Luma at the pixel nearest to a sub-pixel position (0 outside).
#[allow(clippy::cast_possible_truncation)]
pub fn luma_nearest<S: PixelSource + ?Sized>(source: &S, p: Point) -> f64 {
    if !(p.x.is_finite() && p.y.is_finite()) {
        return 0.0;
    }
    luma_at(source, p.x.round() as i64, p.y.round() as i64)
}

/// Decode raw image bytes into an RGBA raster.
///
/// Supports whatever the enabled `image` codecs decode (PNG, JPEG, BMP,
/// TIFF, WebP).
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] if `bytes` is empty.
/// Returns [`EngineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

/// Returns `true` if the image looks grayscale.
///
/// Samples up to 500 pixels on an even stride through the raster: the
/// image is grayscale when every sample has its green and blue channels
/// within 2 of red. An empty image counts as grayscale.
pub fn is_grayscale<S: PixelSource + ?Sized>(source: &S) -> bool {
    let dims = source.dimensions();
    let total = dims.pixel_count();
    if total == 0 {
        return true;
    }
    let samples = total.min(GRAYSCALE_SAMPLE_LIMIT);
    let stride = total / samples;
    let width = dims.width as usize;

    (0..samples).all(|i| {
        let index = i * stride;
        #[allow(clippy::cast_possible_truncation)]
        let (x, y) = ((index % width) as u32, (index / width) as u32);
        let [r, g, b, _] = source.rgba(x, y);
        r.abs_diff(g) <= GRAYSCALE_CHANNEL_TOLERANCE && r.abs_diff(b) <= GRAYSCALE_CHANNEL_TOLERANCE
    })
}

/// Convert an image to 8-bit grayscale, keeping it in RGBA layout.
///
/// Each pixel's RGB channels are replaced with its rounded luma; alpha
/// is preserved.
#[must_use = "returns the converted image"]
pub fn to_eight_bit<S: PixelSource + ?Sized>(source: &S) -> RgbaImage {
    let dims = source.dimensions();
    RgbaImage::from_fn(dims.width, dims.height, |x, y| {
        let v = source.gray_level(x, y);
        let alpha = source.rgba(x, y)[3];
        Rgba([v, v, v, alpha])
    })
}

/// Single-channel copy of the source's gray levels.
#[must_use = "returns the grayscale image"]
pub fn to_gray_image<S: PixelSource + ?Sized>(source: &S) -> GrayImage {
    let dims = source.dimensions();
    GrayImage::from_fn(dims.width, dims.height, |x, y| {
        Luma([source.gray_level(x, y)])
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as a PNG byte buffer.
    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(EngineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(EngineError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_decodes_with_dimensions() {
        let img = RgbaImage::from_pixel(17, 31, Rgba([128, 64, 32, 255]));
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (17, 31));
        assert_eq!(decoded.get_pixel(3, 3).0, [128, 64, 32, 255]);
    }

    #[test]
    fn luma_weights_green_highest() {
        let img = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([255, 0, 0, 255]),
            1 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let (r, g, b) = (img.luma(0, 0), img.luma(1, 0), img.luma(2, 0));
        assert!((r - 76.245).abs() < 1e-9);
        assert!(g > r && r > b, "got R={r} G={g} B={b}");
        assert_eq!(img.gray_level(1, 0), 150);
    }

    #[test]
    fn out_of_bounds_reads_zero() {
        let img = GrayImage::from_pixel(2, 2, Luma([200]));
        assert!((luma_at(&img, 1, 1) - 200.0).abs() < 1e-9);
        assert!(luma_at(&img, -1, 0).abs() < f64::EPSILON);
        assert!(luma_at(&img, 0, 2).abs() < f64::EPSILON);
        assert!(luma_nearest(&img, Point::new(1.4, 0.6)) > 0.0);
        assert!(luma_nearest(&img, Point::new(f64::NAN, 0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn grayscale_detection() {
        let gray = RgbaImage::from_pixel(30, 30, Rgba([90, 91, 89, 255]));
        assert!(is_grayscale(&gray));

        let mut colored = gray.clone();
        colored.put_pixel(0, 0, Rgba([200, 10, 10, 255]));
        assert!(!is_grayscale(&colored));

        assert!(is_grayscale(&RgbaImage::new(0, 0)));
    }

    #[test]
    fn eight_bit_conversion_equalizes_channels() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128]));
        let converted = to_eight_bit(&img);
        for pixel in converted.pixels() {
            assert_eq!(pixel.0, [76, 76, 76, 128]);
        }
        assert!(is_grayscale(&converted));
        assert_eq!(to_gray_image(&converted).get_pixel(1, 1).0, [76]);
    }
}
