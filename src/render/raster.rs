/// CPU raster backend.
///
/// Every filter primitive is lowered to a linear color stage
/// (3×3 matrix plus a constant offset) with the filter-effects semantics
/// browsers use: channels are normalized to 0..1, each stage's output is
/// clamped, alpha passes through untouched. Rows are processed in parallel.

use cgmath::{Matrix3, SquareMatrix, Vector3};
use image::RgbaImage;
use rayon::prelude::*;
use std::ops::Range;

use super::filters::FilterOp;

/// Luma weights shared by the saturate and hue-rotate matrices
const LUMA: [f32; 3] = [0.213, 0.715, 0.072];

/// Sepia strength and hue rotation for a warm shift
const WARM_SEPIA: f32 = 0.3;
const WARM_HUE_DEGREES: f32 = 15.0;
/// Sepia strength and hue rotation for a cool shift
const COOL_SEPIA: f32 = 0.2;
const COOL_HUE_DEGREES: f32 = -30.0;

/// Build a cgmath matrix from rows (cgmath stores columns)
fn from_rows(r0: [f32; 3], r1: [f32; 3], r2: [f32; 3]) -> Matrix3<f32> {
    Matrix3::new(
        r0[0], r1[0], r2[0], // Column 0
        r0[1], r1[1], r2[1], // Column 1
        r0[2], r1[2], r2[2], // Column 2
    )
}

/// One linear color transform: `clamp(matrix * rgb + offset)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStage {
    matrix: Matrix3<f32>,
    offset: f32,
}

impl ColorStage {
    pub fn brightness(factor: f32) -> Self {
        Self {
            matrix: Matrix3::identity() * factor,
            offset: 0.0,
        }
    }

    pub fn contrast(factor: f32) -> Self {
        Self {
            matrix: Matrix3::identity() * factor,
            offset: 0.5 - 0.5 * factor,
        }
    }

    pub fn saturate(s: f32) -> Self {
        let [lr, lg, lb] = LUMA;
        Self {
            matrix: from_rows(
                [lr + (1.0 - lr) * s, lg - lg * s, lb - lb * s],
                [lr - lr * s, lg + (1.0 - lg) * s, lb - lb * s],
                [lr - lr * s, lg - lg * s, lb + (1.0 - lb) * s],
            ),
            offset: 0.0,
        }
    }

    pub fn hue_rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            matrix: from_rows(
                [
                    0.213 + cos * 0.787 - sin * 0.213,
                    0.715 - cos * 0.715 - sin * 0.715,
                    0.072 - cos * 0.072 + sin * 0.928,
                ],
                [
                    0.213 - cos * 0.213 + sin * 0.143,
                    0.715 + cos * 0.285 + sin * 0.140,
                    0.072 - cos * 0.072 - sin * 0.283,
                ],
                [
                    0.213 - cos * 0.213 - sin * 0.787,
                    0.715 - cos * 0.715 + sin * 0.715,
                    0.072 + cos * 0.928 + sin * 0.072,
                ],
            ),
            offset: 0.0,
        }
    }

    /// Sepia tone; `amount` is clamped to 0..=1
    pub fn sepia(amount: f32) -> Self {
        let k = 1.0 - amount.clamp(0.0, 1.0);
        Self {
            matrix: from_rows(
                [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
                [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
                [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
            ),
            offset: 0.0,
        }
    }

    /// Apply to normalized RGB
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = self.matrix * Vector3::new(rgb[0], rgb[1], rgb[2]);
        [
            (out.x + self.offset).clamp(0.0, 1.0),
            (out.y + self.offset).clamp(0.0, 1.0),
            (out.z + self.offset).clamp(0.0, 1.0),
        ]
    }
}

/// Lower a filter chain to color stages, preserving order
pub fn compile(chain: &[FilterOp]) -> Vec<ColorStage> {
    let mut stages = Vec::with_capacity(chain.len() + 1);
    for op in chain {
        match *op {
            FilterOp::Brightness(f) => stages.push(ColorStage::brightness(f)),
            FilterOp::Contrast(f) => stages.push(ColorStage::contrast(f)),
            FilterOp::Saturate(s) => stages.push(ColorStage::saturate(s)),
            FilterOp::HueRotate(deg) => stages.push(ColorStage::hue_rotate(deg)),
            FilterOp::WarmCoolShift { amount, warm: true } => {
                stages.push(ColorStage::sepia(amount * WARM_SEPIA));
                stages.push(ColorStage::hue_rotate(WARM_HUE_DEGREES));
            }
            FilterOp::WarmCoolShift { amount, warm: false } => {
                stages.push(ColorStage::sepia(amount * COOL_SEPIA));
                stages.push(ColorStage::hue_rotate(COOL_HUE_DEGREES));
            }
        }
    }
    stages
}

/// Apply a filter chain to every pixel of `img`
pub fn apply_chain(img: &mut RgbaImage, chain: &[FilterOp]) {
    let width = img.width();
    apply_chain_in(img, chain, 0..width);
}

/// Apply a filter chain to the columns in `columns` only.
///
/// Fully transparent pixels are left alone.
pub fn apply_chain_in(img: &mut RgbaImage, chain: &[FilterOp], columns: Range<u32>) {
    if chain.is_empty() {
        return;
    }
    let stages = compile(chain);
    let width = img.width() as usize;
    if width == 0 {
        return;
    }
    let start = (columns.start as usize).min(width);
    let end = (columns.end as usize).min(width);

    let raw: &mut [u8] = &mut *img;
    raw.par_chunks_mut(width * 4).for_each(|row| {
        for px in row[start * 4..end * 4].chunks_exact_mut(4) {
            if px[3] == 0 {
                continue;
            }
            let mut rgb = [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ];
            for stage in &stages {
                rgb = stage.apply(rgb);
            }
            px[0] = (rgb[0] * 255.0).round() as u8;
            px[1] = (rgb[1] * 255.0).round() as u8;
            px[2] = (rgb[2] * 255.0).round() as u8;
        }
    });
}

/// Axis-aligned rectangle in surface pixels; may extend past the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Draw `source` stretched to `rect`, touching only the columns in `clip`.
///
/// Nearest-neighbour sampling; callers pre-shrink large sources.
pub fn draw_scaled(surface: &mut RgbaImage, source: &RgbaImage, rect: DrawRect, clip: Range<u32>) {
    let (sw, sh) = source.dimensions();
    let width = surface.width() as usize;
    if sw == 0 || sh == 0 || width == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }

    let x_start = (clip.start as f32).max(rect.x.floor()).max(0.0) as usize;
    let x_end = ((clip.end as f32).min((rect.x + rect.width).ceil()).max(0.0) as usize).min(width);
    if x_start >= x_end {
        return;
    }
    let scale_x = sw as f32 / rect.width;
    let scale_y = sh as f32 / rect.height;

    let raw: &mut [u8] = &mut *surface;
    raw.par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let v = (y as f32 + 0.5 - rect.y) * scale_y;
            if v < 0.0 || v >= sh as f32 {
                return;
            }
            let sy = v as u32;
            for x in x_start..x_end {
                let u = (x as f32 + 0.5 - rect.x) * scale_x;
                if u < 0.0 || u >= sw as f32 {
                    continue;
                }
                let texel = source.get_pixel(u as u32, sy).0;
                row[x * 4..x * 4 + 4].copy_from_slice(&texel);
            }
        });
}

/// How a colour is combined with what is already on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Ordinary source-over
    Normal,
    /// Additive light: overlaps brighten instead of occluding
    Screen,
}

/// Combine a colour with straight alpha into one opaque-ish pixel
pub fn blend_pixel(dst: &mut [u8], color: [u8; 4], mode: BlendMode) {
    let a = color[3] as f32 / 255.0;
    for c in 0..3 {
        let d = dst[c] as f32 / 255.0;
        let s = color[c] as f32 / 255.0;
        let mixed = match mode {
            BlendMode::Normal => s,
            BlendMode::Screen => d + s - d * s,
        };
        dst[c] = (((1.0 - a) * d + a * mixed) * 255.0).round() as u8;
    }
    let da = dst[3] as f32 / 255.0;
    dst[3] = ((a + da * (1.0 - a)) * 255.0).round() as u8;
}

/// Blend a colour over a rectangle, clipped to the surface
pub fn fill_rect(
    surface: &mut RgbaImage,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
    color: [u8; 4],
    mode: BlendMode,
) {
    let (sw, sh) = (surface.width() as i64, surface.height() as i64);
    let x0 = x.clamp(0, sw);
    let y0 = y.clamp(0, sh);
    let x1 = (x + width as i64).clamp(0, sw);
    let y1 = (y + height as i64).clamp(0, sh);

    for py in y0..y1 {
        for px in x0..x1 {
            let pixel = surface.get_pixel_mut(px as u32, py as u32);
            blend_pixel(&mut pixel.0, color, mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 2, Rgba(color))
    }

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-3)
    }

    #[test]
    fn test_identity_factors_leave_colour_unchanged() {
        let rgb = [0.2, 0.5, 0.9];
        assert!(close(ColorStage::brightness(1.0).apply(rgb), rgb));
        assert!(close(ColorStage::contrast(1.0).apply(rgb), rgb));
        assert!(close(ColorStage::saturate(1.0).apply(rgb), rgb));
        assert!(close(ColorStage::hue_rotate(0.0).apply(rgb), rgb));
        assert!(close(ColorStage::sepia(0.0).apply(rgb), rgb));
    }

    #[test]
    fn test_zero_saturation_is_grayscale() {
        let [r, g, b] = ColorStage::saturate(0.0).apply([1.0, 0.0, 0.0]);
        assert!((r - g).abs() < 1e-6 && (g - b).abs() < 1e-6);
        assert!((r - 0.213).abs() < 1e-6);
    }

    #[test]
    fn test_contrast_pivots_on_mid_gray() {
        let out = ColorStage::contrast(2.0).apply([0.5, 0.25, 0.75]);
        assert!(close(out, [0.5, 0.0, 1.0]));
    }

    #[test]
    fn test_stages_clamp_output() {
        let out = ColorStage::brightness(-3.0).apply([0.4, 0.4, 0.4]);
        assert_eq!(out, [0.0, 0.0, 0.0]);
        let out = ColorStage::brightness(10.0).apply([0.4, 0.4, 0.4]);
        assert_eq!(out, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_warm_and_cool_shifts_lower_to_two_stages() {
        let warm = compile(&[FilterOp::WarmCoolShift {
            amount: 0.5,
            warm: true,
        }]);
        assert_eq!(warm, [ColorStage::sepia(0.15), ColorStage::hue_rotate(15.0)]);

        let cool = compile(&[FilterOp::WarmCoolShift {
            amount: 1.0,
            warm: false,
        }]);
        assert_eq!(cool, [ColorStage::sepia(0.2), ColorStage::hue_rotate(-30.0)]);
    }

    #[test]
    fn test_apply_chain_brightens_and_keeps_alpha() {
        let mut img = solid([100, 50, 200, 128]);
        apply_chain(&mut img, &[FilterOp::Brightness(1.5)]);
        assert_eq!(img.get_pixel(0, 0).0, [150, 75, 255, 128]);
    }

    #[test]
    fn test_apply_chain_in_respects_columns_and_transparency() {
        let mut img = solid([100, 100, 100, 255]);
        img.put_pixel(3, 1, Rgba([100, 100, 100, 0]));

        apply_chain_in(&mut img, &[FilterOp::Brightness(2.0)], 2..4);

        assert_eq!(img.get_pixel(1, 0).0, [100, 100, 100, 255]);
        assert_eq!(img.get_pixel(2, 0).0, [200, 200, 200, 255]);
        assert_eq!(img.get_pixel(3, 1).0, [100, 100, 100, 0]);
    }

    #[test]
    fn test_nan_factor_does_not_panic() {
        let mut img = solid([10, 20, 30, 255]);
        apply_chain(&mut img, &[FilterOp::Saturate(f32::NAN), FilterOp::HueRotate(f32::INFINITY)]);
    }

    #[test]
    fn test_draw_scaled_fills_rect_and_respects_clip() {
        let source = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        let mut surface = RgbaImage::new(10, 10);
        let rect = DrawRect {
            x: 2.0,
            y: 3.0,
            width: 4.0,
            height: 4.0,
        };

        draw_scaled(&mut surface, &source, rect, 0..4);

        assert_eq!(surface.get_pixel(2, 3).0, [9, 9, 9, 255]);
        assert_eq!(surface.get_pixel(3, 6).0, [9, 9, 9, 255]);
        // Clipped out
        assert_eq!(surface.get_pixel(4, 3).0, [0, 0, 0, 0]);
        // Outside the rect
        assert_eq!(surface.get_pixel(1, 3).0, [0, 0, 0, 0]);
        assert_eq!(surface.get_pixel(2, 7).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_screen_blend_brightens_overlaps() {
        let mut px = [255, 0, 0, 255];
        blend_pixel(&mut px, [0, 255, 0, 255], BlendMode::Screen);
        assert_eq!(px, [255, 255, 0, 255]);

        let mut px = [255, 0, 0, 255];
        blend_pixel(&mut px, [0, 255, 0, 255], BlendMode::Normal);
        assert_eq!(px, [0, 255, 0, 255]);
    }

    #[test]
    fn test_fill_rect_is_clipped_to_surface() {
        let mut surface = RgbaImage::new(4, 4);
        fill_rect(&mut surface, -2, 2, 4, 10, [255, 255, 255, 255], BlendMode::Normal);
        assert_eq!(surface.get_pixel(1, 3).0, [255, 255, 255, 255]);
        assert_eq!(surface.get_pixel(2, 3).0, [0, 0, 0, 0]);
        assert_eq!(surface.get_pixel(0, 1).0, [0, 0, 0, 0]);
    }
}
