/// Viewport renderer
///
/// Owns pan/zoom state and paints the current photo onto an RGBA surface the
/// size of the viewport, either once with the full filter chain or as a
/// before/after split. Painting only ever samples the pixels that end up
/// visible, so heavy zoom on a large source stays cheap.

use cgmath::Vector2;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, warn};

use super::filters::FilterOp;
use super::raster::{apply_chain_in, draw_scaled, fill_rect, BlendMode, DrawRect};
use crate::state::data::PhotoId;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;

const WHEEL_OUT_STEP: f32 = 0.9;
const WHEEL_IN_STEP: f32 = 1.1;
const BUTTON_OUT_STEP: f32 = 0.8;
const BUTTON_IN_STEP: f32 = 1.25;

const DIVIDER_WIDTH: u32 = 2;
const DIVIDER_COLOR: [u8; 4] = [0x00, 0x88, 0xff, 0xff];
const BADGE_COLOR: [u8; 4] = [0, 0, 0, 178];
const BADGE_INSET: f32 = 10.0;
const BADGE_WIDTH: f32 = 80.0;
const BADGE_HEIGHT: f32 = 30.0;

/// State for drag interactions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragState {
    pub is_dragging: bool,
    pub last_position: Option<Vector2<f32>>,
}

/// Pan/zoom/compare state of the main view
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// Zoom level (1.0 = fit)
    pub zoom: f32,
    /// Pan offset in viewport pixels
    pub pan: Vector2<f32>,
    pub drag: DragState,
    pub before_after: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vector2::new(0.0, 0.0),
            drag: DragState::default(),
            before_after: false,
        }
    }
}

impl Viewport {
    pub fn pointer_down(&mut self, position: Vector2<f32>) {
        self.drag.is_dragging = true;
        self.drag.last_position = Some(position);
    }

    /// Accumulate the pointer delta into the pan while dragging.
    ///
    /// Returns true when the pan changed.
    pub fn pointer_move(&mut self, position: Vector2<f32>) -> bool {
        if !self.drag.is_dragging {
            return false;
        }
        let moved = match self.drag.last_position {
            Some(last) => {
                self.pan += position - last;
                position != last
            }
            None => false,
        };
        self.drag.last_position = Some(position);
        moved
    }

    /// Pointer released or left the viewport
    pub fn pointer_up(&mut self) {
        self.drag.is_dragging = false;
        self.drag.last_position = None;
    }

    /// Positive `delta_y` scrolls down and zooms out
    pub fn wheel(&mut self, delta_y: f32) {
        let step = if delta_y > 0.0 {
            WHEEL_OUT_STEP
        } else {
            WHEEL_IN_STEP
        };
        self.scale_zoom(step);
    }

    pub fn zoom_in(&mut self) {
        self.scale_zoom(BUTTON_IN_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.scale_zoom(BUTTON_OUT_STEP);
    }

    pub fn fit(&mut self) {
        self.zoom = 1.0;
        self.pan = Vector2::new(0.0, 0.0);
    }

    pub fn toggle_before_after(&mut self) {
        self.before_after = !self.before_after;
    }

    /// Zoom as a whole percentage for display
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    fn scale_zoom(&mut self, factor: f32) {
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Where the image lands on a `canvas`-sized surface.
    ///
    /// The image is fitted along whichever axis constrains it, scaled by the
    /// zoom, centred and then offset by the pan.
    pub fn layout(&self, image: (u32, u32), canvas: (u32, u32)) -> DrawRect {
        let (iw, ih) = (image.0 as f32, image.1 as f32);
        let (cw, ch) = (canvas.0 as f32, canvas.1 as f32);
        if iw <= 0.0 || ih <= 0.0 || cw <= 0.0 || ch <= 0.0 {
            return DrawRect {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            };
        }

        let image_aspect = iw / ih;
        let canvas_aspect = cw / ch;
        let (width, height) = if image_aspect > canvas_aspect {
            (cw * self.zoom, cw / image_aspect * self.zoom)
        } else {
            (ch * image_aspect * self.zoom, ch * self.zoom)
        };

        DrawRect {
            x: (cw - width) / 2.0 + self.pan.x,
            y: (ch - height) / 2.0 + self.pan.y,
            width,
            height,
        }
    }

    /// Paint `source` onto a fresh surface of size `canvas`
    pub fn paint(&self, source: &RgbaImage, chain: &[FilterOp], canvas: (u32, u32)) -> Frame {
        self.paint_with(source, None, chain, canvas).0
    }

    /// Paint, reusing `cached` when it was fitted to the size drawn now.
    ///
    /// Also returns the fitted texture that was drawn, if the source had to be
    /// shrunk, so the caller can keep it for the next paint.
    pub fn paint_with(
        &self,
        source: &RgbaImage,
        cached: Option<&FittedTexture>,
        chain: &[FilterOp],
        canvas: (u32, u32),
    ) -> (Frame, Option<FittedTexture>) {
        let (cw, ch) = canvas;
        let mut pixels = RgbaImage::new(cw, ch);
        let rect = self.layout(source.dimensions(), canvas);
        if rect.width <= 0.0 || rect.height <= 0.0 {
            let frame = Frame {
                pixels,
                badges: Vec::new(),
            };
            return (frame, None);
        }

        let texture = fit_texture(source, rect, cached);
        match &texture {
            Some(fitted) => draw_scaled(&mut pixels, &fitted.pixels, rect, 0..cw),
            None => draw_scaled(&mut pixels, source, rect, 0..cw),
        }

        (self.composite(pixels, chain), texture)
    }

    /// Run the chain over a drawn surface, split in two when comparing
    fn composite(&self, mut pixels: RgbaImage, chain: &[FilterOp]) -> Frame {
        let (cw, ch) = pixels.dimensions();
        if !self.before_after {
            apply_chain_in(&mut pixels, chain, 0..cw);
            return Frame {
                pixels,
                badges: Vec::new(),
            };
        }

        // Left half keeps the source untouched
        let split = cw / 2;
        apply_chain_in(&mut pixels, chain, split..cw);

        fill_rect(
            &mut pixels,
            split as i64 - (DIVIDER_WIDTH / 2) as i64,
            0,
            DIVIDER_WIDTH,
            ch,
            DIVIDER_COLOR,
            BlendMode::Normal,
        );

        let badges = vec![
            Badge::at("BEFORE", BADGE_INSET),
            Badge::at("AFTER", split as f32 + BADGE_INSET),
        ];
        for badge in &badges {
            fill_rect(
                &mut pixels,
                badge.x as i64,
                badge.y as i64,
                badge.width as u32,
                badge.height as u32,
                BADGE_COLOR,
                BlendMode::Normal,
            );
        }

        Frame { pixels, badges }
    }
}

/// A source shrunk to one drawn size
#[derive(Debug, Clone)]
pub struct FittedTexture {
    pub size: (u32, u32),
    pub pixels: Arc<RgbaImage>,
}

/// Shrink the source to the drawn size when it would be downsampled anyway.
/// `cached` is reused as is when it already has that size.
fn fit_texture(
    source: &RgbaImage,
    rect: DrawRect,
    cached: Option<&FittedTexture>,
) -> Option<FittedTexture> {
    let (sw, sh) = source.dimensions();
    if rect.width >= sw as f32 || rect.height >= sh as f32 {
        return None;
    }

    let size = ((rect.width.ceil() as u32).max(1), (rect.height.ceil() as u32).max(1));
    if let Some(cached) = cached.filter(|texture| texture.size == size) {
        return Some(cached.clone());
    }
    let pixels = imageops::resize(source, size.0, size.1, FilterType::Triangle);
    Some(FittedTexture {
        size,
        pixels: Arc::new(pixels),
    })
}

/// Labelled backdrop painted in split mode; the UI draws the label text
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub label: &'static str,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Badge {
    fn at(label: &'static str, x: f32) -> Self {
        Self {
            label,
            x,
            y: BADGE_INSET,
            width: BADGE_WIDTH,
            height: BADGE_HEIGHT,
        }
    }

    /// Baseline origin for the label text
    pub fn text_origin(&self) -> (f32, f32) {
        (self.x + 5.0, self.y + 20.0)
    }
}

/// A painted viewport surface
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: RgbaImage,
    pub badges: Vec<Badge>,
}

/// Monotonic counter that tags every render request.
///
/// Only the result whose ticket matches the latest issued one may be shown;
/// anything older was superseded while it was in flight.
#[derive(Debug, Default)]
pub struct RenderGeneration(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket(u64);

impl RenderGeneration {
    /// Supersede every outstanding ticket
    pub fn next(&mut self) -> RenderTicket {
        self.0 += 1;
        RenderTicket(self.0)
    }

    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        self.0 == ticket.0
    }
}

/// Everything a background render needs, captured at request time
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub ticket: RenderTicket,
    pub photo: PhotoId,
    pub source: Arc<RgbaImage>,
    /// Texture fitted by an earlier render of the same photo
    pub texture: Option<FittedTexture>,
    pub chain: Vec<FilterOp>,
    pub viewport: Viewport,
    pub canvas: (u32, u32),
}

/// A finished background render
#[derive(Debug, Clone)]
pub struct Rendered {
    pub ticket: RenderTicket,
    pub photo: PhotoId,
    pub frame: Frame,
    pub texture: Option<FittedTexture>,
}

/// Paint a request on the blocking pool
pub async fn render(request: RenderRequest) -> Option<Rendered> {
    let ticket = request.ticket;
    let photo = request.photo;
    let result = task::spawn_blocking(move || {
        let start = std::time::Instant::now();
        let painted = request.viewport.paint_with(
            &request.source,
            request.texture.as_ref(),
            &request.chain,
            request.canvas,
        );
        debug!(
            ops = request.chain.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "painted viewport"
        );
        painted
    })
    .await;

    match result {
        Ok((frame, texture)) => Some(Rendered {
            ticket,
            photo,
            frame,
            texture,
        }),
        Err(e) => {
            warn!(error = %e, "render task failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn rect(x: f32, y: f32, width: f32, height: f32) -> DrawRect {
        DrawRect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_layout_fits_wide_and_tall_images() {
        let view = Viewport::default();
        assert_eq!(view.layout((200, 100), (100, 100)), rect(0.0, 25.0, 100.0, 50.0));
        assert_eq!(view.layout((100, 200), (100, 100)), rect(25.0, 0.0, 50.0, 100.0));
    }

    #[test]
    fn test_layout_applies_zoom_then_pan() {
        let view = Viewport {
            zoom: 2.0,
            pan: Vector2::new(5.0, -3.0),
            ..Default::default()
        };
        assert_eq!(
            view.layout((100, 100), (100, 50)),
            rect(5.0, -28.0, 100.0, 100.0)
        );
    }

    #[test]
    fn test_wheel_zoom_out_never_below_minimum() {
        let mut view = Viewport {
            zoom: 0.11,
            ..Default::default()
        };
        for _ in 0..20 {
            view.wheel(1.0);
            assert!(view.zoom >= MIN_ZOOM);
        }
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_wheel_zoom_in_never_above_maximum() {
        let mut view = Viewport {
            zoom: 4.9,
            ..Default::default()
        };
        for _ in 0..20 {
            view.wheel(-1.0);
            assert!(view.zoom <= MAX_ZOOM);
        }
        assert_eq!(view.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_button_steps_and_fit() {
        let mut view = Viewport::default();
        view.zoom_in();
        assert!((view.zoom - 1.25).abs() < 1e-6);
        view.zoom_out();
        view.zoom_out();
        assert!((view.zoom - 0.8).abs() < 1e-6);
        assert_eq!(view.zoom_percent(), 80);

        view.pan = Vector2::new(40.0, 12.0);
        view.fit();
        assert_eq!(view.zoom, 1.0);
        assert_eq!(view.pan, Vector2::new(0.0, 0.0));
    }

    #[test]
    fn test_drag_accumulates_pan() {
        let mut view = Viewport::default();
        assert!(!view.pointer_move(Vector2::new(50.0, 50.0)));

        view.pointer_down(Vector2::new(10.0, 10.0));
        assert!(view.pointer_move(Vector2::new(15.0, 20.0)));
        view.pointer_move(Vector2::new(20.0, 20.0));
        assert_eq!(view.pan, Vector2::new(10.0, 10.0));

        view.pointer_up();
        assert!(!view.drag.is_dragging);
        view.pointer_move(Vector2::new(90.0, 90.0));
        assert_eq!(view.pan, Vector2::new(10.0, 10.0));
    }

    #[test]
    fn test_paint_single_applies_chain_to_image_only() {
        let source = RgbaImage::from_pixel(4, 2, Rgba([200, 100, 50, 255]));
        let view = Viewport::default();

        let frame = view.paint(&source, &[FilterOp::Brightness(0.5)], (8, 8));

        assert!(frame.badges.is_empty());
        // Image occupies rows 2..6
        assert_eq!(frame.pixels.get_pixel(4, 3).0, [100, 50, 25, 255]);
        assert_eq!(frame.pixels.get_pixel(4, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_paint_split_filters_right_half_only() {
        let source = RgbaImage::from_pixel(8, 4, Rgba([100, 100, 100, 255]));
        let view = Viewport {
            before_after: true,
            ..Default::default()
        };

        let frame = view.paint(&source, &[FilterOp::Brightness(2.0)], (8, 4));

        assert_eq!(frame.pixels.get_pixel(1, 2).0, [100, 100, 100, 255]);
        assert_eq!(frame.pixels.get_pixel(6, 2).0, [200, 200, 200, 255]);
        assert_eq!(frame.pixels.get_pixel(3, 1).0, DIVIDER_COLOR);
        assert_eq!(frame.pixels.get_pixel(4, 1).0, DIVIDER_COLOR);

        let labels: Vec<(&str, f32)> = frame.badges.iter().map(|b| (b.label, b.x)).collect();
        assert_eq!(labels, [("BEFORE", 10.0), ("AFTER", 14.0)]);
    }

    #[test]
    fn test_paint_split_darkens_under_badges() {
        let source = RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255]));
        let view = Viewport {
            before_after: true,
            ..Default::default()
        };

        let frame = view.paint(&source, &[], (200, 100));

        let under_badge = frame.pixels.get_pixel(20, 20).0;
        assert!(under_badge[0] < 100);
        assert_eq!(frame.pixels.get_pixel(20, 60).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_paint_downsamples_large_source() {
        let source = RgbaImage::from_pixel(400, 400, Rgba([30, 60, 90, 255]));
        let frame = Viewport::default().paint(&source, &[], (10, 10));
        assert_eq!(frame.pixels.get_pixel(5, 5).0, [30, 60, 90, 255]);
    }

    #[test]
    fn test_paint_degenerate_sizes() {
        let source = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let view = Viewport::default();
        assert_eq!(view.paint(&source, &[], (0, 0)).pixels.dimensions(), (0, 0));
        assert_eq!(
            view.paint(&RgbaImage::new(0, 0), &[], (5, 5)).pixels.get_pixel(2, 2).0,
            [0, 0, 0, 0]
        );
    }

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let mut generation = RenderGeneration::default();
        let first = generation.next();
        assert!(generation.is_current(first));

        let second = generation.next();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }

    #[test]
    fn test_fitted_texture_reused_while_draw_size_holds() {
        let source = RgbaImage::from_pixel(400, 200, Rgba([30, 60, 90, 255]));
        let mut view = Viewport::default();

        let (_, first) = view.paint_with(&source, None, &[], (100, 100));
        let first = first.unwrap();
        assert_eq!(first.size, (100, 50));

        // Panning keeps the drawn size
        view.pan = Vector2::new(7.0, -3.0);
        let (frame, second) = view.paint_with(&source, Some(&first), &[], (100, 100));
        assert!(Arc::ptr_eq(&first.pixels, &second.unwrap().pixels));
        assert_eq!(frame.pixels.get_pixel(50, 50).0, [30, 60, 90, 255]);

        view.zoom_in();
        let (_, third) = view.paint_with(&source, Some(&first), &[], (100, 100));
        let third = third.unwrap();
        assert_eq!(third.size, (125, 63));
        assert!(!Arc::ptr_eq(&first.pixels, &third.pixels));
    }

    #[test]
    fn test_no_texture_when_source_is_not_shrunk() {
        let source = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let (_, texture) = Viewport::default().paint_with(&source, None, &[], (50, 50));
        assert!(texture.is_none());
    }

    #[tokio::test]
    async fn test_render_returns_ticket_with_frame() {
        let mut generation = RenderGeneration::default();
        let ticket = generation.next();
        let photo = PhotoId::new();
        let request = RenderRequest {
            ticket,
            photo,
            source: Arc::new(RgbaImage::from_pixel(20, 20, Rgba([9, 9, 9, 255]))),
            texture: None,
            chain: Vec::new(),
            viewport: Viewport::default(),
            canvas: (6, 6),
        };

        let rendered = render(request).await.unwrap();

        assert_eq!(rendered.ticket, ticket);
        assert_eq!(rendered.photo, photo);
        assert_eq!(rendered.frame.pixels.dimensions(), (6, 6));
        assert_eq!(rendered.texture.unwrap().size, (6, 6));
    }
}
