/// Real-time RGB histogram.
///
/// Always computed from the unedited source: the image is sampled down to a
/// small square, every sampled pixel bumps one bucket per channel, and the
/// three channels share one vertical scale (the global maximum bucket).
/// Anything that goes wrong falls back to a static placeholder curve.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, warn};

use super::raster::{fill_rect, BlendMode};

/// Edge length of the square the source is sampled down to
pub const HISTOGRAM_SAMPLE_SIZE: u32 = 64;

/// Plot surface size
pub const PLOT_WIDTH: u32 = 240;
pub const PLOT_HEIGHT: u32 = 96;

const BACKGROUND: [u8; 4] = [0x1a, 0x1a, 0x1a, 0xff];
const GRID: [u8; 4] = [0x33, 0x33, 0x33, 0xff];
const GRID_DIVISIONS: u32 = 4;
const CHANNEL_COLORS: [[u8; 4]; 3] = [
    [255, 0, 0, 153], // Red
    [0, 255, 0, 153], // Green
    [0, 0, 255, 153], // Blue
];
const PLACEHOLDER_FILL: [u8; 4] = [100, 100, 100, 128];

/// Histogram data structure
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// RGB histogram data: [R[256], G[256], B[256]]
    pub data: [[u32; 256]; 3],
}

impl Histogram {
    /// Bin every pixel of an already-sampled image
    pub fn from_pixels(sample: &RgbaImage) -> Self {
        let mut data = [[0u32; 256]; 3];
        for pixel in sample.pixels() {
            let [r, g, b, _] = pixel.0;
            data[0][r as usize] += 1;
            data[1][g as usize] += 1;
            data[2][b as usize] += 1;
        }
        Self { data }
    }

    /// Sample the source down to `sample_size`² and bin it
    pub fn from_source(source: &RgbaImage, sample_size: u32) -> Option<Self> {
        if source.width() == 0 || source.height() == 0 || sample_size == 0 {
            return None;
        }
        let sample = imageops::resize(source, sample_size, sample_size, FilterType::Triangle);
        Some(Self::from_pixels(&sample))
    }

    /// Largest bucket across all three channels
    pub fn max_count(&self) -> u32 {
        self.data
            .iter()
            .flat_map(|channel| channel.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Bar heights for a plot `height` tall, normalized by the global maximum.
    ///
    /// `None` for an empty histogram.
    pub fn bar_heights(&self, height: f32) -> Option<[[f32; 256]; 3]> {
        let max = self.max_count();
        if max == 0 {
            return None;
        }
        let max = max as f32;
        let mut bars = [[0.0f32; 256]; 3];
        for (channel, counts) in bars.iter_mut().zip(&self.data) {
            for (bar, &count) in channel.iter_mut().zip(counts) {
                *bar = count as f32 / max * height;
            }
        }
        Some(bars)
    }
}

/// What the histogram panel shows
#[derive(Debug, Clone, PartialEq)]
pub enum HistogramPlot {
    Channels(Histogram),
    /// Source unavailable; a neutral bell curve
    Placeholder,
}

impl HistogramPlot {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, HistogramPlot::Placeholder)
    }
}

/// Analyze a decoded source
pub fn analyze(source: &RgbaImage, sample_size: u32) -> HistogramPlot {
    match Histogram::from_source(source, sample_size) {
        Some(histogram) if histogram.max_count() > 0 => HistogramPlot::Channels(histogram),
        _ => {
            debug!("source cannot be sampled, using placeholder histogram");
            HistogramPlot::Placeholder
        }
    }
}

/// Analyze on the blocking pool; never fails
pub async fn analyze_in_background(source: Arc<RgbaImage>, sample_size: u32) -> HistogramPlot {
    task::spawn_blocking(move || analyze(&source, sample_size))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "histogram task failed");
            HistogramPlot::Placeholder
        })
}

/// Rasterize a plot onto a `width`×`height` surface
pub fn render_plot(plot: &HistogramPlot, width: u32, height: u32) -> RgbaImage {
    let mut surface = RgbaImage::from_pixel(width, height, image::Rgba(BACKGROUND));
    if width == 0 || height == 0 {
        return surface;
    }

    match plot {
        HistogramPlot::Channels(histogram) => {
            draw_grid(&mut surface);
            if let Some(bars) = histogram.bar_heights(height as f32) {
                draw_channels(&mut surface, &bars);
            }
        }
        HistogramPlot::Placeholder => draw_placeholder(&mut surface),
    }
    surface
}

fn draw_grid(surface: &mut RgbaImage) {
    let (width, height) = surface.dimensions();
    for i in 0..=GRID_DIVISIONS {
        let y = (height as f32 / GRID_DIVISIONS as f32 * i as f32) as u32;
        fill_rect(surface, 0, y.min(height - 1) as i64, width, 1, GRID, BlendMode::Normal);
    }
}

/// Channels overlap with a screen blend so coincident bars brighten
fn draw_channels(surface: &mut RgbaImage, bars: &[[f32; 256]; 3]) {
    let (width, height) = surface.dimensions();
    for (channel, color) in bars.iter().zip(CHANNEL_COLORS) {
        for x in 0..width {
            // Every bin covered by this column; keep the tallest so narrow peaks survive
            let first = (x as usize * 256) / width as usize;
            let last = ((x as usize + 1) * 256 / width as usize).clamp(first + 1, 256);
            let bar = channel[first..last].iter().copied().fold(0.0f32, f32::max);
            if bar <= 0.0 {
                continue;
            }
            let top = (height as f32 - bar).round().max(0.0) as u32;
            fill_rect(
                surface,
                x as i64,
                top as i64,
                1,
                height - top,
                color,
                BlendMode::Screen,
            );
        }
    }
}

fn draw_placeholder(surface: &mut RgbaImage) {
    let (width, height) = surface.dimensions();
    for x in 0..width {
        let t = x as f32 / width as f32 * 6.0 - 3.0;
        let curve = (-t * t / 2.0).exp() * height as f32 * 0.8;
        let top = (height as f32 - curve).round().max(0.0) as u32;
        fill_rect(
            surface,
            x as i64,
            top as i64,
            1,
            height - top,
            PLACEHOLDER_FILL,
            BlendMode::Normal,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_single_colour_sample_fills_one_bucket_per_channel() {
        let sample = RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 255]));
        let histogram = Histogram::from_pixels(&sample);
        assert_eq!(histogram.max_count(), 64 * 64);

        let bars = histogram.bar_heights(96.0).unwrap();

        for (channel, bucket) in [(0, 10), (1, 20), (2, 30)] {
            for (i, &bar) in bars[channel].iter().enumerate() {
                if i == bucket {
                    assert_eq!(bar, 96.0);
                } else {
                    assert_eq!(bar, 0.0, "channel {} bucket {}", channel, i);
                }
            }
        }
    }

    #[test]
    fn test_normalization_uses_global_maximum() {
        let mut sample = RgbaImage::from_pixel(4, 1, Rgba([0, 7, 7, 255]));
        sample.put_pixel(0, 0, Rgba([200, 9, 7, 255]));
        sample.put_pixel(1, 0, Rgba([100, 9, 7, 255]));

        let bars = Histogram::from_pixels(&sample).bar_heights(100.0).unwrap();

        // Blue bucket 7 holds all four pixels and sets the scale
        assert_eq!(bars[2][7], 100.0);
        assert_eq!(bars[0][0], 50.0);
        assert_eq!(bars[0][200], 25.0);
        assert_eq!(bars[1][9], 50.0);
    }

    #[test]
    fn test_from_source_samples_to_fixed_size() {
        let source = RgbaImage::from_pixel(300, 120, Rgba([50, 60, 70, 255]));

        let histogram = Histogram::from_source(&source, HISTOGRAM_SAMPLE_SIZE).unwrap();

        assert_eq!(histogram.data[0][50], 64 * 64);
        assert_eq!(histogram.data[2][70], 64 * 64);
    }

    #[test]
    fn test_empty_source_falls_back_to_placeholder() {
        assert!(analyze(&RgbaImage::new(0, 0), HISTOGRAM_SAMPLE_SIZE).is_placeholder());
        assert!(Histogram::from_pixels(&RgbaImage::new(0, 0)).bar_heights(10.0).is_none());
    }

    #[test]
    fn test_render_plot_blends_channels() {
        let source = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
        let plot = analyze(&source, HISTOGRAM_SAMPLE_SIZE);

        let surface = render_plot(&plot, PLOT_WIDTH, PLOT_HEIGHT);

        // Green and blue stack up in bucket 0, red in bucket 255
        let left = surface.get_pixel(0, 50).0;
        assert!(left[0] < 40 && left[1] > 150 && left[2] > 150, "{:?}", left);
        let right = surface.get_pixel(PLOT_WIDTH - 1, 50).0;
        assert!(right[0] > 150 && right[1] < 40 && right[2] < 40, "{:?}", right);

        assert_eq!(surface.get_pixel(120, 50).0, BACKGROUND);
        assert_eq!(surface.get_pixel(120, 24).0, GRID);
    }

    #[test]
    fn test_render_placeholder_curve() {
        let surface = render_plot(&HistogramPlot::Placeholder, PLOT_WIDTH, PLOT_HEIGHT);

        assert_eq!(surface.get_pixel(120, 10).0, BACKGROUND);
        assert_ne!(surface.get_pixel(120, 90).0, BACKGROUND);
        assert_ne!(surface.get_pixel(0, PLOT_HEIGHT - 1).0, BACKGROUND);
    }

    #[tokio::test]
    async fn test_background_analysis() {
        let source = Arc::new(RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 255])));
        let plot = analyze_in_background(source, 32).await;
        match plot {
            HistogramPlot::Channels(h) => assert_eq!(h.data[1][2], 32 * 32),
            HistogramPlot::Placeholder => panic!("expected channel data"),
        }
    }
}
