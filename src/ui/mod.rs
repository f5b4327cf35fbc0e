/// Widgets for the main window
///
/// This module handles:
/// - The photo viewport with its pan/zoom overlay (canvas.rs)
/// - The histogram panel (histogram.rs)

pub mod canvas;
pub mod histogram;
