/// Rendering pipeline
///
/// This module handles:
/// - Mapping an adjustment set to an ordered filter chain (filters.rs)
/// - Running filter chains on the CPU (raster.rs)
/// - Pan/zoom, before/after compositing and stale-render suppression (viewport.rs)
/// - Keeping a few decoded sources and their fitted textures around (cache.rs)
/// - Sampling and plotting the RGB histogram (histogram.rs)
/// - Full-resolution export (export.rs)

pub mod cache;
pub mod export;
pub mod filters;
pub mod histogram;
pub mod raster;
pub mod viewport;
