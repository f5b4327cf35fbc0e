/// Image source handling
///
/// This module handles:
/// - Turning files into photo entities at import time (import.rs)
/// - Decoding sources into RGBA rasters off the UI thread (loader.rs)

pub mod import;
pub mod loader;
