//! Histocube - Per-feature histogram store for raster imagery
//!
//! For a fixed population of spatial features (segmented image objects,
//! clumps), a histocube file stores named layers of per-feature histograms:
//! each layer has a bin-label domain plus a scale/offset quantization, and
//! one row of unsigned counts per feature.
//!
//! The workspace splits into three crates, all re-exported here:
//!
//! - `histocube-core` - layer metadata, quantization, raster seams, errors
//! - `histocube-store` - the persistent container and its range I/O
//! - `histocube-ops` - population, projection and statistics engines
//!
//! # Example
//!
//! ```no_run
//! use histocube::{HistoCube, LayerDef, MemoryValueRaster, MemoryZoneRaster};
//! use histocube::{populate_layer, PopulateOptions};
//!
//! let mut cube = HistoCube::create("clumps.hcub", 3)?;
//! cube.create_layer(LayerDef::new("heights", 0, 50))?;
//!
//! let zone = MemoryZoneRaster::new(3, 1, vec![1, 1, 2])?;
//! let values = MemoryValueRaster::new(3, 1, vec![12.0, 14.5, 7.0])?;
//! populate_layer(&mut cube, "heights", &zone, &values, &PopulateOptions::default())?;
//! cube.close()?;
//! # Ok::<(), histocube::Error>(())
//! ```

// Re-export core types (primary data structures used everywhere)
pub use histocube_core::*;

// Store engine
pub use histocube_store::HistoCube;
pub use histocube_store::format;

// Population and export engines
pub use histocube_ops::{
    ExportOptions, PixelVisitor, PopulateMode, PopulateOptions, PopulateSummary, Statistic,
    export_bins, export_stats, export_weighted_sum, populate_layer, row_statistic, scan_pair,
};
