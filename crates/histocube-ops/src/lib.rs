//! Histocube Ops - Population and export engines for the histogram store
//!
//! This crate provides the three engines that connect an open
//! [`HistoCube`](histocube_store::HistoCube) to raster collaborators:
//!
//! - **Population** ([`populate_layer`]) - scan a zone/value raster pair
//!   and accumulate per-feature histogram counts into a layer
//! - **Projection** ([`export_bins`], [`export_weighted_sum`]) - write
//!   selected bin columns (or a weighted combination) back out as raster
//!   bands through a zone raster
//! - **Statistics** ([`export_stats`], [`row_statistic`]) - reduce each
//!   feature's row to summary statistics and project them the same way
//!
//! # Example
//!
//! ```no_run
//! use histocube_core::{LayerDef, MemoryRasterSink, MemoryValueRaster, MemoryZoneRaster, PixelType};
//! use histocube_ops::{populate_layer, export_stats, ExportOptions, PopulateOptions, Statistic};
//! use histocube_store::HistoCube;
//!
//! let mut cube = HistoCube::create("clumps.hcub", 3)?;
//! cube.create_layer(LayerDef::new("L", 0, 4))?;
//!
//! let zone = MemoryZoneRaster::new(3, 1, vec![1, 1, 2])?;
//! let values = MemoryValueRaster::new(3, 1, vec![0.0, 1.0, 0.0])?;
//! populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default())?;
//!
//! let mut out = MemoryRasterSink::like(&zone, 1, PixelType::Float64);
//! export_stats(&mut cube, "L", &zone, &[Statistic::Mean], &ExportOptions::default(), &mut out)?;
//! # Ok::<(), histocube_core::Error>(())
//! ```

pub mod populate;
pub mod project;
pub mod scan;
pub mod stats;

pub use populate::{PopulateMode, PopulateOptions, PopulateSummary, populate_layer};
pub use project::{ExportOptions, export_bins, export_weighted_sum};
pub use scan::{PixelVisitor, scan_pair};
pub use stats::{Statistic, export_stats, row_statistic};
