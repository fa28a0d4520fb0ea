//! Histocube Core - Data model for the per-feature histogram store
//!
//! This crate provides the types shared by the store and its population and
//! export engines:
//!
//! - [`LayerDef`] / [`LayerMeta`] - a named histogram definition: bin-label
//!   domain plus the scale/offset quantization mapping raw samples into it
//! - [`ZoneRaster`] / [`ValueRaster`] / [`RasterSink`] - the raster seams
//!   the engines consume, with in-memory implementations for tests and
//!   embedding callers
//! - [`Error`] / [`Result`] - the error type used across the workspace
//!
//! Raster decoding, coordinate systems and tiled execution are deliberately
//! outside this crate; callers adapt their raster library of choice to the
//! three traits.

pub mod error;
pub mod layer;
pub mod raster;

pub use error::{Error, Result};
pub use layer::{LayerDef, LayerMeta};
pub use raster::{
    GeoReference, MemoryRasterSink, MemoryValueRaster, MemoryZoneRaster, PixelType, RasterSink,
    ValueRaster, ZoneRaster,
};
