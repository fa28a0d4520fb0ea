//! Histocube Store - Persistent container for per-feature histograms
//!
//! One store file holds histogram layers for a fixed population of
//! features: every layer shares the store's feature count and owns a
//! row block of `num_features * bin_count` unsigned counts.
//!
//! # Example
//!
//! ```no_run
//! use histocube_core::LayerDef;
//! use histocube_store::HistoCube;
//!
//! let mut cube = HistoCube::create("clumps.hcub", 1000)?;
//! cube.create_layer(LayerDef::new("ndvi", -100, 100).with_quantization(0.01, 0.0))?;
//!
//! let mut row = vec![0u32; cube.layer("ndvi")?.bin_count()];
//! cube.read_rows("ndvi", 42, 42, &mut row)?;
//! cube.close()?;
//! # Ok::<(), histocube_core::Error>(())
//! ```

pub mod cube;
pub mod format;

pub use cube::HistoCube;

// Re-export core types used throughout the store API
pub use histocube_core::{Error, LayerDef, LayerMeta, Result};
