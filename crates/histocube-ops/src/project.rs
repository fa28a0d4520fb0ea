//! Projection engine
//!
//! The inverse of population: materializes per-feature values as raster
//! bands by looking every pixel's feature row up through a zone raster
//! defined over the same feature numbering. Background pixels receive a
//! configurable fill value.

use histocube_core::{Error, PixelType, RasterSink, Result, ZoneRaster};
use histocube_store::HistoCube;

/// Options shared by the bin and statistics exports.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Value written for background pixels and for statistics of empty
    /// histogram rows
    pub fill: f64,
    /// Sample type the output raster should be created with
    pub pixel_type: PixelType,
    /// Report statistics in physical-value space (labels mapped back
    /// through scale/offset) instead of bin-label space. Ignored by the
    /// bin exports, which always emit raw counts.
    pub physical_values: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fill: 0.0,
            pixel_type: PixelType::default(),
            physical_values: false,
        }
    }
}

/// Project per-feature values onto sink bands through a zone raster.
///
/// `per_feature[k]` holds one value per feature for output band `k`; a
/// pixel with zone `z > 0` receives `per_feature[k][z - 1]`, background
/// pixels receive `fill`.
pub(crate) fn project_bands(
    zone: &impl ZoneRaster,
    per_feature: &[Vec<f64>],
    fill: f64,
    sink: &mut impl RasterSink,
) -> Result<()> {
    let expected = (zone.width(), zone.height());
    let actual = (sink.width(), sink.height());
    if expected != actual {
        return Err(Error::GridMismatch { expected, actual });
    }
    if sink.band_count() < per_feature.len() {
        return Err(Error::InvalidParameter(format!(
            "sink has {} bands, export needs {}",
            sink.band_count(),
            per_feature.len()
        )));
    }

    let width = zone.width() as usize;
    let pixels = width * zone.height() as usize;
    let mut bands = vec![vec![fill; pixels]; per_feature.len()];
    let mut zone_row = vec![0u64; width];

    for y in 0..zone.height() {
        zone.read_row(y, &mut zone_row)?;
        let row_start = y as usize * width;
        for (x, &z) in zone_row.iter().enumerate() {
            if z == 0 {
                continue;
            }
            let feature = (z - 1) as usize;
            for (band, column) in bands.iter_mut().zip(per_feature) {
                let value = *column.get(feature).ok_or_else(|| {
                    Error::InvalidParameter(format!(
                        "zone value {z} exceeds feature count {}",
                        column.len()
                    ))
                })?;
                band[row_start + x] = value;
            }
        }
    }

    for (k, band) in bands.iter().enumerate() {
        sink.write_band(k, band)?;
    }
    Ok(())
}

/// Read a layer's full row data, feature-major.
pub(crate) fn read_full_layer(cube: &mut HistoCube, layer_name: &str) -> Result<Vec<u32>> {
    let bin_count = cube.layer(layer_name)?.bin_count();
    let last_row = cube.num_features() - 1;
    let mut counts = vec![0u32; (cube.num_features() as usize) * bin_count];
    cube.read_rows(layer_name, 0, last_row, &mut counts)?;
    Ok(counts)
}

/// Export selected bin columns of a layer as raster bands.
///
/// One output band per requested bin index, in request order; each pixel
/// with zone `z > 0` receives feature `z - 1`'s count in that bin.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for a bin index outside
/// `[0, bin_count)` or a sink with too few bands, [`Error::GridMismatch`]
/// if the sink grid differs from the zone raster.
pub fn export_bins(
    cube: &mut HistoCube,
    layer_name: &str,
    zone: &impl ZoneRaster,
    bin_indices: &[usize],
    options: &ExportOptions,
    sink: &mut impl RasterSink,
) -> Result<()> {
    let meta = cube.layer(layer_name)?.clone();
    let bin_count = meta.bin_count();
    for &idx in bin_indices {
        if idx >= bin_count {
            return Err(Error::InvalidParameter(format!(
                "bin index {idx} outside 0..{bin_count}"
            )));
        }
    }

    let counts = read_full_layer(cube, layer_name)?;
    let num_features = cube.num_features() as usize;
    let per_feature: Vec<Vec<f64>> = bin_indices
        .iter()
        .map(|&idx| {
            (0..num_features)
                .map(|f| counts[f * bin_count + idx] as f64)
                .collect()
        })
        .collect();

    project_bands(zone, &per_feature, options.fill, sink)
}

/// Export a single band holding a weighted sum of bin columns.
///
/// `weights` pairs positionally with the layer's bins (one weight per bin);
/// each feature contributes `sum(weights[i] * count[i])`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] unless exactly `bin_count` weights
/// are given.
pub fn export_weighted_sum(
    cube: &mut HistoCube,
    layer_name: &str,
    zone: &impl ZoneRaster,
    weights: &[f64],
    options: &ExportOptions,
    sink: &mut impl RasterSink,
) -> Result<()> {
    let bin_count = cube.layer(layer_name)?.bin_count();
    if weights.len() != bin_count {
        return Err(Error::InvalidParameter(format!(
            "{} weights given, layer has {bin_count} bins",
            weights.len()
        )));
    }

    let counts = read_full_layer(cube, layer_name)?;
    let num_features = cube.num_features() as usize;
    let column: Vec<f64> = (0..num_features)
        .map(|f| {
            let row = &counts[f * bin_count..(f + 1) * bin_count];
            row.iter()
                .zip(weights)
                .map(|(&c, &w)| c as f64 * w)
                .sum()
        })
        .collect();

    project_bands(zone, &[column], options.fill, sink)
}
