//! Statistics engine
//!
//! Reduces each feature's histogram row to scalar summary statistics and
//! projects them onto raster bands, one band per requested statistic, using
//! the same zone-raster projection as the bin export.
//!
//! Statistics are computed over the discrete distribution implied by the
//! row's `(label, count)` pairs. By default labels are taken at face value;
//! [`ExportOptions::physical_values`] maps them back through the layer's
//! scale/offset first. A row with no counts has no defined statistics and
//! emits the fill value.

use crate::project::{ExportOptions, project_bands, read_full_layer};
use histocube_core::{LayerMeta, RasterSink, Result, ZoneRaster};
use histocube_store::HistoCube;

/// Summary statistic over one feature's histogram row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// Lowest bin label with a nonzero count
    Min,
    /// Highest bin label with a nonzero count
    Max,
    /// Count-weighted average of bin label
    Mean,
    /// Bin label at which the cumulative count first reaches half the
    /// total; ties take the lower label
    Median,
    /// Bin label with the largest count; ties take the lowest such label
    Mode,
    /// `Max - Min`
    Range,
    /// Count-weighted standard deviation around the mean
    StdDev,
    /// Total count across all bins (the feature's population size)
    Sum,
}

/// One feature's histogram row viewed as a discrete distribution.
struct RowDistribution<'a> {
    counts: &'a [u32],
    meta: &'a LayerMeta,
    physical: bool,
    total: u64,
}

impl<'a> RowDistribution<'a> {
    fn new(counts: &'a [u32], meta: &'a LayerMeta, physical: bool) -> Self {
        let total = counts.iter().map(|&c| c as u64).sum();
        Self {
            counts,
            meta,
            physical,
            total,
        }
    }

    /// Value assigned to the bin at index `i` in the selected space.
    fn value(&self, i: usize) -> f64 {
        let label = self.meta.low_bin() + i as i32;
        if self.physical {
            self.meta.label_to_value(label)
        } else {
            label as f64
        }
    }

    fn occupied(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(i, &c)| (i, c))
    }

    fn min(&self) -> Option<f64> {
        self.occupied().next().map(|(i, _)| self.value(i))
    }

    fn max(&self) -> Option<f64> {
        self.occupied().last().map(|(i, _)| self.value(i))
    }

    fn mean(&self) -> f64 {
        let weighted: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| c as f64 * self.value(i))
            .sum();
        weighted / self.total as f64
    }

    fn median(&self) -> f64 {
        let half = self.total as f64 / 2.0;
        let mut cumulative = 0u64;
        for (i, &c) in self.counts.iter().enumerate() {
            cumulative += c as u64;
            if cumulative as f64 >= half && c > 0 {
                return self.value(i);
            }
        }
        // Unreachable for total > 0: the cumulative count reaches the total
        self.value(self.counts.len() - 1)
    }

    fn mode(&self) -> f64 {
        let mut best = (0usize, 0u32);
        for (i, c) in self.occupied() {
            if c > best.1 {
                best = (i, c);
            }
        }
        self.value(best.0)
    }

    fn stddev(&self) -> f64 {
        let mean = self.mean();
        let sq: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let d = self.value(i) - mean;
                c as f64 * d * d
            })
            .sum();
        (sq / self.total as f64).sqrt()
    }

    /// Evaluate one statistic; `None` for an empty row.
    fn evaluate(&self, stat: Statistic) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let value = match stat {
            Statistic::Min => self.min()?,
            Statistic::Max => self.max()?,
            Statistic::Mean => self.mean(),
            Statistic::Median => self.median(),
            Statistic::Mode => self.mode(),
            Statistic::Range => self.max()? - self.min()?,
            Statistic::StdDev => self.stddev(),
            // A pure pixel count, never mapped into physical space
            Statistic::Sum => self.total as f64,
        };
        Some(value)
    }
}

/// Compute one statistic over a single histogram row.
///
/// Exposed for callers that want row statistics without projecting them
/// onto a raster. Returns `None` when the row holds no counts.
pub fn row_statistic(
    counts: &[u32],
    meta: &LayerMeta,
    stat: Statistic,
    physical_values: bool,
) -> Option<f64> {
    RowDistribution::new(counts, meta, physical_values).evaluate(stat)
}

/// Export per-feature summary statistics as raster bands.
///
/// One output band per requested statistic, in request order. Features with
/// empty rows and background pixels both receive the fill value.
///
/// # Errors
///
/// Returns [`histocube_core::Error::InvalidParameter`] for a sink with too
/// few bands and [`histocube_core::Error::GridMismatch`] if the sink grid
/// differs from the zone raster.
pub fn export_stats(
    cube: &mut HistoCube,
    layer_name: &str,
    zone: &impl ZoneRaster,
    stats: &[Statistic],
    options: &ExportOptions,
    sink: &mut impl RasterSink,
) -> Result<()> {
    let meta = cube.layer(layer_name)?.clone();
    let bin_count = meta.bin_count();
    let counts = read_full_layer(cube, layer_name)?;
    let num_features = cube.num_features() as usize;

    let mut per_feature = vec![vec![options.fill; num_features]; stats.len()];
    for f in 0..num_features {
        let row = &counts[f * bin_count..(f + 1) * bin_count];
        let dist = RowDistribution::new(row, &meta, options.physical_values);
        for (column, &stat) in per_feature.iter_mut().zip(stats) {
            if let Some(value) = dist.evaluate(stat) {
                column[f] = value;
            }
        }
    }

    project_bands(zone, &per_feature, options.fill, sink)
}
