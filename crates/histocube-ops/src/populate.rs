//! Population engine
//!
//! Scans a zone/value raster pair and accumulates per-feature histogram
//! counts into one layer of an open store: every pixel belonging to a
//! feature is quantized through the layer's scale/offset and the matching
//! bin count is incremented.
//!
//! The two execution modes are one algorithm behind a row-buffer seam:
//! [`PopulateMode::InMemory`] stages the whole layer in one buffer (one
//! range read, one range write), [`PopulateMode::Direct`] keeps only the
//! current feature's row and writes it through whenever the scan moves to a
//! different feature. Both produce bit-identical counts; increments are
//! pure and order-independent.

use crate::scan::{check_grids, scan_pair};
use histocube_core::{Error, LayerMeta, Result, ValueRaster, ZoneRaster};
use histocube_store::HistoCube;

/// Resource tradeoff for a population run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopulateMode {
    /// Stage the full layer in memory: `num_features * bin_count` counts,
    /// minimal store I/O
    #[default]
    InMemory,
    /// Keep a single feature row in memory, read-modify-write through the
    /// store; for layers too large to stage
    Direct,
}

/// Options for [`populate_layer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PopulateOptions {
    pub mode: PopulateMode,
}

/// Tally of one population run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    /// Pixels visited in total
    pub pixels_scanned: u64,
    /// Pixels with zone value 0
    pub background: u64,
    /// Pixels skipped because the sample matched the no-data sentinel
    pub no_data: u64,
    /// Pixels skipped because the sample was NaN and has no bin
    pub non_finite: u64,
    /// Pixels that incremented a histogram bin
    pub pixels_counted: u64,
}

/// Row-buffer seam between the increment loop and the store.
trait RowAccumulator {
    fn increment(&mut self, cube: &mut HistoCube, feature_row: u64, bin: usize) -> Result<()>;
    fn finish(&mut self, cube: &mut HistoCube) -> Result<()>;
}

/// Full-layer buffer: one range read up front, one range write at the end.
struct MemoryAccumulator {
    layer: String,
    bin_count: usize,
    last_row: u64,
    counts: Vec<u32>,
}

impl MemoryAccumulator {
    fn load(cube: &mut HistoCube, meta: &LayerMeta) -> Result<Self> {
        let bin_count = meta.bin_count();
        let last_row = cube.num_features() - 1;
        let mut counts = vec![0u32; (cube.num_features() as usize) * bin_count];
        cube.read_rows(meta.name(), 0, last_row, &mut counts)?;
        Ok(Self {
            layer: meta.name().to_string(),
            bin_count,
            last_row,
            counts,
        })
    }
}

impl RowAccumulator for MemoryAccumulator {
    fn increment(&mut self, _cube: &mut HistoCube, feature_row: u64, bin: usize) -> Result<()> {
        let idx = (feature_row as usize) * self.bin_count + bin;
        self.counts[idx] = self.counts[idx].saturating_add(1);
        Ok(())
    }

    fn finish(&mut self, cube: &mut HistoCube) -> Result<()> {
        cube.write_rows(&self.layer, 0, self.last_row, &self.counts)
    }
}

/// Store-backed buffer holding only the current feature's row.
struct DirectAccumulator {
    layer: String,
    bin_count: usize,
    current: Option<(u64, Vec<u32>)>,
}

impl DirectAccumulator {
    fn new(meta: &LayerMeta) -> Self {
        Self {
            layer: meta.name().to_string(),
            bin_count: meta.bin_count(),
            current: None,
        }
    }

    fn flush(&mut self, cube: &mut HistoCube) -> Result<()> {
        if let Some((row, counts)) = self.current.take() {
            cube.write_rows(&self.layer, row, row, &counts)?;
        }
        Ok(())
    }
}

impl RowAccumulator for DirectAccumulator {
    fn increment(&mut self, cube: &mut HistoCube, feature_row: u64, bin: usize) -> Result<()> {
        let switch = match &self.current {
            Some((row, _)) => *row != feature_row,
            None => true,
        };
        if switch {
            self.flush(cube)?;
            let mut counts = vec![0u32; self.bin_count];
            cube.read_rows(&self.layer, feature_row, feature_row, &mut counts)?;
            self.current = Some((feature_row, counts));
        }
        let (_, counts) = self.current.as_mut().ok_or_else(|| {
            Error::InvalidParameter("row buffer missing after load".into())
        })?;
        counts[bin] = counts[bin].saturating_add(1);
        Ok(())
    }

    fn finish(&mut self, cube: &mut HistoCube) -> Result<()> {
        self.flush(cube)
    }
}

/// Populate one layer from a co-registered zone/value raster pair.
///
/// For every pixel with zone value `z > 0` and a sample that is not the
/// declared no-data sentinel, increments
/// `row[z - 1][quantize(sample) - low_bin]`. NaN samples have no bin and
/// are skipped, tallied in [`PopulateSummary::non_finite`]. Counts saturate
/// instead of wrapping.
///
/// A failed run leaves the layer's counts undefined; re-create the layer
/// and run again.
///
/// # Errors
///
/// Returns [`Error::GridMismatch`] if the rasters differ in dimensions,
/// [`Error::InvalidParameter`] if a zone value exceeds the store's feature
/// count, and any store or raster error encountered mid-scan.
pub fn populate_layer(
    cube: &mut HistoCube,
    layer_name: &str,
    zone: &impl ZoneRaster,
    values: &impl ValueRaster,
    options: &PopulateOptions,
) -> Result<PopulateSummary> {
    check_grids(zone, values)?;
    let meta = cube.layer(layer_name)?.clone();
    let num_features = cube.num_features();
    let no_data = values.no_data();

    let mut acc: Box<dyn RowAccumulator> = match options.mode {
        PopulateMode::InMemory => Box::new(MemoryAccumulator::load(cube, &meta)?),
        PopulateMode::Direct => Box::new(DirectAccumulator::new(&meta)),
    };

    let mut summary = PopulateSummary::default();
    let mut visitor = |z: u64, sample: f64| -> Result<()> {
        summary.pixels_scanned += 1;
        if z == 0 {
            summary.background += 1;
            return Ok(());
        }
        if z > num_features {
            return Err(Error::InvalidParameter(format!(
                "zone value {z} exceeds feature count {num_features}"
            )));
        }
        if no_data.is_some_and(|nd| sample == nd) {
            summary.no_data += 1;
            return Ok(());
        }
        let Some(label) = meta.quantize(sample) else {
            summary.non_finite += 1;
            return Ok(());
        };
        acc.increment(cube, z - 1, meta.bin_index(label))?;
        summary.pixels_counted += 1;
        Ok(())
    };
    scan_pair(zone, values, &mut visitor)?;
    acc.finish(cube)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use histocube_core::{LayerDef, MemoryValueRaster, MemoryZoneRaster};
    use tempfile::tempdir;

    fn cube_with_layer(dir: &tempfile::TempDir, num_features: u64) -> HistoCube {
        let mut cube = HistoCube::create(dir.path().join("p.hcub"), num_features).unwrap();
        cube.create_layer(LayerDef::new("L", 0, 4)).unwrap();
        cube
    }

    #[test]
    fn test_populate_scenario_three_pixels() {
        // Zone {1,1,2}, values {0,1,0}: feature 0 gains bins 0 and 1,
        // feature 1 gains bin 0, feature 2 untouched.
        let dir = tempdir().unwrap();
        let mut cube = cube_with_layer(&dir, 3);
        let zone = MemoryZoneRaster::new(3, 1, vec![1, 1, 2]).unwrap();
        let values = MemoryValueRaster::new(3, 1, vec![0.0, 1.0, 0.0]).unwrap();

        let summary =
            populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default()).unwrap();
        assert_eq!(summary.pixels_scanned, 3);
        assert_eq!(summary.pixels_counted, 3);
        assert_eq!(summary.background, 0);

        let mut rows = vec![0u32; 15];
        cube.read_rows("L", 0, 2, &mut rows).unwrap();
        assert_eq!(&rows[0..5], &[1, 1, 0, 0, 0]);
        assert_eq!(&rows[5..10], &[1, 0, 0, 0, 0]);
        assert_eq!(&rows[10..15], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_populate_modes_agree() {
        let dir = tempdir().unwrap();
        let mut cube = HistoCube::create(dir.path().join("m.hcub"), 4).unwrap();
        cube.create_layer(LayerDef::new("mem", 0, 9)).unwrap();
        cube.create_layer(LayerDef::new("direct", 0, 9)).unwrap();

        let zone =
            MemoryZoneRaster::new(4, 3, vec![1, 1, 2, 0, 3, 4, 4, 4, 2, 1, 0, 3]).unwrap();
        let values = MemoryValueRaster::new(
            4,
            3,
            vec![0.0, 3.0, 9.0, 5.0, 2.0, 2.0, 2.0, 7.0, 9.4, 0.6, 1.0, 2.0],
        )
        .unwrap();

        let opts_mem = PopulateOptions {
            mode: PopulateMode::InMemory,
        };
        let opts_direct = PopulateOptions {
            mode: PopulateMode::Direct,
        };
        let s1 = populate_layer(&mut cube, "mem", &zone, &values, &opts_mem).unwrap();
        let s2 = populate_layer(&mut cube, "direct", &zone, &values, &opts_direct).unwrap();
        assert_eq!(s1, s2);

        let mut a = vec![0u32; 40];
        let mut b = vec![0u32; 40];
        cube.read_rows("mem", 0, 3, &mut a).unwrap();
        cube.read_rows("direct", 0, 3, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_populate_skips_no_data() {
        let dir = tempdir().unwrap();
        let mut cube = cube_with_layer(&dir, 3);
        let zone = MemoryZoneRaster::new(3, 1, vec![1, 1, 2]).unwrap();
        let values = MemoryValueRaster::new(3, 1, vec![0.0, -99.0, -99.0])
            .unwrap()
            .with_no_data(-99.0);

        let summary =
            populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default()).unwrap();
        assert_eq!(summary.no_data, 2);
        assert_eq!(summary.pixels_counted, 1);

        let mut rows = vec![0u32; 15];
        cube.read_rows("L", 0, 2, &mut rows).unwrap();
        assert_eq!(&rows[0..5], &[1, 0, 0, 0, 0]);
        assert!(rows[5..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_populate_clamps_out_of_domain_samples() {
        let dir = tempdir().unwrap();
        let mut cube = cube_with_layer(&dir, 1);
        let zone = MemoryZoneRaster::new(2, 1, vec![1, 1]).unwrap();
        let values = MemoryValueRaster::new(2, 1, vec![-50.0, 50.0]).unwrap();

        populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default()).unwrap();
        let mut row = vec![0u32; 5];
        cube.read_rows("L", 0, 0, &mut row).unwrap();
        assert_eq!(row, [1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_populate_skips_nan_samples() {
        // Domain starting above zero, so a mishandled NaN could not hide
        // in bin 0
        let dir = tempdir().unwrap();
        let mut cube = HistoCube::create(dir.path().join("n.hcub"), 2).unwrap();
        cube.create_layer(LayerDef::new("L", 1, 5)).unwrap();
        let zone = MemoryZoneRaster::new(3, 1, vec![1, 1, 2]).unwrap();
        let values = MemoryValueRaster::new(3, 1, vec![f64::NAN, 3.0, f64::NAN]).unwrap();

        let summary =
            populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default()).unwrap();
        assert_eq!(summary.pixels_scanned, 3);
        assert_eq!(summary.non_finite, 2);
        assert_eq!(summary.pixels_counted, 1);

        let mut rows = vec![0u32; 10];
        cube.read_rows("L", 0, 1, &mut rows).unwrap();
        assert_eq!(&rows[0..5], &[0, 0, 1, 0, 0]);
        assert!(rows[5..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_populate_rejects_grid_mismatch() {
        let dir = tempdir().unwrap();
        let mut cube = cube_with_layer(&dir, 3);
        let zone = MemoryZoneRaster::new(3, 1, vec![1, 1, 2]).unwrap();
        let values = MemoryValueRaster::new(2, 1, vec![0.0, 1.0]).unwrap();
        assert!(matches!(
            populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default()),
            Err(Error::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_populate_rejects_oversized_zone_value() {
        let dir = tempdir().unwrap();
        let mut cube = cube_with_layer(&dir, 3);
        let zone = MemoryZoneRaster::new(1, 1, vec![4]).unwrap();
        let values = MemoryValueRaster::new(1, 1, vec![0.0]).unwrap();
        assert!(matches!(
            populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default()),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_populate_accumulates_over_runs() {
        // Two runs double every count: increments are pure additions
        let dir = tempdir().unwrap();
        let mut cube = cube_with_layer(&dir, 2);
        let zone = MemoryZoneRaster::new(2, 1, vec![1, 2]).unwrap();
        let values = MemoryValueRaster::new(2, 1, vec![1.0, 3.0]).unwrap();

        populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default()).unwrap();
        populate_layer(&mut cube, "L", &zone, &values, &PopulateOptions::default()).unwrap();

        let mut rows = vec![0u32; 10];
        cube.read_rows("L", 0, 1, &mut rows).unwrap();
        assert_eq!(&rows[0..5], &[0, 2, 0, 0, 0]);
        assert_eq!(&rows[5..10], &[0, 0, 0, 2, 0]);
    }
}
