//! Row-scan driver over a co-registered raster pair
//!
//! Population walks a zone raster and a value raster in lockstep, one
//! horizontal row at a time, and hands every `(zone, sample)` pair to a
//! [`PixelVisitor`]. The visitor is the only extension seam: engines decide
//! what a pixel means, the driver only guarantees the pairing and the grid
//! check.

use histocube_core::{Error, Result, ValueRaster, ZoneRaster};

/// Per-pixel callback invoked by [`scan_pair`].
pub trait PixelVisitor {
    /// Handle one pixel: its zone value and the co-registered sample.
    fn on_pixel(&mut self, zone: u64, sample: f64) -> Result<()>;
}

impl<F: FnMut(u64, f64) -> Result<()>> PixelVisitor for F {
    fn on_pixel(&mut self, zone: u64, sample: f64) -> Result<()> {
        self(zone, sample)
    }
}

/// Verify that two rasters share one pixel grid.
///
/// Only dimensions are compared. [`ValueRaster`] carries no
/// georeferencing, so two equally sized grids covering different ground
/// extents pass this check; the caller is responsible for supplying
/// co-registered inputs.
pub fn check_grids(zone: &impl ZoneRaster, values: &impl ValueRaster) -> Result<()> {
    let expected = (zone.width(), zone.height());
    let actual = (values.width(), values.height());
    if expected != actual {
        return Err(Error::GridMismatch { expected, actual });
    }
    Ok(())
}

/// Scan a zone/value raster pair row-major, invoking the visitor for every
/// pixel.
///
/// # Errors
///
/// Returns [`Error::GridMismatch`] if the rasters differ in dimensions;
/// otherwise propagates the first raster or visitor error.
pub fn scan_pair(
    zone: &impl ZoneRaster,
    values: &impl ValueRaster,
    visitor: &mut impl PixelVisitor,
) -> Result<()> {
    check_grids(zone, values)?;
    let width = zone.width() as usize;
    let mut zone_row = vec![0u64; width];
    let mut value_row = vec![0f64; width];
    for y in 0..zone.height() {
        zone.read_row(y, &mut zone_row)?;
        values.read_row(y, &mut value_row)?;
        for (&z, &v) in zone_row.iter().zip(&value_row) {
            visitor.on_pixel(z, v)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use histocube_core::{MemoryValueRaster, MemoryZoneRaster};

    #[test]
    fn test_scan_visits_every_pixel_in_order() {
        let zone = MemoryZoneRaster::new(2, 2, vec![1, 2, 0, 3]).unwrap();
        let values = MemoryValueRaster::new(2, 2, vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        let mut seen = Vec::new();
        let mut visitor = |z: u64, v: f64| {
            seen.push((z, v));
            Ok(())
        };
        scan_pair(&zone, &values, &mut visitor).unwrap();
        assert_eq!(
            seen,
            vec![(1, 10.0), (2, 20.0), (0, 30.0), (3, 40.0)]
        );
    }

    #[test]
    fn test_scan_rejects_grid_mismatch() {
        let zone = MemoryZoneRaster::new(2, 1, vec![1, 2]).unwrap();
        let values = MemoryValueRaster::new(1, 2, vec![1.0, 2.0]).unwrap();
        let mut visitor = |_z: u64, _v: f64| Ok(());
        assert!(matches!(
            scan_pair(&zone, &values, &mut visitor),
            Err(Error::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_scan_propagates_visitor_error() {
        let zone = MemoryZoneRaster::new(1, 1, vec![1]).unwrap();
        let values = MemoryValueRaster::new(1, 1, vec![1.0]).unwrap();
        let mut visitor =
            |_z: u64, _v: f64| Err(Error::InvalidParameter("stop".into()));
        assert!(scan_pair(&zone, &values, &mut visitor).is_err());
    }
}
