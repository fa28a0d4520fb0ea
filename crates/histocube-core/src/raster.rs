//! Raster collaborator traits and in-memory implementations
//!
//! The store never decodes raster files itself; population and export work
//! against three narrow seams supplied by the caller:
//!
//! - [`ZoneRaster`] - a single integer band mapping each pixel to a feature
//!   (0 = background, `1..=num_features` = feature index + 1)
//! - [`ValueRaster`] - a single numeric band on the same grid, with an
//!   optional no-data sentinel
//! - [`RasterSink`] - a multi-band output raster accepting full bands
//!
//! All three are row-oriented: callers read and write one horizontal row at
//! a time. [`MemoryZoneRaster`], [`MemoryValueRaster`] and
//! [`MemoryRasterSink`] implement the seams over plain vectors for tests and
//! embedding callers.

use crate::error::{Error, Result};

/// Georeferencing carried from an input raster to derived outputs.
///
/// Six-coefficient affine transform in the usual order (origin x, pixel
/// width, row rotation, origin y, column rotation, pixel height) plus a
/// free-form projection string. The store only copies it; it never
/// interprets the coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    pub transform: [f64; 6],
    pub projection: String,
}

impl Default for GeoReference {
    fn default() -> Self {
        Self {
            transform: [0.0, 1.0, 0.0, 0.0, 0.0, -1.0],
            projection: String::new(),
        }
    }
}

/// Sample type requested for an exported raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelType {
    /// Unsigned 32-bit counts (natural type for bin exports)
    UInt32,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    #[default]
    Float64,
}

/// Single-band integer raster assigning each pixel to a feature.
pub trait ZoneRaster {
    /// Raster width in pixels.
    fn width(&self) -> u32;

    /// Raster height in pixels.
    fn height(&self) -> u32;

    /// Georeferencing of the raster grid.
    fn geo(&self) -> &GeoReference;

    /// Read one horizontal row of zone values into `out`.
    ///
    /// `out` must hold exactly `width()` samples; `y` must be below
    /// `height()`.
    fn read_row(&self, y: u32, out: &mut [u64]) -> Result<()>;
}

/// Single numeric band co-registered with a zone raster.
///
/// The trait carries no georeferencing of its own: the store can verify
/// that a value raster matches a zone raster in pixel dimensions, but not
/// that the two grids cover the same ground extent. Co-registration is the
/// caller's contract.
pub trait ValueRaster {
    /// Raster width in pixels.
    fn width(&self) -> u32;

    /// Raster height in pixels.
    fn height(&self) -> u32;

    /// Declared no-data sentinel, if any.
    fn no_data(&self) -> Option<f64>;

    /// Read one horizontal row of samples into `out`.
    fn read_row(&self, y: u32, out: &mut [f64]) -> Result<()>;
}

/// Multi-band output raster accepting whole bands.
pub trait RasterSink {
    /// Raster width in pixels.
    fn width(&self) -> u32;

    /// Raster height in pixels.
    fn height(&self) -> u32;

    /// Number of bands the sink was created with.
    fn band_count(&self) -> usize;

    /// Write a full band, row-major, `width * height` samples.
    fn write_band(&mut self, band: usize, data: &[f64]) -> Result<()>;
}

fn check_row_access(width: u32, height: u32, y: u32, out_len: usize) -> Result<()> {
    if y >= height {
        return Err(Error::InvalidParameter(format!(
            "row {y} outside raster height {height}"
        )));
    }
    if out_len != width as usize {
        return Err(Error::InvalidParameter(format!(
            "row buffer holds {out_len} samples, raster width is {width}"
        )));
    }
    Ok(())
}

/// In-memory zone raster backed by a row-major vector.
#[derive(Debug, Clone)]
pub struct MemoryZoneRaster {
    width: u32,
    height: u32,
    geo: GeoReference,
    zones: Vec<u64>,
}

impl MemoryZoneRaster {
    /// Create a zone raster from row-major zone values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `zones` does not hold exactly
    /// `width * height` values.
    pub fn new(width: u32, height: u32, zones: Vec<u64>) -> Result<Self> {
        if zones.len() != (width as usize) * (height as usize) {
            return Err(Error::InvalidParameter(format!(
                "zone data holds {} values, grid is {width}x{height}",
                zones.len()
            )));
        }
        Ok(Self {
            width,
            height,
            geo: GeoReference::default(),
            zones,
        })
    }

    /// Replace the default georeferencing.
    pub fn with_geo(mut self, geo: GeoReference) -> Self {
        self.geo = geo;
        self
    }
}

impl ZoneRaster for MemoryZoneRaster {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn geo(&self) -> &GeoReference {
        &self.geo
    }

    fn read_row(&self, y: u32, out: &mut [u64]) -> Result<()> {
        check_row_access(self.width, self.height, y, out.len())?;
        let start = (y as usize) * (self.width as usize);
        out.copy_from_slice(&self.zones[start..start + self.width as usize]);
        Ok(())
    }
}

/// In-memory value raster backed by a row-major vector.
#[derive(Debug, Clone)]
pub struct MemoryValueRaster {
    width: u32,
    height: u32,
    no_data: Option<f64>,
    samples: Vec<f64>,
}

impl MemoryValueRaster {
    /// Create a value raster from row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `samples` does not hold
    /// exactly `width * height` values.
    pub fn new(width: u32, height: u32, samples: Vec<f64>) -> Result<Self> {
        if samples.len() != (width as usize) * (height as usize) {
            return Err(Error::InvalidParameter(format!(
                "sample data holds {} values, grid is {width}x{height}",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            no_data: None,
            samples,
        })
    }

    /// Declare a no-data sentinel.
    pub fn with_no_data(mut self, no_data: f64) -> Self {
        self.no_data = Some(no_data);
        self
    }
}

impl ValueRaster for MemoryValueRaster {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn no_data(&self) -> Option<f64> {
        self.no_data
    }

    fn read_row(&self, y: u32, out: &mut [f64]) -> Result<()> {
        check_row_access(self.width, self.height, y, out.len())?;
        let start = (y as usize) * (self.width as usize);
        out.copy_from_slice(&self.samples[start..start + self.width as usize]);
        Ok(())
    }
}

/// In-memory multi-band output raster.
#[derive(Debug, Clone)]
pub struct MemoryRasterSink {
    width: u32,
    height: u32,
    pixel_type: PixelType,
    geo: GeoReference,
    bands: Vec<Vec<f64>>,
}

impl MemoryRasterSink {
    /// Create a sink with `band_count` zero-filled bands.
    pub fn new(width: u32, height: u32, band_count: usize, pixel_type: PixelType) -> Self {
        let band = vec![0.0; (width as usize) * (height as usize)];
        Self {
            width,
            height,
            pixel_type,
            geo: GeoReference::default(),
            bands: vec![band; band_count],
        }
    }

    /// Create a sink on the same grid and georeferencing as a zone raster.
    pub fn like(template: &impl ZoneRaster, band_count: usize, pixel_type: PixelType) -> Self {
        let mut sink = Self::new(template.width(), template.height(), band_count, pixel_type);
        sink.geo = template.geo().clone();
        sink
    }

    /// Sample type the sink was created with.
    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Georeferencing copied from the template raster.
    pub fn geo(&self) -> &GeoReference {
        &self.geo
    }

    /// Row-major samples of one band.
    pub fn band(&self, band: usize) -> Option<&[f64]> {
        self.bands.get(band).map(Vec::as_slice)
    }
}

impl RasterSink for MemoryRasterSink {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn write_band(&mut self, band: usize, data: &[f64]) -> Result<()> {
        let expected = (self.width as usize) * (self.height as usize);
        if data.len() != expected {
            return Err(Error::InvalidParameter(format!(
                "band data holds {} samples, grid is {}x{}",
                data.len(),
                self.width,
                self.height
            )));
        }
        let band_count = self.bands.len();
        let slot = self.bands.get_mut(band).ok_or_else(|| {
            Error::InvalidParameter(format!("band index {band} outside {band_count} bands"))
        })?;
        slot.copy_from_slice(data);
        Ok(())
    }
}
