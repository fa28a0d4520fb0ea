//! Layer metadata and value quantization
//!
//! A layer is a named histogram definition: an inclusive bin-label domain
//! `[low_bin, up_bin]` plus the `scale`/`offset` pair that maps a raw raster
//! sample into that domain. The per-feature count data itself lives in the
//! store; this module only describes it.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Parameters for creating a new layer.
///
/// Validated into a [`LayerMeta`] by the store at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDef {
    /// Layer name, unique within a store
    pub name: String,
    /// Lowest bin label (inclusive)
    pub low_bin: i32,
    /// Highest bin label (inclusive)
    pub up_bin: i32,
    /// Quantization scale: `label = round((sample - offset) / scale)`
    pub scale: f32,
    /// Quantization offset
    pub offset: f32,
    /// Optional creation timestamp recorded in the layer directory
    pub timestamp: Option<DateTime<Utc>>,
}

impl LayerDef {
    /// Create a layer definition with unit scale, zero offset and no
    /// timestamp.
    pub fn new(name: impl Into<String>, low_bin: i32, up_bin: i32) -> Self {
        Self {
            name: name.into(),
            low_bin,
            up_bin,
            scale: 1.0,
            offset: 0.0,
            timestamp: None,
        }
    }

    /// Set the quantization parameters.
    pub fn with_quantization(mut self, scale: f32, offset: f32) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    /// Set the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validate the definition into layer metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the name is empty, the bin
    /// domain is not strictly increasing, or `scale` is zero/non-finite.
    pub fn validate(self) -> Result<LayerMeta> {
        if self.name.is_empty() {
            return Err(Error::InvalidParameter("layer name is empty".into()));
        }
        if self.low_bin >= self.up_bin {
            return Err(Error::InvalidParameter(format!(
                "bin domain [{}, {}] is not increasing",
                self.low_bin, self.up_bin
            )));
        }
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(Error::InvalidParameter(format!(
                "scale {} is not usable for quantization",
                self.scale
            )));
        }
        if !self.offset.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "offset {} is not finite",
                self.offset
            )));
        }
        Ok(LayerMeta {
            name: self.name,
            low_bin: self.low_bin,
            up_bin: self.up_bin,
            scale: self.scale,
            offset: self.offset,
            timestamp: self.timestamp,
        })
    }
}

/// Metadata for one layer in a store.
///
/// Immutable once the layer has been created; only the count data behind it
/// is mutable. The bin-label domain `[low_bin, up_bin]` is inclusive on both
/// ends, so a layer always has at least two bins.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMeta {
    name: String,
    low_bin: i32,
    up_bin: i32,
    scale: f32,
    offset: f32,
    timestamp: Option<DateTime<Utc>>,
}

impl LayerMeta {
    /// Layer name, unique within its store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowest bin label (inclusive).
    pub fn low_bin(&self) -> i32 {
        self.low_bin
    }

    /// Highest bin label (inclusive).
    pub fn up_bin(&self) -> i32 {
        self.up_bin
    }

    /// Quantization scale.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Quantization offset.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Creation timestamp, if one was recorded.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Number of bins in the layer's domain.
    pub fn bin_count(&self) -> usize {
        (self.up_bin - self.low_bin) as usize + 1
    }

    /// Iterator over the bin labels in label order.
    pub fn bin_labels(&self) -> impl Iterator<Item = i32> + use<> {
        self.low_bin..=self.up_bin
    }

    /// Quantize a raw sample into a bin label.
    ///
    /// Computes `round((sample - offset) / scale)` and clamps the result
    /// into `[low_bin, up_bin]`. Out-of-domain samples (infinities
    /// included) are clamped, never dropped; rounding is
    /// half-away-from-zero so a sample exactly on a bin boundary always
    /// lands in one deterministic bin. A NaN sample has no label and
    /// yields `None`.
    pub fn quantize(&self, sample: f64) -> Option<i32> {
        let raw = (sample - self.offset as f64) / self.scale as f64;
        let label = raw.round();
        if label.is_nan() {
            None
        } else if label <= self.low_bin as f64 {
            Some(self.low_bin)
        } else if label >= self.up_bin as f64 {
            Some(self.up_bin)
        } else {
            Some(label as i32)
        }
    }

    /// Bin index (offset into a histogram row) for a bin label.
    ///
    /// The label must be inside the layer's domain.
    pub fn bin_index(&self, label: i32) -> usize {
        debug_assert!(label >= self.low_bin && label <= self.up_bin);
        (label - self.low_bin) as usize
    }

    /// Physical value corresponding to a bin label, inverting the
    /// quantization mapping: `value = label * scale + offset`.
    pub fn label_to_value(&self, label: i32) -> f64 {
        label as f64 * self.scale as f64 + self.offset as f64
    }

    /// Reconstruct metadata from its persisted fields.
    ///
    /// Used by the store when decoding a layer directory; applies the same
    /// validation as [`LayerDef::validate`].
    pub fn from_parts(
        name: String,
        low_bin: i32,
        up_bin: i32,
        scale: f32,
        offset: f32,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        LayerDef {
            name,
            low_bin,
            up_bin,
            scale,
            offset,
            timestamp,
        }
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(low: i32, up: i32, scale: f32, offset: f32) -> LayerMeta {
        LayerDef::new("t", low, up)
            .with_quantization(scale, offset)
            .validate()
            .unwrap()
    }

    #[test]
    fn test_layerdef_rejects_empty_name() {
        assert!(LayerDef::new("", 0, 4).validate().is_err());
    }

    #[test]
    fn test_layerdef_rejects_bad_domain() {
        assert!(LayerDef::new("t", 4, 4).validate().is_err());
        assert!(LayerDef::new("t", 5, 4).validate().is_err());
    }

    #[test]
    fn test_layerdef_rejects_zero_scale() {
        assert!(
            LayerDef::new("t", 0, 4)
                .with_quantization(0.0, 0.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_bin_count_and_labels() {
        let m = meta(-2, 2, 1.0, 0.0);
        assert_eq!(m.bin_count(), 5);
        assert_eq!(m.bin_labels().collect::<Vec<_>>(), vec![-2, -1, 0, 1, 2]);
        assert_eq!(m.bin_index(-2), 0);
        assert_eq!(m.bin_index(2), 4);
    }

    #[test]
    fn test_quantize_identity() {
        let m = meta(0, 4, 1.0, 0.0);
        assert_eq!(m.quantize(0.0), Some(0));
        assert_eq!(m.quantize(2.4), Some(2));
        assert_eq!(m.quantize(4.0), Some(4));
    }

    #[test]
    fn test_quantize_clamps_out_of_domain() {
        let m = meta(0, 4, 1.0, 0.0);
        assert_eq!(m.quantize(-100.0), Some(0));
        assert_eq!(m.quantize(100.0), Some(4));
        assert_eq!(m.quantize(f64::NEG_INFINITY), Some(0));
        assert_eq!(m.quantize(f64::INFINITY), Some(4));
    }

    #[test]
    fn test_quantize_nan_has_no_label() {
        // A domain starting above zero: an unhandled NaN would otherwise
        // cast to 0 and land outside [1, 5]
        let m = meta(1, 5, 1.0, 0.0);
        assert_eq!(m.quantize(f64::NAN), None);
        assert_eq!(m.quantize(3.0), Some(3));
    }

    #[test]
    fn test_quantize_boundary_is_deterministic() {
        // Half-away-from-zero: 1.5 always quantizes to 2, never 1
        let m = meta(0, 4, 1.0, 0.0);
        assert_eq!(m.quantize(1.5), Some(2));
        assert_eq!(m.quantize(2.5), Some(3));
    }

    #[test]
    fn test_quantize_scale_offset() {
        // Samples in [100, 140], 10 units per bin
        let m = meta(0, 4, 10.0, 100.0);
        assert_eq!(m.quantize(100.0), Some(0));
        assert_eq!(m.quantize(117.0), Some(2));
        assert_eq!(m.quantize(139.0), Some(4));
        assert_eq!(m.quantize(1000.0), Some(4));
        assert_eq!(m.label_to_value(2), 120.0);
    }
}
