//! The histogram store engine
//!
//! [`HistoCube`] owns one container file holding, for a fixed population of
//! features, any number of named histogram layers. Layers are append-only:
//! once created, a layer's bin domain is immutable and only its counts may
//! change, through inclusive-range row reads and writes.
//!
//! The handle is single-writer and not internally synchronized; concurrent
//! readers of distinct, already-populated layers are safe as long as no
//! writer touches the same row range.

use crate::format;
use histocube_core::{Error, LayerDef, LayerMeta, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Chunk size for zero-filling a new layer's row block
const ZERO_CHUNK: usize = 64 * 1024;

/// One committed layer: its metadata plus where its row block starts.
#[derive(Debug)]
struct CubeLayer {
    meta: LayerMeta,
    data_offset: u64,
}

/// An open histogram store.
///
/// Create with [`HistoCube::create`] (new file) or [`HistoCube::open`]
/// (existing file), and release with [`HistoCube::close`]. Every operation
/// on a closed handle fails with [`Error::ClosedHandle`].
#[derive(Debug)]
pub struct HistoCube {
    file: Option<File>,
    writable: bool,
    num_features: u64,
    layers: Vec<CubeLayer>,
}

impl HistoCube {
    /// Create a new, empty store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if `path` exists,
    /// [`Error::InvalidParameter`] if `num_features` is zero.
    pub fn create(path: impl AsRef<Path>, num_features: u64) -> Result<Self> {
        Self::create_impl(path.as_ref(), num_features, false)
    }

    /// Create a new store at `path`, truncating any existing file.
    pub fn create_truncate(path: impl AsRef<Path>, num_features: u64) -> Result<Self> {
        Self::create_impl(path.as_ref(), num_features, true)
    }

    fn create_impl(path: &Path, num_features: u64, truncate: bool) -> Result<Self> {
        if num_features == 0 {
            return Err(Error::InvalidParameter(
                "store must hold at least one feature".into(),
            ));
        }
        if !truncate && path.exists() {
            return Err(Error::AlreadyExists(path.display().to_string()));
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .create_new(!truncate)
            .open(path)?;
        format::write_header(&mut file, num_features, 0)?;
        file.sync_all()?;
        Ok(Self {
            file: Some(file),
            writable: true,
            num_features,
            layers: Vec::new(),
        })
    }

    /// Open an existing store.
    ///
    /// Scans the layer directory and validates that every committed row
    /// block is fully present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreNotFound`] for a missing file and
    /// [`Error::Format`] for an unrecognized or truncated container.
    pub fn open(path: impl AsRef<Path>, writable: bool) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::StoreNotFound(path.display().to_string()));
        }
        let mut file = OpenOptions::new().read(true).write(writable).open(path)?;
        let file_len = file.metadata()?.len();

        let (num_features, layer_count) = format::read_header(&mut file)?;

        let mut layers = Vec::with_capacity(layer_count as usize);
        let mut pos = format::HEADER_LEN;
        for i in 0..layer_count {
            file.seek(SeekFrom::Start(pos))?;
            let meta = format::read_meta(&mut file)
                .map_err(|e| Error::Format(format!("layer {i}: {e}")))?;
            pos += format::meta_len(&meta);
            let data_offset = pos;
            pos += format::block_len(num_features, meta.bin_count());
            if pos > file_len {
                return Err(Error::Format(format!(
                    "layer '{}' row block is truncated",
                    meta.name()
                )));
            }
            layers.push(CubeLayer { meta, data_offset });
        }

        Ok(Self {
            file: Some(file),
            writable,
            num_features,
            layers,
        })
    }

    /// Number of feature rows shared by every layer.
    pub fn num_features(&self) -> u64 {
        self.num_features
    }

    /// Whether the store accepts mutating operations.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Layer directory in creation order. Empty for a fresh store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClosedHandle`] if the handle has been closed.
    pub fn layers(&self) -> Result<impl Iterator<Item = &LayerMeta>> {
        if self.file.is_none() {
            return Err(Error::ClosedHandle);
        }
        Ok(self.layers.iter().map(|l| &l.meta))
    }

    /// Look up a layer by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayerNotFound`] if no layer has this name,
    /// [`Error::ClosedHandle`] if the handle has been closed.
    pub fn layer(&self, name: &str) -> Result<&LayerMeta> {
        if self.file.is_none() {
            return Err(Error::ClosedHandle);
        }
        self.layers
            .iter()
            .map(|l| &l.meta)
            .find(|m| m.name() == name)
            .ok_or_else(|| Error::LayerNotFound(name.to_string()))
    }

    /// Whether an open handle holds a layer with this name. Always `false`
    /// once the handle is closed.
    pub fn has_layer(&self, name: &str) -> bool {
        self.file.is_some() && self.layers.iter().any(|l| l.meta.name() == name)
    }

    /// Append a new layer with a zero-initialized row block.
    ///
    /// The meta record and its zeroed row block are written and synced at
    /// the end of the file before the header layer count is bumped, so an
    /// interrupted append never leaves a partial directory entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for an invalid definition or a
    /// duplicate name, [`Error::ReadOnly`] on a read-only handle.
    pub fn create_layer(&mut self, def: LayerDef) -> Result<&LayerMeta> {
        if self.file.is_none() {
            return Err(Error::ClosedHandle);
        }
        if !self.writable {
            return Err(Error::ReadOnly);
        }
        let meta = def.validate()?;
        if self.has_layer(meta.name()) {
            return Err(Error::InvalidParameter(format!(
                "layer '{}' already exists",
                meta.name()
            )));
        }

        let append_at = self.data_end();
        let block_len = format::block_len(self.num_features, meta.bin_count());
        let data_offset = append_at + format::meta_len(&meta);
        let new_count = self.layers.len() as u32 + 1;

        let file = self.file.as_mut().ok_or(Error::ClosedHandle)?;
        file.seek(SeekFrom::Start(append_at))?;
        {
            let mut writer = BufWriter::new(&mut *file);
            format::write_meta(&mut writer, &meta)?;
            let zeros = [0u8; ZERO_CHUNK];
            let mut remaining = block_len;
            while remaining > 0 {
                let n = remaining.min(ZERO_CHUNK as u64) as usize;
                writer.write_all(&zeros[..n])?;
                remaining -= n as u64;
            }
            writer.flush()?;
        }
        file.sync_all()?;

        // Commit: the record is durable, now make it visible
        file.seek(SeekFrom::Start(format::LAYER_COUNT_OFFSET))?;
        file.write_all(&new_count.to_le_bytes())?;
        file.sync_all()?;

        self.layers.push(CubeLayer { meta, data_offset });
        Ok(&self.layers[self.layers.len() - 1].meta)
    }

    /// Read the inclusive row range `[start_row, end_row]` of a layer into
    /// `out`, feature-major, `bin_count` counts per row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeOutOfBounds`] for a range outside
    /// `[0, num_features)` and [`Error::InvalidParameter`] when `out` does
    /// not hold exactly `(end_row - start_row + 1) * bin_count` counts.
    pub fn read_rows(
        &mut self,
        layer_name: &str,
        start_row: u64,
        end_row: u64,
        out: &mut [u32],
    ) -> Result<()> {
        let (offset, len) = self.range_location(layer_name, start_row, end_row, out.len())?;
        let file = self.file.as_mut().ok_or(Error::ClosedHandle)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; len as usize];
        file.read_exact(&mut bytes)?;
        for (count, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            *count = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    /// Write the inclusive row range `[start_row, end_row]` of a layer from
    /// `data`, feature-major, `bin_count` counts per row.
    ///
    /// # Errors
    ///
    /// Same validation as [`HistoCube::read_rows`], plus
    /// [`Error::ReadOnly`] on a read-only handle.
    pub fn write_rows(
        &mut self,
        layer_name: &str,
        start_row: u64,
        end_row: u64,
        data: &[u32],
    ) -> Result<()> {
        if self.file.is_some() && !self.writable {
            return Err(Error::ReadOnly);
        }
        let (offset, _) = self.range_location(layer_name, start_row, end_row, data.len())?;
        let file = self.file.as_mut().ok_or(Error::ClosedHandle)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut writer = BufWriter::new(file);
        for count in data {
            writer.write_all(&count.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Flush buffered writes and release the file handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClosedHandle`] if the handle was already closed.
    pub fn close(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(Error::ClosedHandle)?;
        if self.writable {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Byte offset one past the last committed row block.
    fn data_end(&self) -> u64 {
        match self.layers.last() {
            Some(last) => {
                last.data_offset + format::block_len(self.num_features, last.meta.bin_count())
            }
            None => format::HEADER_LEN,
        }
    }

    /// Validate a row-range access and return `(byte offset, byte length)`.
    fn range_location(
        &self,
        layer_name: &str,
        start_row: u64,
        end_row: u64,
        buffer_len: usize,
    ) -> Result<(u64, u64)> {
        if self.file.is_none() {
            return Err(Error::ClosedHandle);
        }
        let layer = self
            .layers
            .iter()
            .find(|l| l.meta.name() == layer_name)
            .ok_or_else(|| Error::LayerNotFound(layer_name.to_string()))?;
        if start_row > end_row || end_row >= self.num_features {
            return Err(Error::RangeOutOfBounds {
                start: start_row,
                end: end_row,
                num_features: self.num_features,
            });
        }
        let bin_count = layer.meta.bin_count() as u64;
        let rows = end_row - start_row + 1;
        let expected = rows * bin_count;
        if buffer_len as u64 != expected {
            return Err(Error::InvalidParameter(format!(
                "buffer holds {buffer_len} counts, range [{start_row}, {end_row}] needs {expected}"
            )));
        }
        let offset = layer.data_offset + start_row * bin_count * format::COUNT_SIZE;
        Ok((offset, expected * format::COUNT_SIZE))
    }
}

impl Drop for HistoCube {
    fn drop(&mut self) {
        if let Some(file) = self.file.take()
            && self.writable
        {
            let _ = file.sync_all();
        }
    }
}
