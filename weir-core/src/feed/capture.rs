//! Capture files: raw concatenations of market-data records.
//!
//! No header, no trailer, no per-record length prefix — the leading tag
//! byte of each record is the only framing, so the reader walks tags to
//! recover record boundaries. The whole file is validated at load: a
//! trailing partial record or an unknown tag rejects the file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::feed::PacketError;
use crate::wire::MarketDataMessage;

/// A loaded capture: the raw bytes plus an index of record boundaries.
pub struct Capture {
    path: PathBuf,
    data: Vec<u8>,
    /// (offset, length) of each record in `data`.
    records: Vec<(usize, usize)>,
}

impl Capture {
    /// Slurp and index a capture file.
    ///
    /// Fails if the file cannot be read, or if its bytes do not parse into
    /// a whole number of records.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("reading capture file {}", path.display()))?;

        let records = Self::index(&data)
            .with_context(|| format!("malformed capture file {}", path.display()))?;

        tracing::info!(
            file = %path.display(),
            records = records.len(),
            bytes = data.len(),
            "capture loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            data,
            records,
        })
    }

    /// Walk tags over `data` and return each record's (offset, len).
    fn index(data: &[u8]) -> Result<Vec<(usize, usize)>, PacketError> {
        let mut records = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let tag = data[offset];
            let size = MarketDataMessage::record_size(tag)
                .ok_or(PacketError::UnknownType { at: offset, tag })?;

            let remaining = data.len() - offset;
            if size > remaining {
                return Err(PacketError::Truncated {
                    at: offset,
                    needed: size,
                    remaining,
                });
            }

            records.push((offset, size));
            offset += size;
        }

        Ok(records)
    }

    /// Number of records in the capture.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw bytes of record `i`.
    pub fn record(&self, i: usize) -> &[u8] {
        let (offset, len) = self.records[i];
        &self.data[offset..offset + len]
    }

    /// Decode record `i`.
    pub fn message(&self, i: usize) -> MarketDataMessage {
        MarketDataMessage::decode(self.record(i))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Appends market-data records to a capture file.
pub struct CaptureWriter {
    out: BufWriter<File>,
    scratch: [u8; 64],
    records_written: usize,
}

impl CaptureWriter {
    /// Create (truncate) a capture file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("creating capture file {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
            scratch: [0u8; 64],
            records_written: 0,
        })
    }

    /// Append one record.
    pub fn write(&mut self, message: &MarketDataMessage) -> Result<()> {
        let size = message.encode(&mut self.scratch);
        self.out
            .write_all(&self.scratch[..size])
            .context("writing capture record")?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().context("flushing capture file")
    }
}
