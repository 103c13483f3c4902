//! Append-only WARC file writer.

// ============================================================================
// Imports
// ============================================================================

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::browser::Exchange;
use crate::error::Result;

use super::record::{ExchangeRecords, format_exchange};

// ============================================================================
// WarcWriter
// ============================================================================

/// Appends exchanges to a WARC file.
///
/// Each exchange is written as one contiguous request/response pair and
/// flushed to disk before [`write_exchange`](Self::write_exchange) returns.
/// The writer is the file's only writer; share it behind a lock if several
/// sessions archive into one file.
#[derive(Debug)]
pub struct WarcWriter {
    path: PathBuf,
    file: File,
    exchanges_written: u64,
    bytes_written: u64,
}

impl WarcWriter {
    /// Opens a WARC file for appending, creating it and its parent
    /// directories if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be opened.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "Archive opened");

        Ok(Self {
            path,
            file,
            exchanges_written: 0,
            bytes_written: 0,
        })
    }

    /// Returns the archive path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of exchanges written by this writer.
    #[inline]
    #[must_use]
    pub fn exchanges_written(&self) -> u64 {
        self.exchanges_written
    }

    /// Returns the number of bytes written by this writer.
    #[inline]
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes an exchange stamped with the current time.
    ///
    /// # Errors
    ///
    /// - [`Error::Archive`](crate::Error::Archive) if the exchange has no target URI
    /// - [`Error::Io`](crate::Error::Io) if writing or syncing fails
    pub fn write_exchange(&mut self, exchange: &Exchange) -> Result<ExchangeRecords> {
        self.write_exchange_at(exchange, Utc::now())
    }

    /// Writes an exchange stamped with the given capture time.
    ///
    /// # Errors
    ///
    /// Same as [`write_exchange`](Self::write_exchange).
    pub fn write_exchange_at(
        &mut self,
        exchange: &Exchange,
        captured_at: DateTime<Utc>,
    ) -> Result<ExchangeRecords> {
        let records = format_exchange(exchange, captured_at)?;

        append(&mut self.file, &records.bytes)?;

        self.exchanges_written += 1;
        self.bytes_written += records.bytes.len() as u64;

        debug!(
            uri = %exchange.target_uri(),
            status = exchange.response.status,
            body_bytes = exchange.body.len(),
            request_record = %records.request_id,
            response_record = %records.response_id,
            "Exchange archived"
        );

        Ok(records)
    }

    /// Converts the writer into an exchange handler for a page session.
    pub fn into_handler(mut self) -> impl FnMut(&Exchange) -> Result<()> + Send + 'static {
        move |exchange: &Exchange| self.write_exchange(exchange).map(|_| ())
    }
}

// ============================================================================
// Durable append
// ============================================================================

/// Storage that records are appended to.
trait ArchiveSink: Write {
    fn size(&self) -> io::Result<u64>;
    fn truncate(&mut self, size: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl ArchiveSink for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.set_len(size)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Appends `bytes` and syncs. On failure the sink is cut back to its previous
/// size, so the archive never ends in a partial record.
fn append<S: ArchiveSink>(sink: &mut S, bytes: &[u8]) -> io::Result<()> {
    let start = sink.size()?;

    if let Err(e) = sink.write_all(bytes).and_then(|()| sink.sync()) {
        if let Err(rollback) = sink.truncate(start) {
            warn!(size = start, error = %rollback, "Could not remove partial record");
        }
        return Err(e);
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
