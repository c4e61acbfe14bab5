use csv::{Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::datasets::swaps::{SwapRow, SWAP_CSV_HEADER};
use crate::models::errors::StorageError;
use crate::storage::SwapSink;

/// Appends swap rows to a CSV file.
///
/// The file is opened on the first non-empty append. In overwrite mode it is
/// truncated and gets a fresh header; in append mode existing content is kept
/// and the header is only written to a new or empty file.
pub struct CsvSink {
    path: PathBuf,
    append: bool,
    writer: Option<Writer<File>>,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(path: P, append: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            append,
            writer: None,
        }
    }

    fn open(&self) -> Result<Writer<File>, StorageError> {
        let open_error = |source| StorageError::Open {
            path: self.path.to_string_lossy().into_owned(),
            source,
        };

        let file = if self.append {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(open_error)?
        } else {
            File::create(&self.path).map_err(open_error)?
        };

        let needs_header = file.metadata().map_err(open_error)?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(SWAP_CSV_HEADER)?;
        }

        info!(
            "Opened {} ({})",
            self.path.display(),
            if self.append { "append" } else { "overwrite" }
        );

        Ok(writer)
    }
}

impl SwapSink for CsvSink {
    fn append(&mut self, rows: &[SwapRow]) -> Result<(), StorageError> {
        if rows.is_empty() {
            return Ok(());
        }

        if self.writer.is_none() {
            self.writer = Some(self.open()?);
        }

        if let Some(writer) = self.writer.as_mut() {
            for row in rows {
                writer.serialize(row)?;
            }
            // Rows must hit disk per height so an aborted run keeps them
            writer.flush()?;
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
