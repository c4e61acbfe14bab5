pub mod csv;

pub use self::csv::CsvSink;

use crate::models::datasets::swaps::SwapRow;
use crate::models::errors::StorageError;

/// Destination for extracted swap rows. Rows are only ever appended.
pub trait SwapSink {
    fn append(&mut self, rows: &[SwapRow]) -> Result<(), StorageError>;
    fn flush(&mut self) -> Result<(), StorageError>;
}
