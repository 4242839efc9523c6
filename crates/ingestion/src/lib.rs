//! # Ingestion
//!
//! Reading of clinical tables and raw sensor files.
//!
//! Responsibilities:
//! - Read delimited clinical / calibration tables into `Table`s
//! - Discover raw sensor files and decide relevance from their names
//! - Parse raw files into time-sorted streams, split by body location
//! - Align streams to the reference clock (Stream Aligner)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{discover_files, AlignOutcome, RelevanceIndex, StreamAligner};
//!
//! let index = RelevanceIndex::from_boundaries(&boundaries, 600.0);
//! let aligner = StreamAligner::device_offset(&references);
//! for file in index.filter(discover_files(&source)?) {
//!     if let AlignOutcome::Aligned(streams) = aligner.align(&source, &file)? {
//!         // join per-month pieces with `SensorStream::append`, then segment
//!     }
//! }
//! ```

mod aligner;
mod discovery;
mod error;
mod reader;
mod table_reader;

// Re-exports
pub use aligner::{AlignOutcome, StreamAligner};
pub use discovery::{discover_files, RelevanceIndex, SensorFile, SensorFileName, YearMonth};
pub use error::{IngestionError, Result};
pub use reader::{normalize_location, parse_time, SensorFileReader};
pub use table_reader::{read_table, read_table_source};
