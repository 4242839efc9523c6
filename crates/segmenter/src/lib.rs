//! # Segmenter
//!
//! Cuts aligned sensor streams against resolved boundaries.
//!
//! Responsibilities:
//! - Range extraction for interval boundaries
//! - Center extraction for checkpoint boundaries (`center ± radius`)
//! - Zero-basing of every extracted range
//! - Null-payload segments for checkpoints under full-cardinality mode
//!
//! ## Usage Example
//!
//! ```ignore
//! use segmenter::{Segmenter, SegmenterConfig};
//!
//! let segmenter = Segmenter::new(SegmenterConfig::from_blueprint(&blueprint));
//! let by_subject = boundaries.by_subject();
//! for stream in aligned_streams {
//!     let own = by_subject.get(&stream.key.subject_id).into_iter().flatten().copied();
//!     let batch = segmenter.segment(&stream, own);
//!     // hand batch.segments to the assembler
//! }
//! ```

mod engine;
mod window;

// Re-exports
pub use engine::{SegmentBatch, Segmenter, SegmenterConfig};
pub use window::{select_range, zero_base};
