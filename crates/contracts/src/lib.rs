//! # Contracts
//!
//! Shared data structures and traits of the curation pipeline.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every instant is `f64` seconds since the Unix epoch on the reference clock
//! - Device clocks reach the reference clock through a per-(subject, device)
//!   [`TimeReference`] offset
//! - Segment payloads are zero-based: the first sample sits at `0.0`

mod blueprint;
mod boundary;
mod error;
mod reference;
mod report;
mod segment;
mod segment_id;
mod sensor;
mod sink;
mod table;
pub mod time;

pub use blueprint::*;
pub use boundary::*;
pub use error::*;
pub use reference::*;
pub use report::*;
pub use segment::*;
pub use segment_id::{SegmentId, SubjectId};
pub use sensor::*;
pub use sink::*;
pub use table::*;
