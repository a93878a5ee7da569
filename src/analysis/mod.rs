//! Finding analysis.
//!
//! Turns raw scanner findings into ordered upgrade candidates.

pub mod aggregator;
pub mod version;

pub use aggregator::{aggregate, AggregationPolicy, Candidate};
