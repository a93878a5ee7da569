//! End-of-run reporting.

pub mod generator;

pub use generator::{generate_text_summary, write_json_report};
