//! colorpuzzle-export: Pure report serializers (sans-IO)
//!
//! Converts an analysis into a per-attempt report. Currently supports
//! JSON and a plain-text summary.

pub mod report;

pub use report::{ExportError, ReportData, ReportMetadata};
