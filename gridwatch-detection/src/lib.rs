//! # GridWatch Detection
//!
//! The analyzer stage of the pipeline: parses every captured frame and runs
//! two detectors over it. The Modbus-write detector is stateless; the
//! port-scan detector keeps a bounded per-source table of distinct probed
//! ports behind a single mutex.

pub mod analyzer;
pub mod scan;

pub use analyzer::PacketAnalyzer;
pub use scan::{ScanPolicy, ScanTable};
