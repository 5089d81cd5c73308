pub mod batch;

pub use batch::{BatchRunner, BatchSummary, FailedScan, ScanOutcome};
