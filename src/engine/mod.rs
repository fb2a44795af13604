//! Core engine: ingestion and periodic reconciliation.
//!
//! Both paths mutate the same account and serialize on its row lock.

pub mod ingest;
pub mod sweeper;

pub use ingest::IngestionService;
pub use sweeper::{SweepReport, Sweeper};
