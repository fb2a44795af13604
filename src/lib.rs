//! WAGER LEDGER: idempotent bet outcome ingestion and balance settlement.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod storage;
pub mod engine;
pub mod api;
