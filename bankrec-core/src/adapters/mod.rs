//! Adapters - concrete implementations of external dependencies
//!
//! - `ofx`: statement text parser
//! - `duckdb`: the ledger repository

pub mod duckdb;
pub mod ofx;
