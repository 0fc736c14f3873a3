//! brickprice library
//!
//! Caching and price aggregation for set catalog data. The binary in
//! `main.rs` is a thin wrapper; everything here is usable from integration
//! tests.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod data;
pub mod error;
pub mod ids;
pub mod money;
pub mod pricing;
pub mod report;
