//! Equipment parameter summary service.
//!
//! Ingests CSV files describing chemical-process equipment, persists rolling
//! summary snapshots in SQLite (bounded to the 5 most recent), and exposes
//! them over HTTP as JSON and as a rendered PDF report.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod report;
pub mod store;
