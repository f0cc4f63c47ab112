//! SQLite snapshot storage.
//!
//! Persists upload summaries to a local SQLite database with two tables:
//! - summaries: id, created_at, total_count, three averages
//! - type_distribution: summary_id, equipment_type, count
//!
//! The store is the only owner of both tables: snapshots are written once
//! (summary + breakdowns + retention prune in a single transaction), read
//! back by the query endpoints, and deleted only by pruning.

pub mod snapshot;

pub use snapshot::{Snapshot, Store, TypeCount, RETENTION_LIMIT};
