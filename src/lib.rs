//! # songlake
//!
//! A one-shot batch ETL job: song metadata and user listening logs, stored as
//! newline-delimited JSON in object storage, are reshaped into a small star
//! schema and written back as partitioned Parquet datasets.
//!
//! ## Pipeline
//!
//! ```text
//! song_data/*.json ──► songs ──┐            ┌──► songs.parquet/
//!                              │            ├──► artists.parquet/
//!                              ▼            ├──► users.parquet/
//! log_data/*.json ───► play events ─ join ──┼──► time.parquet/
//!                                            └──► songplays.parquet/
//! ```
//!
//! Stage 1 ([`pipeline::process_song_data`]) extracts the song catalog; stage
//! 2 ([`pipeline::process_log_data`]) transforms the activity logs and joins
//! them against the catalog. Each table is rebuilt from scratch on every run.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// Error types for the job
pub mod error;

/// Credentials and job configuration
pub mod config;

/// Object-storage access
pub mod storage;

/// Declared input record schemas
pub mod records;

/// Star-schema output tables
pub mod tables;

/// Partitioned Parquet output
pub mod output;

/// The two pipeline stages and the run orchestrator
pub mod pipeline;

pub use config::{Credentials, JobConfig};
pub use error::{Error, Result};
pub use pipeline::run;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
