//! Usenet Indexer Core Library
//!
//! This library reconstructs multi-part binaries from raw article metadata
//! (parts and their segments) and publishes complete ones as releases with
//! an NZB download manifest.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`catalog`] - Store for groups, parts, segments, binaries and releases
//! - [`subject`] - Subject line parsing (name and part counter)
//! - [`naming`] - Binary hashing and release name cleaning
//! - [`grouper`] - Folds ungrouped parts into binaries
//! - [`readiness`] - Decides which binaries are complete
//! - [`manifest`] - NZB manifest generation
//! - [`promoter`] - Turns complete binaries into releases
//! - [`indexer`] - Single-writer entry points for the two batch passes

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod db;
pub mod grouper;
pub mod indexer;
pub mod manifest;
pub mod naming;
pub mod promoter;
pub mod readiness;
pub mod subject;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, CatalogRepository};
pub use db::{Database, DatabaseOptions, DbError};
pub use grouper::{BinaryGrouper, GroupingStats};
pub use indexer::{Indexer, IndexerError};
pub use manifest::{ManifestBuilder, ManifestError, NzbManifestBuilder};
pub use promoter::{PromotionStats, ReleasePromoter};
pub use readiness::{CompletionThreshold, DEFAULT_COMPLETION_THRESHOLD, InvalidThreshold};
pub use subject::{ParsedSubject, SubjectError, SubjectParser, parse_subject};
