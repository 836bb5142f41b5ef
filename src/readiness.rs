//! Completeness evaluation: which binaries are ready to become releases.

use std::fmt;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::catalog::{CatalogError, CatalogRepository, ReadyBinary};

/// Percentage of announced segments that must be present by default.
pub const DEFAULT_COMPLETION_THRESHOLD: u8 = 100;

/// Threshold outside `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("completion threshold must be within 1..=100, got {0}")]
pub struct InvalidThreshold(pub u32);

/// Minimum segment availability, in percent, for a binary to be promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionThreshold(u8);

impl CompletionThreshold {
    /// Creates a threshold.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidThreshold`] for values outside `1..=100`.
    pub fn new(percent: u32) -> Result<Self, InvalidThreshold> {
        match u8::try_from(percent) {
            Ok(value) if (1..=100).contains(&value) => Ok(Self(value)),
            _ => Err(InvalidThreshold(percent)),
        }
    }

    #[must_use]
    pub fn percent(self) -> u8 {
        self.0
    }
}

impl Default for CompletionThreshold {
    fn default() -> Self {
        Self(DEFAULT_COMPLETION_THRESHOLD)
    }
}

impl fmt::Display for CompletionThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Returns the binaries that have all their parts and meet `threshold`,
/// newest posted first.
///
/// Read-only and uncached: each call sees the store as it is, so parts or
/// segments ingested concurrently simply show up on a later call.
///
/// # Errors
///
/// Returns [`CatalogError`] if the aggregate query fails.
#[instrument(skip(repo), fields(threshold = %threshold))]
pub async fn find_ready_binaries<R>(
    repo: &R,
    threshold: CompletionThreshold,
) -> Result<Vec<ReadyBinary>, CatalogError>
where
    R: CatalogRepository + ?Sized,
{
    let ready = repo
        .find_ready_binaries(f64::from(threshold.percent()))
        .await?;
    debug!(ready = ready.len(), "Evaluated binary completeness");
    Ok(ready)
}
