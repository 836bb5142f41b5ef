//! Batch entry points for the indexing pipeline.
//!
//! [`Indexer`] owns the store handle and exposes the two passes callers
//! trigger: [`Indexer::group_binaries`] and
//! [`Indexer::promote_ready_binaries`]. Passes are mutually exclusive: both
//! take the same writer guard, and a pass started while another holds it
//! fails fast with [`IndexerError::AlreadyRunning`]. Separate processes
//! sharing one database file must still be serialized by the caller.

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::instrument;

use crate::catalog::{CatalogError, CatalogRepository};
use crate::grouper::{BinaryGrouper, GroupingStats};
use crate::manifest::{ManifestBuilder, NzbManifestBuilder};
use crate::promoter::{PromotionStats, ReleasePromoter};
use crate::readiness::CompletionThreshold;
use crate::subject::SubjectParser;

/// Errors surfaced by a pipeline pass.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// A store read or write failed; the pass was aborted.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Another pass holds the writer guard.
    #[error(
        "another grouping or promotion pass is already running\n  Suggestion: Wait for it to finish and retry"
    )]
    AlreadyRunning,
}

/// Single-writer facade over the grouper and promoter.
#[derive(Debug)]
pub struct Indexer<R, M = NzbManifestBuilder> {
    repo: R,
    grouper: BinaryGrouper,
    promoter: ReleasePromoter<M>,
    writer: Mutex<()>,
}

impl<R: CatalogRepository> Indexer<R, NzbManifestBuilder> {
    /// Creates an indexer writing NZB manifests.
    #[must_use]
    pub fn with_nzb(repo: R, threshold: CompletionThreshold) -> Self {
        Self::new(repo, NzbManifestBuilder, threshold)
    }
}

impl<R: CatalogRepository, M: ManifestBuilder> Indexer<R, M> {
    #[must_use]
    pub fn new(repo: R, manifest: M, threshold: CompletionThreshold) -> Self {
        Self {
            repo,
            grouper: BinaryGrouper::default(),
            promoter: ReleasePromoter::new(manifest, threshold),
            writer: Mutex::new(()),
        }
    }

    /// Replaces the subject parser used for grouping.
    #[must_use]
    pub fn with_subject_parser(mut self, parser: SubjectParser) -> Self {
        self.grouper = BinaryGrouper::new(parser);
        self
    }

    /// The store this indexer writes to.
    #[must_use]
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Groups every ungrouped part into binaries.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::AlreadyRunning`] if another pass is active,
    /// or [`IndexerError::Catalog`] if the store fails.
    #[instrument(skip(self))]
    pub async fn group_binaries(&self) -> Result<GroupingStats, IndexerError> {
        let _guard = self.acquire()?;
        Ok(self.grouper.run(&self.repo).await?)
    }

    /// Promotes every ready binary into a release.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::AlreadyRunning`] if another pass is active,
    /// or [`IndexerError::Catalog`] if the store fails.
    #[instrument(skip(self))]
    pub async fn promote_ready_binaries(&self) -> Result<PromotionStats, IndexerError> {
        let _guard = self.acquire()?;
        Ok(self.promoter.run(&self.repo).await?)
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, IndexerError> {
        self.writer
            .try_lock()
            .map_err(|_| IndexerError::AlreadyRunning)
    }
}
