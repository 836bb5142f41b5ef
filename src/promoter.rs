//! Release promotion: turns complete binaries into releases.
//!
//! Each ready binary is handled independently and in order:
//! 1. If a release with the same (name, posted) already exists the binary is
//!    a duplicate; it and its raw rows are deleted.
//! 2. Otherwise the binary is reloaded with parts and segments, its group is
//!    resolved, and a manifest is built.
//! 3. The release is inserted and the binary, parts and segments are deleted
//!    in one transaction.
//!
//! Store errors abort the pass. Problems confined to one candidate are logged
//! and counted: a manifest failure, or a rolled-back write that
//! [`CatalogError::is_candidate_scoped`] (binary gone, release key taken by
//! another writer, database locked past the busy timeout).

use tracing::{info, instrument, warn};

use crate::catalog::{CatalogError, CatalogRepository, NewRelease, ReadyBinary};
use crate::manifest::ManifestBuilder;
use crate::naming::clean_release_name;
use crate::readiness::{CompletionThreshold, find_ready_binaries};

/// Counters for one promotion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromotionStats {
    /// Binaries returned by the completeness query.
    pub candidates: usize,
    /// Releases created.
    pub promoted: usize,
    /// Binaries discarded because their release already existed.
    pub duplicates: usize,
    /// Candidates skipped after a candidate-level failure; retried next pass.
    pub failed: usize,
}

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Promoted(i64),
    Duplicate,
    Failed,
}

/// Promotes ready binaries using a [`ManifestBuilder`].
#[derive(Debug, Clone)]
pub struct ReleasePromoter<M> {
    manifest: M,
    threshold: CompletionThreshold,
}

impl<M: ManifestBuilder> ReleasePromoter<M> {
    #[must_use]
    pub fn new(manifest: M, threshold: CompletionThreshold) -> Self {
        Self {
            manifest,
            threshold,
        }
    }

    /// Runs one promotion pass.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`]; candidates handled before it keep
    /// their outcome, the failing candidate's transaction is rolled back.
    #[instrument(skip(self, repo), fields(threshold = %self.threshold))]
    pub async fn run<R>(&self, repo: &R) -> Result<PromotionStats, CatalogError>
    where
        R: CatalogRepository + ?Sized,
    {
        let candidates = find_ready_binaries(repo, self.threshold).await?;
        let mut stats = PromotionStats {
            candidates: candidates.len(),
            ..PromotionStats::default()
        };

        for candidate in &candidates {
            match self.promote(repo, candidate).await? {
                Outcome::Promoted(_) => stats.promoted += 1,
                Outcome::Duplicate => stats.duplicates += 1,
                Outcome::Failed => stats.failed += 1,
            }
        }

        info!(
            candidates = stats.candidates,
            promoted = stats.promoted,
            duplicates = stats.duplicates,
            failed = stats.failed,
            "Promotion pass complete"
        );
        Ok(stats)
    }

    async fn promote<R>(&self, repo: &R, candidate: &ReadyBinary) -> Result<Outcome, CatalogError>
    where
        R: CatalogRepository + ?Sized,
    {
        if let Some(existing) = repo.find_release(&candidate.name, candidate.posted).await? {
            info!(
                binary_id = candidate.id,
                release_id = existing.id,
                name = %candidate.name,
                "Duplicate binary found, deleting"
            );
            return match repo.discard_binary(candidate.id).await {
                Ok(_) => Ok(Outcome::Duplicate),
                Err(e) if e.is_candidate_scoped() => {
                    warn!(binary_id = candidate.id, error = %e, "Duplicate binary not deleted, will retry");
                    Ok(Outcome::Failed)
                }
                Err(e) => Err(e),
            };
        }

        let Some(binary) = repo.load_binary(candidate.id).await? else {
            warn!(binary_id = candidate.id, "Ready binary vanished before promotion");
            return Ok(Outcome::Failed);
        };

        let group_id = match repo.find_group_by_name(&binary.binary.group_name).await? {
            Some(group) => Some(group.id),
            None => {
                warn!(
                    binary_id = candidate.id,
                    group = %binary.binary.group_name,
                    "Unknown group, release will have no group reference"
                );
                None
            }
        };

        let nzb = match self.manifest.build(&binary) {
            Ok(nzb) => nzb,
            Err(e) => {
                warn!(binary_id = candidate.id, error = %e, "Manifest build failed");
                return Ok(Outcome::Failed);
            }
        };

        let release = NewRelease {
            name: binary.binary.name.clone(),
            original_name: binary.binary.name.clone(),
            search_name: clean_release_name(&binary.binary.name),
            posted: binary.binary.posted,
            poster: binary.binary.poster.clone(),
            group_id,
            size: binary.size(),
            nzb,
        };

        match repo.create_release_consuming(&release, candidate.id).await {
            Ok(release_id) => {
                info!(
                    release_id,
                    name = %release.name,
                    size = release.size,
                    parts = binary.parts.len(),
                    "Release created"
                );
                Ok(Outcome::Promoted(release_id))
            }
            Err(e) if e.is_candidate_scoped() => {
                warn!(binary_id = candidate.id, error = %e, "Promotion rolled back, will retry");
                Ok(Outcome::Failed)
            }
            Err(e) => Err(e),
        }
    }
}
