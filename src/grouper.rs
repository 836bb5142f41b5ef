//! Binary grouping: folds ungrouped parts into binaries.
//!
//! Every part whose binary reference is unset is parsed; parts that share
//! (name, group, poster, total-parts) belong to the same binary and are keyed
//! by [`binary_hash`]. The binary is saved after each part, so an
//! interrupted run leaves the rest of the parts ungrouped and they are
//! rediscovered on the next run.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::catalog::{BinaryUpsert, CatalogError, CatalogRepository, Part};
use crate::naming::binary_hash;
use crate::subject::SubjectParser;

/// Counters for one grouping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Ungrouped parts examined.
    pub parts_seen: usize,
    /// Parts attached to a binary.
    pub grouped: usize,
    /// Parts whose subject did not parse; left ungrouped.
    pub skipped: usize,
    /// Distinct binaries touched.
    pub binaries: usize,
}

/// In-progress binary for the current run.
#[derive(Debug)]
struct BinaryDraft {
    id: i64,
    name: String,
    poster: String,
    group_name: String,
    posted: i64,
    total_parts: i64,
    parts: Vec<i64>,
}

impl BinaryDraft {
    fn upsert<'a>(&'a self, hash: &'a str) -> BinaryUpsert<'a> {
        BinaryUpsert {
            hash,
            name: &self.name,
            poster: &self.poster,
            group_name: &self.group_name,
            posted: self.posted,
            total_parts: self.total_parts,
        }
    }
}

/// Groups parts into binaries using a [`SubjectParser`].
#[derive(Debug, Clone, Default)]
pub struct BinaryGrouper {
    parser: SubjectParser,
}

impl BinaryGrouper {
    #[must_use]
    pub fn new(parser: SubjectParser) -> Self {
        Self { parser }
    }

    /// Runs one grouping pass over every ungrouped part.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`]; parts processed before it stay
    /// grouped. Subject parse failures are logged and skipped.
    #[instrument(skip(self, repo))]
    pub async fn run<R>(&self, repo: &R) -> Result<GroupingStats, CatalogError>
    where
        R: CatalogRepository + ?Sized,
    {
        let parts = repo.ungrouped_parts().await?;
        let mut drafts: HashMap<String, BinaryDraft> = HashMap::new();
        let mut stats = GroupingStats {
            parts_seen: parts.len(),
            ..GroupingStats::default()
        };

        for part in parts {
            if self.group_part(repo, &mut drafts, &part).await? {
                stats.grouped += 1;
            } else {
                stats.skipped += 1;
            }
        }

        stats.binaries = drafts.len();
        info!(
            parts = stats.parts_seen,
            grouped = stats.grouped,
            skipped = stats.skipped,
            binaries = stats.binaries,
            "Grouping pass complete"
        );
        Ok(stats)
    }

    /// Returns `false` when the subject did not parse.
    async fn group_part<R>(
        &self,
        repo: &R,
        drafts: &mut HashMap<String, BinaryDraft>,
        part: &Part,
    ) -> Result<bool, CatalogError>
    where
        R: CatalogRepository + ?Sized,
    {
        let parsed = match self.parser.parse(&part.subject) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(part_id = part.id, error = %e, "Skipping unparseable part");
                return Ok(false);
            }
        };

        let hash = binary_hash(&parsed.name, &part.group_name, &part.poster, &parsed.total_raw);
        let draft = drafts.entry(hash.clone()).or_insert_with(|| BinaryDraft {
            id: 0,
            name: parsed.name.clone(),
            poster: part.poster.clone(),
            group_name: part.group_name.clone(),
            posted: part.posted,
            total_parts: i64::from(parsed.total_parts),
            parts: Vec::new(),
        });
        draft.parts.push(part.id);

        let binary_id = repo.save_binary(&draft.upsert(&hash), part.id).await?;
        draft.id = binary_id;
        debug!(
            binary_id = draft.id,
            hash = %hash,
            parts = draft.parts.len(),
            total_parts = draft.total_parts,
            "Part grouped"
        );
        Ok(true)
    }
}
