//! Catalog module: the relational store behind the indexing pipeline.
//!
//! Raw article metadata lands in `parts` and `segments` (written by an
//! external ingester), the grouper folds parts into `binaries`, and the
//! promoter turns complete binaries into `releases` while deleting the raw
//! rows they consumed.
//!
//! # Overview
//!
//! - [`Catalog`] - `SQLite`-backed implementation of every store operation
//! - [`CatalogRepository`] - the data-access seam the pipeline depends on
//! - [`CatalogError`] - persistence failures with typed classification
//!
//! # Example
//!
//! ```ignore
//! use indexer_core::catalog::{Catalog, NewPart};
//! use indexer_core::Database;
//!
//! let catalog = Catalog::new(Database::new_in_memory().await?);
//! catalog.create_group("alt.binaries.test", true).await?;
//! let part_id = catalog.create_part(&NewPart {
//!     subject: r#"[01/10] - "file.rar" yEnc"#,
//!     group_name: "alt.binaries.test",
//!     poster: "poster@example.com",
//!     posted: 1_700_000_000,
//!     total_segments: 3,
//! }).await?;
//! ```

mod error;
mod model;
mod repository;

pub use error::{CatalogError, DbErrorKind};
pub use model::{
    Binary, BinaryUpsert, BinaryWithParts, Group, NewPart, NewRelease, NewSegment, Part,
    PartSummary, PartWithSegments, ReadyBinary, Release, Segment,
};
pub use repository::CatalogRepository;
#[cfg(test)]
pub(crate) use repository::testing;

use std::collections::HashMap;

use sqlx::{Row, SqliteConnection};
use tracing::{debug, instrument};

use crate::db::Database;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Raw rows removed when a binary is consumed or discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumedRows {
    pub parts: u64,
    pub segments: u64,
}

/// `SQLite` catalog store.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    /// Creates a catalog over the given database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ==================== Groups ====================

    /// Registers a newsgroup, or updates its active flag if it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the upsert fails.
    #[instrument(skip(self))]
    pub async fn create_group(&self, name: &str, active: bool) -> Result<i64> {
        let row = sqlx::query(
            r"INSERT INTO newsgroups (name, active) VALUES (?, ?)
              ON CONFLICT(name) DO UPDATE SET active = excluded.active
              RETURNING id",
        )
        .bind(name)
        .bind(active)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get("id"))
    }

    /// Looks up a newsgroup by its exact name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(r"SELECT * FROM newsgroups WHERE name = ?")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(group)
    }

    /// Returns all groups marked active, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn active_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r"SELECT * FROM newsgroups WHERE active = 1 ORDER BY name ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(groups)
    }

    // ==================== Raw parts and segments ====================

    /// Inserts an ungrouped part.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the insert fails.
    #[instrument(skip(self, part), fields(subject = %part.subject))]
    pub async fn create_part(&self, part: &NewPart<'_>) -> Result<i64> {
        let row = sqlx::query(
            r"INSERT INTO parts (subject, group_name, poster, posted, total_segments)
              VALUES (?, ?, ?, ?, ?)
              RETURNING id",
        )
        .bind(part.subject)
        .bind(part.group_name)
        .bind(part.poster)
        .bind(part.posted)
        .bind(part.total_segments)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get("id"))
    }

    /// Records one retrieved segment of a part.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the insert fails, including the
    /// constraint violation raised for a duplicate segment number.
    #[instrument(skip(self, segment), fields(part_id = segment.part_id, number = segment.number))]
    pub async fn add_segment(&self, segment: &NewSegment<'_>) -> Result<i64> {
        let row = sqlx::query(
            r"INSERT INTO segments (part_id, number, size, message_id)
              VALUES (?, ?, ?, ?)
              RETURNING id",
        )
        .bind(segment.part_id)
        .bind(segment.number)
        .bind(segment.size)
        .bind(segment.message_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get("id"))
    }

    /// Gets a part by ID.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get_part(&self, id: i64) -> Result<Option<Part>> {
        let part = sqlx::query_as::<_, Part>(r"SELECT * FROM parts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(part)
    }

    /// Returns every part not yet attached to a binary, in ingestion order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn ungrouped_parts(&self) -> Result<Vec<Part>> {
        let parts = sqlx::query_as::<_, Part>(
            r"SELECT * FROM parts WHERE binary_id IS NULL ORDER BY id ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(parts)
    }

    /// Lists every part with its announced and retrieved segment counts.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn part_summaries(&self) -> Result<Vec<PartSummary>> {
        let summaries = sqlx::query_as::<_, PartSummary>(
            r"SELECT parts.id, parts.subject, parts.total_segments,
                     COUNT(segments.id) AS available_segments
              FROM parts
              LEFT JOIN segments ON segments.part_id = parts.id
              GROUP BY parts.id
              ORDER BY parts.id ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(summaries)
    }

    // ==================== Binaries ====================

    /// Upserts a binary by hash and attaches `part_id` to it.
    ///
    /// Both writes share one short transaction so a crash never leaves a
    /// part pointing at a binary row that was not written. The first-seen
    /// `posted` value is preserved when the binary already exists.
    ///
    /// # Returns
    ///
    /// The binary's row id, stable across repeated saves.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if either write fails.
    #[instrument(skip(self, binary), fields(hash = %binary.hash, name = %binary.name))]
    pub async fn save_binary(&self, binary: &BinaryUpsert<'_>, part_id: i64) -> Result<i64> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            r"INSERT INTO binaries (hash, name, poster, group_name, posted, total_parts)
              VALUES (?, ?, ?, ?, ?, ?)
              ON CONFLICT(hash) DO UPDATE SET total_parts = excluded.total_parts
              RETURNING id",
        )
        .bind(binary.hash)
        .bind(binary.name)
        .bind(binary.poster)
        .bind(binary.group_name)
        .bind(binary.posted)
        .bind(binary.total_parts)
        .fetch_one(&mut *tx)
        .await?;
        let binary_id: i64 = row.get("id");

        sqlx::query(r"UPDATE parts SET binary_id = ? WHERE id = ?")
            .bind(binary_id)
            .bind(part_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(binary_id)
    }

    /// Gets a binary by hash.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn find_binary_by_hash(&self, hash: &str) -> Result<Option<Binary>> {
        let binary = sqlx::query_as::<_, Binary>(r"SELECT * FROM binaries WHERE hash = ?")
            .bind(hash)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(binary)
    }

    /// Lists all binaries ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn list_binaries(&self) -> Result<Vec<Binary>> {
        let binaries = sqlx::query_as::<_, Binary>(r"SELECT * FROM binaries ORDER BY id ASC")
            .fetch_all(self.db.pool())
            .await?;

        Ok(binaries)
    }

    /// Returns binaries whose parts and segments reach `threshold` percent,
    /// newest first.
    ///
    /// Parts are joined to their segments and counted per part; the per-part
    /// counts are then aggregated per binary. A binary qualifies when it has
    /// at least `total_parts` parts with segments and
    /// `sum(available) * 100 / sum(announced) >= threshold`. Always reads
    /// live state.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn find_ready_binaries(&self, threshold: f64) -> Result<Vec<ReadyBinary>> {
        let ready = sqlx::query_as::<_, ReadyBinary>(
            r"SELECT b.id, b.name, b.poster, b.group_name, b.posted, b.total_parts,
                     COUNT(*) AS part_count,
                     CAST(SUM(p.available_segments) AS REAL) * 100.0
                         / SUM(p.total_segments) AS completion
              FROM binaries AS b
              INNER JOIN (
                  SELECT parts.id, parts.binary_id, parts.total_segments,
                         COUNT(*) AS available_segments
                  FROM parts
                  INNER JOIN segments ON segments.part_id = parts.id
                  GROUP BY parts.id
              ) AS p ON p.binary_id = b.id
              GROUP BY b.id
              HAVING COUNT(*) >= b.total_parts
                 AND CAST(SUM(p.available_segments) AS REAL) * 100.0
                         / SUM(p.total_segments) >= ?
              ORDER BY b.posted DESC, b.id DESC",
        )
        .bind(threshold)
        .fetch_all(self.db.pool())
        .await?;

        Ok(ready)
    }

    /// Loads a binary with all parts (ingestion order) and their segments
    /// (segment-number order).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if any query fails.
    #[instrument(skip(self))]
    pub async fn load_binary(&self, id: i64) -> Result<Option<BinaryWithParts>> {
        let Some(binary) = sqlx::query_as::<_, Binary>(r"SELECT * FROM binaries WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
        else {
            return Ok(None);
        };

        let parts = sqlx::query_as::<_, Part>(
            r"SELECT * FROM parts WHERE binary_id = ? ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        let segments = sqlx::query_as::<_, Segment>(
            r"SELECT segments.* FROM segments
              INNER JOIN parts ON parts.id = segments.part_id
              WHERE parts.binary_id = ?
              ORDER BY segments.part_id ASC, segments.number ASC",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        let mut by_part: HashMap<i64, Vec<Segment>> = HashMap::new();
        for segment in segments {
            by_part.entry(segment.part_id).or_default().push(segment);
        }

        let parts = parts
            .into_iter()
            .map(|part| {
                let segments = by_part.remove(&part.id).unwrap_or_default();
                PartWithSegments { part, segments }
            })
            .collect();

        Ok(Some(BinaryWithParts { binary, parts }))
    }

    /// Deletes a binary and the raw rows attached to it, atomically.
    ///
    /// Used for binaries that lost to an existing release with the same
    /// name and posted time.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BinaryNotFound`] if the binary row is gone,
    /// or [`CatalogError::Database`] if a delete fails. Nothing is removed
    /// on error.
    #[instrument(skip(self))]
    pub async fn discard_binary(&self, binary_id: i64) -> Result<ConsumedRows> {
        let mut tx = self.db.pool().begin().await?;
        let consumed = delete_binary_rows(&mut tx, binary_id).await?;
        tx.commit().await?;
        Ok(consumed)
    }

    // ==================== Releases ====================

    /// Looks up a release by its unique (name, posted) key.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn find_release(&self, name: &str, posted: i64) -> Result<Option<Release>> {
        let release = sqlx::query_as::<_, Release>(
            r"SELECT * FROM releases WHERE name = ? AND posted = ?",
        )
        .bind(name)
        .bind(posted)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(release)
    }

    /// Inserts a release and deletes the binary it was built from, with the
    /// binary's parts and segments, in one transaction.
    ///
    /// # Returns
    ///
    /// The new release id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BinaryNotFound`] if the binary row is gone,
    /// or [`CatalogError::Database`] if any statement fails. The transaction
    /// is rolled back on error, leaving the binary eligible for retry.
    #[instrument(skip(self, release), fields(name = %release.name, posted = release.posted))]
    pub async fn create_release_consuming(
        &self,
        release: &NewRelease,
        binary_id: i64,
    ) -> Result<i64> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            r"INSERT INTO releases (
                name,
                original_name,
                search_name,
                posted,
                poster,
                group_id,
                size,
                nzb
              )
              VALUES (?, ?, ?, ?, ?, ?, ?, ?)
              RETURNING id",
        )
        .bind(&release.name)
        .bind(&release.original_name)
        .bind(&release.search_name)
        .bind(release.posted)
        .bind(&release.poster)
        .bind(release.group_id)
        .bind(release.size)
        .bind(&release.nzb)
        .fetch_one(&mut *tx)
        .await?;
        let release_id: i64 = row.get("id");

        let consumed = delete_binary_rows(&mut tx, binary_id).await?;
        tx.commit().await?;

        debug!(
            release_id,
            parts = consumed.parts,
            segments = consumed.segments,
            "Release inserted and raw rows consumed"
        );
        Ok(release_id)
    }

    /// Lists all releases, newest posted first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn list_releases(&self) -> Result<Vec<Release>> {
        let releases = sqlx::query_as::<_, Release>(
            r"SELECT * FROM releases ORDER BY posted DESC, id DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(releases)
    }

    // ==================== Counts ====================

    /// Counts rows in `parts`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn count_parts(&self) -> Result<i64> {
        self.count(r"SELECT COUNT(*) AS count FROM parts").await
    }

    /// Counts rows in `segments`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn count_segments(&self) -> Result<i64> {
        self.count(r"SELECT COUNT(*) AS count FROM segments").await
    }

    /// Counts rows in `binaries`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn count_binaries(&self) -> Result<i64> {
        self.count(r"SELECT COUNT(*) AS count FROM binaries").await
    }

    /// Counts rows in `releases`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn count_releases(&self) -> Result<i64> {
        self.count(r"SELECT COUNT(*) AS count FROM releases").await
    }

    async fn count(&self, sql: &'static str) -> Result<i64> {
        let row = sqlx::query(sql).fetch_one(self.db.pool()).await?;
        Ok(row.get("count"))
    }
}

/// Segments first, then parts, then the binary: foreign keys are enforced.
async fn delete_binary_rows(conn: &mut SqliteConnection, binary_id: i64) -> Result<ConsumedRows> {
    let segments = sqlx::query(
        r"DELETE FROM segments
          WHERE part_id IN (SELECT id FROM parts WHERE binary_id = ?)",
    )
    .bind(binary_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let parts = sqlx::query(r"DELETE FROM parts WHERE binary_id = ?")
        .bind(binary_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let binaries = sqlx::query(r"DELETE FROM binaries WHERE id = ?")
        .bind(binary_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if binaries == 0 {
        return Err(CatalogError::BinaryNotFound(binary_id));
    }

    Ok(ConsumedRows { parts, segments })
}
