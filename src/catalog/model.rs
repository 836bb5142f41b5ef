//! Row types for the catalog tables.
//!
//! `posted` timestamps are Unix seconds throughout.

use serde::Serialize;
use sqlx::FromRow;

/// A newsgroup the indexer knows about. Static reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

/// One posted file/chunk-group as ingested from article headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Part {
    pub id: i64,
    /// Free-text subject line the grouping heuristics run over.
    pub subject: String,
    pub group_name: String,
    /// The "From" header.
    pub poster: String,
    pub posted: i64,
    /// Segments the poster announced for this part.
    pub total_segments: i64,
    /// Set once the grouper has attached this part to a binary.
    pub binary_id: Option<i64>,
}

/// One retrieved chunk of a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Segment {
    pub id: i64,
    pub part_id: i64,
    /// 1-based position inside the part.
    pub number: i64,
    /// Size in bytes.
    pub size: i64,
    pub message_id: String,
}

/// A multi-part file inferred from subject heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Binary {
    pub id: i64,
    pub hash: String,
    pub name: String,
    pub poster: String,
    pub group_name: String,
    pub posted: i64,
    pub total_parts: i64,
}

/// A binary whose parts and segment availability passed the readiness query.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ReadyBinary {
    pub id: i64,
    pub name: String,
    pub poster: String,
    pub group_name: String,
    pub posted: i64,
    pub total_parts: i64,
    /// Parts that have at least one segment.
    pub part_count: i64,
    /// `available / announced` segments across all parts, as a percentage.
    pub completion: f64,
}

/// A part together with its retrieved segments, ordered by segment number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartWithSegments {
    pub part: Part,
    pub segments: Vec<Segment>,
}

/// A binary with every part and segment loaded, as needed for promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryWithParts {
    pub binary: Binary,
    pub parts: Vec<PartWithSegments>,
}

impl BinaryWithParts {
    /// Total retrieved bytes across every segment.
    #[must_use]
    pub fn size(&self) -> i64 {
        self.parts
            .iter()
            .flat_map(|p| p.segments.iter())
            .map(|s| s.size)
            .sum()
    }

    /// Ids of every part attached to this binary.
    #[must_use]
    pub fn part_ids(&self) -> Vec<i64> {
        self.parts.iter().map(|p| p.part.id).collect()
    }
}

/// A published, immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Release {
    pub id: i64,
    pub name: String,
    pub original_name: String,
    pub search_name: String,
    pub posted: i64,
    pub poster: String,
    /// Absent when the binary's group was not registered in `newsgroups`.
    pub group_id: Option<i64>,
    pub size: i64,
    /// Serialized NZB manifest.
    #[serde(skip)]
    pub nzb: String,
    pub created_at: String,
}

/// Per-part availability line used by the `list-parts` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PartSummary {
    pub id: i64,
    pub subject: String,
    pub total_segments: i64,
    pub available_segments: i64,
}

/// Input for ingesting a part.
#[derive(Debug, Clone, Copy)]
pub struct NewPart<'a> {
    pub subject: &'a str,
    pub group_name: &'a str,
    pub poster: &'a str,
    pub posted: i64,
    pub total_segments: i64,
}

/// Input for ingesting a segment.
#[derive(Debug, Clone, Copy)]
pub struct NewSegment<'a> {
    pub part_id: i64,
    pub number: i64,
    pub size: i64,
    pub message_id: &'a str,
}

/// Binary state written by the grouper after each part.
#[derive(Debug, Clone, Copy)]
pub struct BinaryUpsert<'a> {
    pub hash: &'a str,
    pub name: &'a str,
    pub poster: &'a str,
    pub group_name: &'a str,
    pub posted: i64,
    pub total_parts: i64,
}

/// A release ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub name: String,
    pub original_name: String,
    pub search_name: String,
    pub posted: i64,
    pub poster: String,
    pub group_id: Option<i64>,
    pub size: i64,
    pub nzb: String,
}
