//! Error types for subject line parsing.

use thiserror::Error;

/// A subject line that yields no usable name and part count.
///
/// Never fatal: the part is skipped for this run and stays ungrouped, so it
/// is picked up again on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    /// Neither pattern produced both a name and a part count.
    #[error("no name and part count found in subject '{subject}'")]
    NoNameOrParts {
        /// The subject that failed to parse
        subject: String,
    },

    /// A part count was captured but could not be normalized to `N/M`.
    #[error("part count '{parts}' has no separator in subject '{subject}'")]
    MissingSeparator {
        /// The subject that failed to parse
        subject: String,
        /// The part count after normalization
        parts: String,
    },

    /// The part count is not a pair of integers.
    #[error("part count '{parts}' is not numeric in subject '{subject}'")]
    InvalidPartCount {
        /// The subject that failed to parse
        subject: String,
        /// The part count after normalization
        parts: String,
    },
}

impl SubjectError {
    /// Returns the subject the error refers to.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::NoNameOrParts { subject }
            | Self::MissingSeparator { subject, .. }
            | Self::InvalidPartCount { subject, .. } => subject,
        }
    }
}
