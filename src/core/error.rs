//! Error types for asm-remap
//!
//! Defines all error types used throughout the library.

use std::time::Duration;
use thiserror::Error;

/// Main error type for asm-remap operations
#[derive(Debug, Error)]
pub enum RemapError {
    /// Index construction failed
    #[error("Index build failed: {0}")]
    Build(#[from] BuildError),

    /// Coordinate mapping errors
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Segment source errors outside of an index build
    #[error("Segment source error: {0}")]
    Source(#[from] SourceError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a segment source
#[derive(Debug, Error)]
pub enum SourceError {
    /// Request rate exceeded; the request may be repeated after a wait
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Non-success HTTP status other than rate limiting
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
    },

    /// Connection or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Chromosome unknown to the source
    #[error("Unknown chromosome: {0}")]
    UnknownChromosome(String),

    /// Source cannot serve the request (e.g. a snapshot of another triple)
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// I/O error while reading a local source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether the failure is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}

/// Errors that abort the construction of an assembly index
#[derive(Debug, Error)]
pub enum BuildError {
    /// Fatal error reported by the segment source
    #[error("{operation} failed: {source}")]
    Source {
        operation: String,
        #[source]
        source: SourceError,
    },

    /// Rate limiting persisted past the retry budget
    #[error("{operation}: max attempts exceeded ({attempts})")]
    RetriesExhausted { operation: String, attempts: u32 },

    /// Source declared no chromosomes for the species
    #[error("No chromosomes available for species {species}")]
    NoChromosomes { species: String },

    /// Segment with inconsistent coordinates
    #[error("Invalid segment on chromosome {chrom}: {message}")]
    InvalidSegment { chrom: String, message: String },

    /// Two half-open source intervals overlap
    #[error("Overlapping intervals on chromosome {chrom}: {first:?} and {second:?}")]
    OverlappingIntervals {
        chrom: String,
        first: (u64, u64),
        second: (u64, u64),
    },
}

/// Errors that can occur during coordinate mapping
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// Chromosome not declared by the source assembly
    #[error("Chromosome not found in index: {0}")]
    UnknownChromosome(String),
}

/// Result type alias for asm-remap operations
pub type Result<T> = std::result::Result<T, RemapError>;

/// Result type alias for segment source operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for index builds
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Result type alias for mapping operations
pub type MappingResult<T> = std::result::Result<T, MappingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_transient() {
        assert!(SourceError::RateLimited { retry_after: None }.is_transient());
        assert!(!SourceError::Malformed("x".into()).is_transient());
        assert!(!SourceError::Http {
            status: 400,
            url: "u".into(),
            message: "bad".into()
        }
        .is_transient());
    }

    #[test]
    fn test_overlap_message() {
        let err = BuildError::OverlappingIntervals {
            chrom: "1".into(),
            first: (10, 20),
            second: (15, 30),
        };
        assert_eq!(
            err.to_string(),
            "Overlapping intervals on chromosome 1: (10, 20) and (15, 30)"
        );
    }

    #[test]
    fn test_unknown_chromosome_converts() {
        let err: RemapError = MappingError::UnknownChromosome("chrZZZ".into()).into();
        assert!(matches!(err, RemapError::Mapping(MappingError::UnknownChromosome(_))));
    }
}
