//! asm-remap - Genome assembly coordinate remapping
//!
//! Translates 1-based positions recorded under one reference assembly into
//! the equivalent positions under another, using mapping segments supplied
//! by a segment source such as the Ensembl REST API.
//!
//! # Features
//!
//! - One whole-chromosome request per chromosome, not one per position
//! - Interval index per chromosome with rust-lapper
//! - Indexes cached per (from, to, species) triple for the process lifetime
//! - Rate-limited requests retried with a bounded backoff
//! - Offline snapshots of fetched segments
//!
//! # Example
//!
//! ```ignore
//! use asm_remap::{CoordinateMapper, MappingCache};
//! use asm_remap::source::{EnsemblClient, EnsemblConfig};
//!
//! let cache = MappingCache::default();
//! let client = EnsemblClient::new(EnsemblConfig::default());
//!
//! let mapper = CoordinateMapper::new(&cache, &client, "GRCh37", "GRCh38", "human")?;
//! assert_eq!(mapper.map("1", 1000000)?, Some(1064620));
//! ```

pub mod core;
pub mod formats;
pub mod source;

// Re-export commonly used types
pub use crate::core::{
    AssemblyIndex, BuildError, BuildOptions, CacheKey, ChromosomeInfo, CompatMode,
    CoordinateMapper, MappedPosition, MappingCache, MappingError, Region, RemapError,
    RetryPolicy, Segment, SourceError, Strand,
};
pub use source::SegmentSource;
