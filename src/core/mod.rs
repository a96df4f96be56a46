//! Core coordinate mapping functionality
//!
//! This module contains the segment data model, the interval index,
//! the per-triple index cache and the coordinate mapper.

mod cache;
mod error;
mod index;
mod mapper;
mod retry;
mod segment;

pub use cache::{
    build_assembly_index, fetch_chromosomes, fetch_segments, fetch_target_lengths, BuildOptions,
    CacheKey, MappingCache,
};
pub use error::{
    BuildError, BuildResult, MappingError, MappingResult, RemapError, Result, SourceError,
    SourceResult,
};
pub use index::{AssemblyIndex, ChromosomeIndex, CompatMode, IntervalIndexBuilder, SegmentInterval};
pub use mapper::{CoordinateMapper, MappedPosition};
pub use retry::{Backoff, RetryPolicy, Sleeper, ThreadSleeper, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use segment::{region_string, ChromosomeInfo, Region, Segment, Strand};
