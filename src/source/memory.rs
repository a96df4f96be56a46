//! In-memory segment source
//!
//! Serves a fixed set of chromosomes and segments for every assembly pair.
//! Counts requests and can simulate rate limiting, which makes it the
//! source of choice for tests and embedding pre-fetched data.

use crate::core::{ChromosomeInfo, Segment, SourceError, SourceResult};
use crate::source::SegmentSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct InMemorySource {
    chromosomes: Vec<ChromosomeInfo>,
    segments: HashMap<String, Vec<Segment>>,
    target_lengths: Option<HashMap<String, u64>>,
    /// Number of upcoming segment requests answered with a rate-limit error
    rate_limited: AtomicUsize,
    retry_after: Option<Duration>,
    chromosome_requests: AtomicUsize,
    segment_requests: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a chromosome of the source assembly
    pub fn with_chromosome(mut self, name: impl Into<String>, length: u64) -> Self {
        let info = ChromosomeInfo::new(name, length);
        self.segments.entry(info.name.clone()).or_default();
        self.chromosomes.push(info);
        self
    }

    /// Add a segment to its chromosome
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments
            .entry(segment.chromosome.clone())
            .or_default()
            .push(segment);
        self
    }

    /// Chromosome lengths reported for the target assembly
    pub fn with_target_lengths(mut self, lengths: HashMap<String, u64>) -> Self {
        self.target_lengths = Some(lengths);
        self
    }

    /// Answer the next `count` segment requests with a rate-limit error
    pub fn rate_limit_next(self, count: usize, retry_after: Option<Duration>) -> Self {
        self.rate_limited.store(count, Ordering::SeqCst);
        Self {
            retry_after,
            ..self
        }
    }

    /// Number of `chromosomes` calls served so far
    pub fn chromosome_requests(&self) -> usize {
        self.chromosome_requests.load(Ordering::SeqCst)
    }

    /// Number of `segments` calls served so far, including rate-limited ones
    pub fn segment_requests(&self) -> usize {
        self.segment_requests.load(Ordering::SeqCst)
    }

    /// Total calls made against this source
    pub fn requests(&self) -> usize {
        self.chromosome_requests() + self.segment_requests()
    }
}

impl SegmentSource for InMemorySource {
    fn chromosomes(&self, _species: &str) -> SourceResult<Vec<ChromosomeInfo>> {
        self.chromosome_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.chromosomes.clone())
    }

    fn segments(
        &self,
        chrom: &ChromosomeInfo,
        _from_assembly: &str,
        _to_assembly: &str,
        _species: &str,
    ) -> SourceResult<Vec<Segment>> {
        self.segment_requests.fetch_add(1, Ordering::SeqCst);

        let limited = self
            .rate_limited
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if limited {
            return Err(SourceError::RateLimited {
                retry_after: self.retry_after,
            });
        }

        self.segments
            .get(&chrom.name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownChromosome(chrom.name.clone()))
    }

    fn target_lengths(
        &self,
        _species: &str,
        _to_assembly: &str,
    ) -> SourceResult<Option<HashMap<String, u64>>> {
        Ok(self.target_lengths.clone())
    }
}
