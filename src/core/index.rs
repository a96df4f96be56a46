//! Interval index for point queries on the source assembly
//!
//! Each chromosome's segments become half-open intervals `[start, end + 1)`
//! stored in a rust-lapper tree, with the forward-oriented target region
//! as payload.

use crate::core::error::{BuildError, BuildResult};
use crate::core::segment::{Region, Segment, Strand};
use log::{debug, warn};
use rust_lapper::{Interval, Lapper};
use std::collections::HashMap;

/// Type alias for index intervals: source `[low, high_exclusive)` -> target region
pub type SegmentInterval = Interval<u64, Region>;

/// Which chromosome length inverts reverse-strand targets
///
/// Reverse-strand targets are re-expressed as `(L - end + 1, L - start + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompatMode {
    /// Use the target chromosome length when the source supplies one,
    /// otherwise fall back to the source length
    #[default]
    Improved,
    /// Always use the source chromosome length
    Strict,
}

impl CompatMode {
    /// Check if strict mode is enabled
    pub fn is_strict(&self) -> bool {
        matches!(self, CompatMode::Strict)
    }

    /// Length used to invert reverse-strand targets
    pub fn inversion_length(&self, source_length: u64, target_length: Option<u64>) -> u64 {
        match (self, target_length) {
            (CompatMode::Improved, Some(length)) => length,
            _ => source_length,
        }
    }
}

/// Builds the index of a single chromosome from its segments
#[derive(Debug)]
pub struct IntervalIndexBuilder {
    chrom: String,
    length: u64,
    intervals: Vec<SegmentInterval>,
    /// Reverse-strand segments that could not be inverted
    skipped: usize,
}

impl IntervalIndexBuilder {
    /// Start a chromosome of `length` positions in the source assembly
    pub fn new(chrom: impl Into<String>, length: u64) -> Self {
        Self {
            chrom: chrom.into(),
            length,
            intervals: Vec::new(),
            skipped: 0,
        }
    }

    /// Add one segment, inverting a reverse-strand target with `inversion_length`
    ///
    /// A reverse-strand target ending past `inversion_length` cannot be
    /// inverted; the segment is skipped and its positions stay unmapped.
    pub fn push(&mut self, segment: &Segment, inversion_length: u64) -> BuildResult<()> {
        if segment.chromosome != self.chrom {
            return Err(self.invalid(format!(
                "segment belongs to chromosome {}",
                segment.chromosome
            )));
        }

        let original = segment.original;
        let mapped = segment.mapped;
        self.check_bounds("original", &original)?;
        self.check_bounds("mapped", &mapped)?;

        let high_exclusive = original
            .end
            .checked_add(1)
            .ok_or_else(|| self.invalid("original end overflows".to_string()))?;

        let Some(target) = normalize_target(&mapped, inversion_length) else {
            warn!(
                "Skipping segment {}:{}-{}: reverse-strand target end {} on {} exceeds length {}",
                self.chrom,
                original.start,
                original.end,
                mapped.end,
                segment.target_chromosome(),
                inversion_length
            );
            self.skipped += 1;
            return Ok(());
        };

        self.intervals.push(Interval {
            start: original.start,
            stop: high_exclusive,
            val: target,
        });
        Ok(())
    }

    /// Validate disjointness and freeze the index
    pub fn build(mut self) -> BuildResult<ChromosomeIndex> {
        self.intervals.sort_by_key(|iv| (iv.start, iv.stop));

        for pair in self.intervals.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.stop > b.start {
                return Err(BuildError::OverlappingIntervals {
                    chrom: self.chrom,
                    first: (a.start, a.stop),
                    second: (b.start, b.stop),
                });
            }
        }

        debug!(
            "Indexed chromosome {}: {} intervals over {} bp ({} skipped)",
            self.chrom,
            self.intervals.len(),
            self.length,
            self.skipped
        );

        Ok(ChromosomeIndex {
            name: self.chrom,
            length: self.length,
            lapper: Lapper::new(self.intervals),
        })
    }

    fn check_bounds(&self, which: &str, region: &Region) -> BuildResult<()> {
        if region.start == 0 {
            return Err(self.invalid(format!("{} start must be 1-based, got 0", which)));
        }
        if region.start > region.end {
            return Err(self.invalid(format!(
                "{} start ({}) > end ({})",
                which, region.start, region.end
            )));
        }
        Ok(())
    }

    fn invalid(&self, message: String) -> BuildError {
        BuildError::InvalidSegment {
            chrom: self.chrom.clone(),
            message,
        }
    }
}

/// Forward-oriented target region
///
/// Reverse-strand targets are reflected so that increasing source
/// positions map to increasing target positions. `None` when the target
/// ends past `length`.
fn normalize_target(mapped: &Region, length: u64) -> Option<Region> {
    match mapped.strand {
        Strand::Plus => Some(*mapped),
        Strand::Minus if mapped.end > length => None,
        Strand::Minus => Some(Region {
            start: length - mapped.end + 1,
            end: length - mapped.start + 1,
            strand: Strand::Minus,
        }),
    }
}

/// Point-query index of one chromosome
#[derive(Debug)]
pub struct ChromosomeIndex {
    name: String,
    length: u64,
    lapper: Lapper<u64, Region>,
}

impl ChromosomeIndex {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source-assembly length
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Interval containing `pos`, if any
    pub fn find(&self, pos: u64) -> Option<&SegmentInterval> {
        self.lapper.find(pos, pos.saturating_add(1)).next()
    }

    /// Intervals in source order
    pub fn intervals(&self) -> impl Iterator<Item = &SegmentInterval> {
        self.lapper.iter()
    }

    pub fn len(&self) -> usize {
        self.lapper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lapper.is_empty()
    }
}

/// Per-chromosome indexes for one (from, to, species) triple
#[derive(Debug, Default)]
pub struct AssemblyIndex {
    maps: HashMap<String, ChromosomeIndex>,
    /// Normalized chromosome name -> name used in the index
    chrom_aliases: HashMap<String, String>,
    /// Chromosome names in the order they were declared
    order: Vec<String>,
}

impl AssemblyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chromosome, replacing any previous index of the same name
    pub fn insert(&mut self, index: ChromosomeIndex) {
        let name = index.name.clone();
        self.chrom_aliases.insert(normalize_chrom_key(&name), name.clone());
        if self.maps.insert(name.clone(), index).is_none() {
            self.order.push(name);
        }
    }

    /// Find a chromosome, accepting `chr`-prefixed and case variants
    pub fn get(&self, chrom: &str) -> Option<&ChromosomeIndex> {
        if let Some(index) = self.maps.get(chrom) {
            return Some(index);
        }

        let normalized = normalize_chrom_key(chrom);
        self.chrom_aliases
            .get(&normalized)
            .and_then(|original| self.maps.get(original))
    }

    /// Check if a chromosome exists in the index
    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.get(chrom).is_some()
    }

    /// Chromosome names in declaration order
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Number of chromosomes
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Get total number of intervals across all chromosomes
    pub fn total_intervals(&self) -> usize {
        self.maps.values().map(|c| c.len()).sum()
    }
}

/// Normalize chromosome name for flexible matching
///
/// Lowercases, strips a `chr` prefix and folds `m` into `mt`.
fn normalize_chrom_key(chrom: &str) -> String {
    let lower = chrom.to_lowercase();
    let stripped = match lower.strip_prefix("chr") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => lower,
    };
    if stripped == "m" {
        "mt".to_string()
    } else {
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(s: u64, e: u64, ms: u64, me: u64, strand: Strand) -> Segment {
        Segment::new(
            "1",
            Region::new(s, e, Strand::Plus),
            Region::new(ms, me, strand),
        )
    }

    fn build(segments: &[Segment], length: u64) -> BuildResult<ChromosomeIndex> {
        let mut builder = IntervalIndexBuilder::new("1", length);
        for segment in segments {
            builder.push(segment, length)?;
        }
        builder.build()
    }

    #[test]
    fn test_interval_is_half_open() {
        let index = build(&[segment(100, 199, 1100, 1199, Strand::Plus)], 1000).unwrap();

        let iv = index.find(100).unwrap();
        assert_eq!((iv.start, iv.stop), (100, 200));
        assert!(index.find(199).is_some());
        assert!(index.find(200).is_none());
        assert!(index.find(99).is_none());
    }

    #[test]
    fn test_forward_target_unchanged() {
        let index = build(&[segment(10, 20, 110, 120, Strand::Plus)], 1000).unwrap();
        assert_eq!(
            index.find(15).unwrap().val,
            Region::new(110, 120, Strand::Plus)
        );
    }

    #[test]
    fn test_reverse_target_inverted_with_length() {
        let index = build(&[segment(10, 20, 110, 120, Strand::Minus)], 1000).unwrap();
        let target = index.find(10).unwrap().val;
        assert_eq!((target.start, target.end), (1000 - 120 + 1, 1000 - 110 + 1));
        assert_eq!(target.strand, Strand::Minus);
    }

    #[test]
    fn test_inversion_length_override() {
        let mut builder = IntervalIndexBuilder::new("1", 1000);
        builder.push(&segment(10, 20, 110, 120, Strand::Minus), 2000).unwrap();
        let index = builder.build().unwrap();
        assert_eq!(index.find(10).unwrap().val.start, 2000 - 120 + 1);
    }

    #[test]
    fn test_reverse_target_past_length_is_skipped() {
        let index = build(
            &[
                segment(1, 10, 995, 1004, Strand::Minus),
                segment(20, 29, 100, 109, Strand::Minus),
            ],
            1000,
        )
        .unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.find(1).is_none());
        assert!(index.find(10).is_none());
        assert_eq!(index.find(20).unwrap().val.start, 1000 - 109 + 1);
    }

    #[test]
    fn test_adjacent_segments_are_disjoint() {
        let index = build(
            &[
                segment(200, 299, 1200, 1299, Strand::Plus),
                segment(100, 199, 1100, 1199, Strand::Plus),
            ],
            1000,
        )
        .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.find(199).unwrap().start, 100);
        assert_eq!(index.find(200).unwrap().start, 200);
    }

    #[test]
    fn test_overlapping_segments_rejected() {
        let err = build(
            &[
                segment(100, 200, 1100, 1200, Strand::Plus),
                segment(200, 300, 1300, 1400, Strand::Plus),
            ],
            1000,
        )
        .unwrap_err();
        match err {
            BuildError::OverlappingIntervals { chrom, first, second } => {
                assert_eq!(chrom, "1");
                assert_eq!(first, (100, 201));
                assert_eq!(second, (200, 301));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_segments_rejected() {
        assert!(matches!(
            build(&[segment(20, 10, 1, 11, Strand::Plus)], 1000),
            Err(BuildError::InvalidSegment { .. })
        ));
        assert!(matches!(
            build(&[segment(0, 10, 1, 11, Strand::Plus)], 1000),
            Err(BuildError::InvalidSegment { .. })
        ));

        let mut builder = IntervalIndexBuilder::new("1", 1000);
        let foreign = Segment::new(
            "2",
            Region::new(1, 10, Strand::Plus),
            Region::new(1, 10, Strand::Plus),
        );
        assert!(builder.push(&foreign, 1000).is_err());
    }

    #[test]
    fn test_empty_chromosome() {
        let index = build(&[], 1000).unwrap();
        assert!(index.is_empty());
        assert!(index.find(1).is_none());
    }

    #[test]
    fn test_assembly_index_lookup_variants() {
        let mut assembly = AssemblyIndex::new();
        assembly.insert(build(&[], 1000).unwrap());
        assembly.insert(IntervalIndexBuilder::new("MT", 16569).build().unwrap());

        assert!(assembly.has_chrom("1"));
        assert!(assembly.has_chrom("chr1"));
        assert!(assembly.has_chrom("CHR1"));
        assert!(assembly.has_chrom("chrM"));
        assert!(!assembly.has_chrom("chrZZZ"));
        assert_eq!(assembly.chromosomes().collect::<Vec<_>>(), vec!["1", "MT"]);
        assert_eq!(assembly.len(), 2);
        assert_eq!(assembly.total_intervals(), 0);
    }

    #[test]
    fn test_compat_mode_inversion_length() {
        assert_eq!(CompatMode::Improved.inversion_length(100, Some(120)), 120);
        assert_eq!(CompatMode::Improved.inversion_length(100, None), 100);
        assert_eq!(CompatMode::Strict.inversion_length(100, Some(120)), 100);
        assert!(CompatMode::Strict.is_strict());
        assert!(!CompatMode::default().is_strict());
    }
}
