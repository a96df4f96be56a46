//! Coordinate mapping
//!
//! Maps single 1-based positions from the source to the target assembly.
//!
//! The algorithm:
//! 1. Look up the chromosome's interval index
//! 2. Find the interval containing the position
//! 3. Offset into the interval's forward-oriented target region:
//!    `target.start + (pos - interval.start)`

use crate::core::cache::{CacheKey, MappingCache};
use crate::core::error::{BuildResult, MappingError, MappingResult};
use crate::core::index::AssemblyIndex;
use crate::core::segment::Strand;
use crate::source::SegmentSource;
use std::sync::Arc;

/// A mapped position and the strand of the segment it fell in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedPosition {
    /// Position in forward-oriented target coordinates
    pub position: u64,
    /// Strand of the target region in the target assembly
    pub strand: Strand,
}

/// Coordinate mapper for one (from, to, species) triple
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    key: CacheKey,
    index: Arc<AssemblyIndex>,
}

impl CoordinateMapper {
    /// Resolve the index for the triple through `cache`
    ///
    /// On the first request for a triple this blocks on `source`.
    pub fn new<S: SegmentSource + ?Sized>(
        cache: &MappingCache,
        source: &S,
        from_assembly: &str,
        to_assembly: &str,
        species: &str,
    ) -> BuildResult<Self> {
        let key = CacheKey::new(from_assembly, to_assembly, species);
        let index = cache.get_or_fetch(source, &key)?;
        Ok(Self { key, index })
    }

    /// Wrap an index that was built elsewhere
    pub fn from_index(key: CacheKey, index: Arc<AssemblyIndex>) -> Self {
        Self { key, index }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Get a reference to the underlying index
    pub fn index(&self) -> &AssemblyIndex {
        &self.index
    }

    /// Source chromosome names in declaration order
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.index.chromosomes()
    }

    pub fn has_chromosome(&self, chrom: &str) -> bool {
        self.index.has_chrom(chrom)
    }

    /// Map `pos` on `chrom` to the target assembly
    ///
    /// Returns `Ok(None)` when the position falls in a gap, and
    /// [`MappingError::UnknownChromosome`] when the chromosome was never declared.
    ///
    /// # Example
    /// ```
    /// use asm_remap::core::{CoordinateMapper, MappingCache, Region, Segment, Strand};
    /// use asm_remap::source::InMemorySource;
    ///
    /// let source = InMemorySource::new()
    ///     .with_chromosome("1", 249_000_000)
    ///     .with_segment(Segment::new(
    ///         "1",
    ///         Region::new(1_000_000, 1_000_100, Strand::Plus),
    ///         Region::new(1_064_620, 1_064_720, Strand::Plus),
    ///     ));
    /// let cache = MappingCache::default();
    /// let mapper = CoordinateMapper::new(&cache, &source, "GRCh37", "GRCh38", "human").unwrap();
    ///
    /// assert_eq!(mapper.map("1", 1_000_000), Ok(Some(1_064_620)));
    /// assert_eq!(mapper.map("1", 1_000_101), Ok(None));
    /// ```
    pub fn map(&self, chrom: &str, pos: u64) -> MappingResult<Option<u64>> {
        Ok(self.locate(chrom, pos)?.map(|m| m.position))
    }

    /// Like [`map`](Self::map), also reporting the target strand
    pub fn locate(&self, chrom: &str, pos: u64) -> MappingResult<Option<MappedPosition>> {
        let chrom_index = self
            .index
            .get(chrom)
            .ok_or_else(|| MappingError::UnknownChromosome(chrom.to_string()))?;

        Ok(chrom_index.find(pos).map(|interval| MappedPosition {
            position: interval.val.start + (pos - interval.start),
            strand: interval.val.strand,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::{Region, Segment};
    use crate::source::InMemorySource;

    const CHROM_LEN: u64 = 249_000_000;

    fn create_test_mapper() -> CoordinateMapper {
        let source = InMemorySource::new()
            .with_chromosome("1", CHROM_LEN)
            .with_chromosome("Y", 1000)
            .with_segment(Segment::new(
                "1",
                Region::new(1_000_000, 1_000_100, Strand::Plus),
                Region::new(1_064_620, 1_064_720, Strand::Plus),
            ))
            .with_segment(Segment::new(
                "1",
                Region::new(2_000_000, 2_000_009, Strand::Plus),
                Region::new(500, 509, Strand::Minus),
            ));
        let cache = MappingCache::default();
        CoordinateMapper::new(&cache, &source, "GRCh37", "GRCh38", "human").unwrap()
    }

    #[test]
    fn test_map_forward_segment() {
        let mapper = create_test_mapper();
        assert_eq!(mapper.map("1", 1_000_000), Ok(Some(1_064_620)));
        assert_eq!(mapper.map("1", 1_000_050), Ok(Some(1_064_670)));
        assert_eq!(mapper.map("1", 1_000_100), Ok(Some(1_064_720)));
    }

    #[test]
    fn test_map_gap_is_none() {
        let mapper = create_test_mapper();
        assert_eq!(mapper.map("1", 1_000_101), Ok(None));
        assert_eq!(mapper.map("1", 999_999), Ok(None));
        assert_eq!(mapper.map("1", 0), Ok(None));
        // Declared chromosome without segments
        assert_eq!(mapper.map("Y", 10), Ok(None));
    }

    #[test]
    fn test_map_reverse_segment() {
        let mapper = create_test_mapper();
        assert_eq!(mapper.map("1", 2_000_000), Ok(Some(CHROM_LEN - 509 + 1)));
        assert_eq!(mapper.map("1", 2_000_009), Ok(Some(CHROM_LEN - 500 + 1)));

        let located = mapper.locate("1", 2_000_000).unwrap().unwrap();
        assert_eq!(located.strand, Strand::Minus);
    }

    #[test]
    fn test_map_unknown_chromosome() {
        let mapper = create_test_mapper();
        assert_eq!(
            mapper.map("chrZZZ", 1),
            Err(MappingError::UnknownChromosome("chrZZZ".to_string()))
        );
    }

    #[test]
    fn test_map_accepts_chr_prefix() {
        let mapper = create_test_mapper();
        assert_eq!(mapper.map("chr1", 1_000_000), Ok(Some(1_064_620)));
    }

    #[test]
    fn test_mapper_accessors() {
        let mapper = create_test_mapper();
        assert_eq!(mapper.key(), &CacheKey::new("GRCh37", "GRCh38", "human"));
        assert_eq!(mapper.chromosomes().collect::<Vec<_>>(), vec!["1", "Y"]);
        assert!(mapper.has_chromosome("Y"));
        assert_eq!(mapper.index().total_intervals(), 2);
    }
}
