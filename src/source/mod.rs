//! Segment sources
//!
//! A [`SegmentSource`] supplies the chromosomes of a species and, per
//! chromosome, the segments mapping it from one assembly to another. The
//! index build depends only on this trait.

pub mod ensembl;
pub mod memory;
pub mod snapshot;

use crate::core::{ChromosomeInfo, Segment, SourceResult};
use std::collections::HashMap;

pub use ensembl::{EnsemblClient, EnsemblConfig, DEFAULT_SERVER};
pub use memory::InMemorySource;
pub use snapshot::{Snapshot, SnapshotSource};

/// Provider of assembly mapping segments
pub trait SegmentSource {
    /// Chromosomes of `species`, in source order
    ///
    /// Only sequences whose coordinate system is "chromosome" are listed.
    fn chromosomes(&self, species: &str) -> SourceResult<Vec<ChromosomeInfo>>;

    /// Segments covering the whole of `chrom`, fetched as one range request
    fn segments(
        &self,
        chrom: &ChromosomeInfo,
        from_assembly: &str,
        to_assembly: &str,
        species: &str,
    ) -> SourceResult<Vec<Segment>>;

    /// Chromosome lengths in `to_assembly`, when the source knows them
    fn target_lengths(
        &self,
        _species: &str,
        _to_assembly: &str,
    ) -> SourceResult<Option<HashMap<String, u64>>> {
        Ok(None)
    }
}

impl<S: SegmentSource + ?Sized> SegmentSource for &S {
    fn chromosomes(&self, species: &str) -> SourceResult<Vec<ChromosomeInfo>> {
        (**self).chromosomes(species)
    }

    fn segments(
        &self,
        chrom: &ChromosomeInfo,
        from_assembly: &str,
        to_assembly: &str,
        species: &str,
    ) -> SourceResult<Vec<Segment>> {
        (**self).segments(chrom, from_assembly, to_assembly, species)
    }

    fn target_lengths(
        &self,
        species: &str,
        to_assembly: &str,
    ) -> SourceResult<Option<HashMap<String, u64>>> {
        (**self).target_lengths(species, to_assembly)
    }
}
