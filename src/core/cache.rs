//! Assembly index construction and caching
//!
//! An [`AssemblyIndex`] is built once per (from, to, species) triple by
//! asking a [`SegmentSource`] for every chromosome's segments, and then
//! shared read-only through [`MappingCache`].

use crate::core::error::{BuildError, BuildResult};
use crate::core::index::{AssemblyIndex, CompatMode, IntervalIndexBuilder};
use crate::core::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::core::segment::{ChromosomeInfo, Segment};
use crate::source::SegmentSource;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Identifies one assembly index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub from_assembly: String,
    pub to_assembly: String,
    pub species: String,
}

impl CacheKey {
    pub fn new(
        from_assembly: impl Into<String>,
        to_assembly: impl Into<String>,
        species: impl Into<String>,
    ) -> Self {
        Self {
            from_assembly: from_assembly.into(),
            to_assembly: to_assembly.into(),
            species: species.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.from_assembly, self.to_assembly, self.species)
    }
}

/// Settings shared by every index build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub retry: RetryPolicy,
    pub compat_mode: CompatMode,
}

/// Chromosomes of the key's species, retrying rate-limited requests
pub fn fetch_chromosomes<S: SegmentSource + ?Sized>(
    source: &S,
    key: &CacheKey,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> BuildResult<Vec<ChromosomeInfo>> {
    let chromosomes = retry.run(
        &format!("chromosome list for {}", key.species),
        sleeper,
        || source.chromosomes(&key.species),
    )?;
    if chromosomes.is_empty() {
        return Err(BuildError::NoChromosomes {
            species: key.species.clone(),
        });
    }
    Ok(chromosomes)
}

/// Whole-chromosome segments, retrying rate-limited requests
pub fn fetch_segments<S: SegmentSource + ?Sized>(
    source: &S,
    chrom: &ChromosomeInfo,
    key: &CacheKey,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> BuildResult<Vec<Segment>> {
    retry.run(&format!("segments for chromosome {}", chrom.name), sleeper, || {
        source.segments(chrom, &key.from_assembly, &key.to_assembly, &key.species)
    })
}

/// Target-assembly chromosome lengths, retrying rate-limited requests
pub fn fetch_target_lengths<S: SegmentSource + ?Sized>(
    source: &S,
    key: &CacheKey,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> BuildResult<Option<HashMap<String, u64>>> {
    retry.run(
        &format!("{} chromosome lengths", key.to_assembly),
        sleeper,
        || source.target_lengths(&key.species, &key.to_assembly),
    )
}

/// Build the complete index for `key`
///
/// Any failure aborts the whole build; no partial index is returned.
pub fn build_assembly_index<S: SegmentSource + ?Sized>(
    source: &S,
    key: &CacheKey,
    options: &BuildOptions,
    sleeper: &dyn Sleeper,
) -> BuildResult<AssemblyIndex> {
    let start = Instant::now();
    let chromosomes = fetch_chromosomes(source, key, &options.retry, sleeper)?;

    let target_lengths = if options.compat_mode.is_strict() {
        None
    } else {
        fetch_target_lengths(source, key, &options.retry, sleeper)?
    };

    let mut assembly = AssemblyIndex::new();
    for chrom in &chromosomes {
        let segments = fetch_segments(source, chrom, key, &options.retry, sleeper)?;

        let mut builder = IntervalIndexBuilder::new(chrom.name.clone(), chrom.length);
        for segment in &segments {
            let target_length = target_lengths
                .as_ref()
                .and_then(|lengths| lengths.get(segment.target_chromosome()).copied());
            let inversion_length = options
                .compat_mode
                .inversion_length(chrom.length, target_length);
            builder.push(segment, inversion_length)?;
        }
        assembly.insert(builder.build()?);
    }

    info!(
        "Built {} index: {} chromosomes, {} intervals in {:.2}s",
        key,
        assembly.len(),
        assembly.total_intervals(),
        start.elapsed().as_secs_f64()
    );
    Ok(assembly)
}

/// Process-wide store of assembly indexes
///
/// Entries are never evicted. The internal lock is held for the duration
/// of a build, so concurrent first requests for a triple fetch only once.
pub struct MappingCache {
    entries: Mutex<HashMap<CacheKey, Arc<AssemblyIndex>>>,
    options: BuildOptions,
    sleeper: Box<dyn Sleeper + Send + Sync>,
}

impl Default for MappingCache {
    fn default() -> Self {
        Self::new(BuildOptions::default())
    }
}

impl MappingCache {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            options,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace the sleeper used between rate-limited attempts
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + Send + Sync + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Cached index, or the result of `build_fn` stored under `key`
    ///
    /// A failed build leaves the cache unchanged.
    pub fn get_or_build<F>(&self, key: &CacheKey, build_fn: F) -> BuildResult<Arc<AssemblyIndex>>
    where
        F: FnOnce() -> BuildResult<AssemblyIndex>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(index) = entries.get(key) {
            debug!("Mapping cache hit: {}", key);
            return Ok(Arc::clone(index));
        }

        info!("Mapping cache miss: {}, building index", key);
        let index = Arc::new(build_fn()?);
        entries.insert(key.clone(), Arc::clone(&index));
        Ok(index)
    }

    /// Cached index, building it from `source` on a miss
    pub fn get_or_fetch<S: SegmentSource + ?Sized>(
        &self,
        source: &S,
        key: &CacheKey,
    ) -> BuildResult<Arc<AssemblyIndex>> {
        self.get_or_build(key, || {
            build_assembly_index(source, key, &self.options, self.sleeper.as_ref())
        })
    }

    /// Cached index without building
    pub fn get(&self, key: &CacheKey) -> Option<Arc<AssemblyIndex>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of cached triples
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
