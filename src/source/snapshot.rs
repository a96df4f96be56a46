//! Offline snapshots of a segment source
//!
//! A snapshot records everything an index build fetches for one
//! (from, to, species) triple as JSON, optionally gzip-compressed, so the
//! build can later be replayed without network access.

use crate::core::{
    fetch_chromosomes, fetch_segments, fetch_target_lengths, BuildResult, CacheKey,
    ChromosomeInfo, RetryPolicy, Segment, Sleeper, SourceError, SourceResult,
};
use crate::source::SegmentSource;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Chromosomes and segments of one triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub from_assembly: String,
    pub to_assembly: String,
    pub species: String,
    pub chromosomes: Vec<ChromosomeInfo>,
    pub segments: BTreeMap<String, Vec<Segment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_lengths: Option<HashMap<String, u64>>,
}

impl Snapshot {
    /// Fetch everything needed to index `key` from `source`
    pub fn capture<S: SegmentSource + ?Sized>(
        source: &S,
        key: &CacheKey,
        retry: &RetryPolicy,
        sleeper: &dyn Sleeper,
    ) -> BuildResult<Self> {
        let chromosomes = fetch_chromosomes(source, key, retry, sleeper)?;
        let target_lengths = fetch_target_lengths(source, key, retry, sleeper)?;

        let mut segments = BTreeMap::new();
        for chrom in &chromosomes {
            let fetched = fetch_segments(source, chrom, key, retry, sleeper)?;
            segments.insert(chrom.name.clone(), fetched);
        }

        info!(
            "Captured {}: {} chromosomes, {} segments",
            key,
            chromosomes.len(),
            segments.values().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            from_assembly: key.from_assembly.clone(),
            to_assembly: key.to_assembly.clone(),
            species: key.species.clone(),
            chromosomes,
            segments,
            target_lengths,
        })
    }

    /// Triple this snapshot was captured for
    pub fn key(&self) -> CacheKey {
        CacheKey::new(&self.from_assembly, &self.to_assembly, &self.species)
    }

    /// Read a snapshot, detecting gzip compression from the magic bytes
    pub fn read<R: Read>(reader: R) -> SourceResult<Self> {
        let mut reader = BufReader::new(reader);
        let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

        let parsed = if is_gzip {
            serde_json::from_reader(BufReader::new(GzDecoder::new(reader)))
        } else {
            serde_json::from_reader(reader)
        };
        parsed.map_err(|e| SourceError::Malformed(format!("snapshot: {}", e)))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        Self::read(File::open(path.as_ref())?)
    }

    /// Write as plain JSON
    pub fn write<W: Write>(&self, writer: W) -> SourceResult<()> {
        serde_json::to_writer(writer, self)
            .map_err(|e| SourceError::Malformed(format!("snapshot: {}", e)))
    }

    /// Write to `path`, gzip-compressed when it ends in `.gz`
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> SourceResult<()> {
        let path = path.as_ref();
        let mut file = BufWriter::new(File::create(path)?);

        if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            let mut encoder = GzEncoder::new(file, Compression::default());
            self.write(&mut encoder)?;
            encoder.finish()?.flush()?;
        } else {
            self.write(&mut file)?;
            file.flush()?;
        }
        Ok(())
    }
}

/// Replays a [`Snapshot`]
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        Ok(Self::new(Snapshot::from_path(path)?))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn check_species(&self, species: &str) -> SourceResult<()> {
        if species != self.snapshot.species {
            return Err(SourceError::Unavailable(format!(
                "snapshot holds species {}, not {}",
                self.snapshot.species, species
            )));
        }
        Ok(())
    }
}

impl SegmentSource for SnapshotSource {
    fn chromosomes(&self, species: &str) -> SourceResult<Vec<ChromosomeInfo>> {
        self.check_species(species)?;
        Ok(self.snapshot.chromosomes.clone())
    }

    fn segments(
        &self,
        chrom: &ChromosomeInfo,
        from_assembly: &str,
        to_assembly: &str,
        species: &str,
    ) -> SourceResult<Vec<Segment>> {
        self.check_species(species)?;
        if from_assembly != self.snapshot.from_assembly || to_assembly != self.snapshot.to_assembly {
            return Err(SourceError::Unavailable(format!(
                "snapshot maps {} -> {}, not {} -> {}",
                self.snapshot.from_assembly, self.snapshot.to_assembly, from_assembly, to_assembly
            )));
        }

        self.snapshot
            .segments
            .get(&chrom.name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownChromosome(chrom.name.clone()))
    }

    fn target_lengths(
        &self,
        species: &str,
        to_assembly: &str,
    ) -> SourceResult<Option<HashMap<String, u64>>> {
        self.check_species(species)?;
        if to_assembly != self.snapshot.to_assembly {
            return Ok(None);
        }
        Ok(self.snapshot.target_lengths.clone())
    }
}
