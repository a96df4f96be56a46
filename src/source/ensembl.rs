//! Ensembl REST adapter
//!
//! Chromosome lengths come from `info/assembly/{species}`; segments come
//! from `map/{species}/{from}/{region}/{to}` with a region spanning the whole
//! chromosome. HTTP 429 is reported as [`SourceError::RateLimited`] carrying
//! the server's `Retry-After`; the index build decides whether to retry.

use crate::core::{region_string, ChromosomeInfo, Region, Segment, SourceError, SourceResult, Strand};
use crate::source::SegmentSource;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Public Ensembl REST server
pub const DEFAULT_SERVER: &str = "https://rest.ensembl.org";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`EnsemblClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsemblConfig {
    pub server: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for EnsemblConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("asm-remap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EnsemblConfig {
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of an endpoint path relative to the server
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.server.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// `info/assembly` response
#[derive(Debug, Deserialize)]
struct AssemblyInfo {
    #[serde(default)]
    assembly_name: Option<String>,
    top_level_region: Vec<TopLevelRegion>,
}

#[derive(Debug, Deserialize)]
struct TopLevelRegion {
    name: String,
    length: u64,
    coord_system: String,
}

/// `map` response
#[derive(Debug, Deserialize)]
struct MappingResponse {
    mappings: Vec<MappingRecord>,
}

#[derive(Debug, Deserialize)]
struct MappingRecord {
    original: MappedRegion,
    mapped: MappedRegion,
}

#[derive(Debug, Deserialize)]
struct MappedRegion {
    start: u64,
    end: u64,
    strand: Strand,
    seq_region_name: String,
}

impl From<&MappedRegion> for Region {
    fn from(region: &MappedRegion) -> Self {
        Region::new(region.start, region.end, region.strand)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Blocking client for the Ensembl REST API
pub struct EnsemblClient {
    agent: ureq::Agent,
    config: EnsemblConfig,
}

impl EnsemblClient {
    pub fn new(config: EnsemblConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Self { agent, config }
    }

    pub fn config(&self) -> &EnsemblConfig {
        &self.config
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> SourceResult<T> {
        let url = self.config.url(path);
        debug!("GET {}", url);

        let response = self
            .agent
            .get(&url)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .call();

        match response {
            Ok(response) => response
                .into_json::<T>()
                .map_err(|e| SourceError::Malformed(format!("{}: {}", url, e))),
            Err(ureq::Error::Status(429, response)) => Err(SourceError::RateLimited {
                retry_after: parse_retry_after(response.header("Retry-After")),
            }),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(SourceError::Http {
                    status,
                    url,
                    message: error_message(&body),
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(SourceError::Transport(transport.to_string()))
            }
        }
    }

    fn assembly_info(&self, species: &str) -> SourceResult<AssemblyInfo> {
        self.get_json(&format!("info/assembly/{}", species))
    }
}

impl SegmentSource for EnsemblClient {
    fn chromosomes(&self, species: &str) -> SourceResult<Vec<ChromosomeInfo>> {
        Ok(chromosome_regions(self.assembly_info(species)?))
    }

    fn segments(
        &self,
        chrom: &ChromosomeInfo,
        from_assembly: &str,
        to_assembly: &str,
        species: &str,
    ) -> SourceResult<Vec<Segment>> {
        let region = region_string(&chrom.name, 1, Some(chrom.length), Strand::Plus);
        let response: MappingResponse = self.get_json(&format!(
            "map/{}/{}/{}/{}",
            species, from_assembly, region, to_assembly
        ))?;
        into_segments(&chrom.name, response)
    }

    /// Lengths are only known when the server's current assembly is the target
    fn target_lengths(
        &self,
        species: &str,
        to_assembly: &str,
    ) -> SourceResult<Option<HashMap<String, u64>>> {
        let info = self.assembly_info(species)?;
        let current = info.assembly_name.clone().unwrap_or_default();
        if !same_assembly(&current, to_assembly) {
            debug!(
                "Server assembly {} is not {}; target lengths unavailable",
                current, to_assembly
            );
            return Ok(None);
        }
        Ok(Some(
            chromosome_regions(info)
                .into_iter()
                .map(|c| (c.name, c.length))
                .collect(),
        ))
    }
}

/// Chromosome-level top-level regions, in response order
fn chromosome_regions(info: AssemblyInfo) -> Vec<ChromosomeInfo> {
    info.top_level_region
        .into_iter()
        .filter(|r| r.coord_system == "chromosome")
        .map(|r| ChromosomeInfo::new(r.name, r.length))
        .collect()
}

fn into_segments(chrom: &str, response: MappingResponse) -> SourceResult<Vec<Segment>> {
    let mut cross_chrom = 0usize;
    let segments = response
        .mappings
        .iter()
        .map(|record| {
            if record.original.seq_region_name != chrom {
                return Err(SourceError::Malformed(format!(
                    "mapping for {} reports original region on {}",
                    chrom, record.original.seq_region_name
                )));
            }
            let segment = Segment::new(chrom, (&record.original).into(), (&record.mapped).into());
            if record.mapped.seq_region_name == chrom {
                return Ok(segment);
            }
            cross_chrom += 1;
            Ok(segment.with_mapped_chromosome(record.mapped.seq_region_name.as_str()))
        })
        .collect::<SourceResult<Vec<_>>>()?;

    if cross_chrom > 0 {
        debug!("{}: {} segments map onto other sequences", chrom, cross_chrom);
    }
    Ok(segments)
}

/// `Retry-After` in (possibly fractional) seconds
fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// `GRCh38.p14` names the same assembly as `GRCh38`
fn same_assembly(current: &str, wanted: &str) -> bool {
    !current.is_empty()
        && (current.eq_ignore_ascii_case(wanted)
            || current
                .split('.')
                .next()
                .is_some_and(|base| base.eq_ignore_ascii_case(wanted)))
}
