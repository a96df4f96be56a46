//! asm-remap CLI entry point
//!
//! Remaps genomic positions between reference assemblies.

use anyhow::Context;
use asm_remap::core::{
    BuildOptions, CacheKey, CompatMode, CoordinateMapper, MappingCache, RetryPolicy,
    ThreadSleeper,
};
use asm_remap::formats::{self, ConversionStats};
use asm_remap::source::{EnsemblClient, EnsemblConfig, SegmentSource, Snapshot, SnapshotSource};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Reverse-strand inversion mode (CLI enum)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CompatModeArg {
    /// Invert with the target chromosome length when known
    #[default]
    #[value(name = "improved")]
    Improved,
    /// Always invert with the source chromosome length
    #[value(name = "strict")]
    Strict,
}

impl From<CompatModeArg> for CompatMode {
    fn from(arg: CompatModeArg) -> Self {
        match arg {
            CompatModeArg::Improved => CompatMode::Improved,
            CompatModeArg::Strict => CompatMode::Strict,
        }
    }
}

#[derive(Parser)]
#[command(name = "asm-remap")]
#[command(about = "Remap genomic positions between reference assemblies")]
#[command(version)]
struct Cli {
    /// Source assembly
    #[arg(long = "from", global = true, default_value = "GRCh37")]
    from_assembly: String,

    /// Target assembly
    #[arg(long = "to", global = true, default_value = "GRCh38")]
    to_assembly: String,

    /// Species name or alias
    #[arg(long, global = true, default_value = "human")]
    species: String,

    /// Ensembl REST server
    #[arg(long, global = true, default_value = asm_remap::source::DEFAULT_SERVER)]
    server: String,

    /// Read segments from a snapshot file instead of the server
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Attempts per request when rate limited
    #[arg(long = "max-attempts", global = true, default_value = "3")]
    max_attempts: u32,

    /// Seconds to wait after a rate limit when the server gives no Retry-After
    #[arg(long = "retry-delay", global = true, default_value = "1.0")]
    retry_delay: f64,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value = "60")]
    timeout: u64,

    /// Reverse-strand inversion: 'improved' uses target lengths, 'strict' source lengths
    #[arg(long = "compat-mode", global = true, default_value = "improved")]
    compat_mode: CompatModeArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map positions on one chromosome
    Map {
        /// Chromosome name
        chrom: String,
        /// 1-based positions
        #[arg(required = true)]
        positions: Vec<u64>,
    },
    /// Remap a tab-separated chrom/pos file
    Convert {
        /// Input file (plain or gzip, '-' for stdin)
        input: PathBuf,
        /// Output file (stdout if not specified; failures go to OUTPUT.unmap or stderr)
        output: Option<PathBuf>,
    },
    /// Fetch the segments for the triple and save them for offline use
    Snapshot {
        /// Output file (.json or .json.gz)
        output: PathBuf,
    },
}

impl Cli {
    fn key(&self) -> CacheKey {
        CacheKey::new(&self.from_assembly, &self.to_assembly, &self.species)
    }

    fn retry_policy(&self) -> anyhow::Result<RetryPolicy> {
        let delay = Duration::try_from_secs_f64(self.retry_delay)
            .with_context(|| format!("Invalid retry delay: {}", self.retry_delay))?;
        Ok(RetryPolicy::new(self.max_attempts, delay))
    }

    fn source(&self) -> anyhow::Result<Box<dyn SegmentSource>> {
        match &self.snapshot {
            Some(path) => {
                eprintln!("Loading snapshot: {:?}", path);
                let source = SnapshotSource::from_path(path)
                    .with_context(|| format!("Failed to load snapshot {:?}", path))?;
                Ok(Box::new(source))
            }
            None => {
                let config = EnsemblConfig::default()
                    .with_server(&self.server)
                    .with_timeout(Duration::from_secs(self.timeout));
                Ok(Box::new(EnsemblClient::new(config)))
            }
        }
    }
}

fn load_mapper(cli: &Cli, cache: &MappingCache) -> anyhow::Result<CoordinateMapper> {
    let start = Instant::now();
    let source = cli.source()?;
    eprintln!("Building assembly map: {}", cli.key());

    let mapper = CoordinateMapper::new(
        cache,
        source.as_ref(),
        &cli.from_assembly,
        &cli.to_assembly,
        &cli.species,
    )
    .context("Failed to build assembly map")?;

    eprintln!(
        "Assembly map ready: {} chromosomes, {} intervals in {:.2}s",
        mapper.index().len(),
        mapper.index().total_intervals(),
        start.elapsed().as_secs_f64()
    );
    Ok(mapper)
}

fn print_stats(stats: &ConversionStats, start: Instant) {
    eprintln!("\n=== Conversion Statistics ===");
    eprintln!("Total records:   {}", stats.total);
    eprintln!("Mapped:          {}", stats.mapped);
    eprintln!("Failed:          {}", stats.failed());
    eprintln!("  - Unmapped:    {}", stats.unmapped);
    eprintln!("  - UnknownChr:  {}", stats.unknown_chrom);
    eprintln!("  - Invalid:     {}", stats.invalid);
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let options = BuildOptions {
        retry: cli.retry_policy()?,
        compat_mode: cli.compat_mode.into(),
    };
    let cache = MappingCache::new(options);

    match &cli.command {
        Commands::Map { chrom, positions } => {
            let mapper = load_mapper(&cli, &cache)?;
            for &pos in positions {
                match mapper.map(chrom, pos)? {
                    Some(mapped) => println!("{}\t{}\t{}", chrom, pos, mapped),
                    None => println!("{}\t{}\t.", chrom, pos),
                }
            }
        }

        Commands::Convert { input, output } => {
            let mapper = load_mapper(&cli, &cache)?;

            let stats = match output {
                Some(output) => {
                    eprintln!("Converting positions: {:?} -> {:?}", input, output);
                    formats::convert_positions(input, output, &mapper)?
                }
                None => formats::remap_positions(
                    formats::open_input(input)?,
                    std::io::stdout().lock(),
                    std::io::stderr().lock(),
                    &mapper,
                )?,
            };
            print_stats(&stats, start);
        }

        Commands::Snapshot { output } => {
            let source = cli.source()?;
            eprintln!("Capturing segments: {}", cli.key());

            let snapshot = Snapshot::capture(
                source.as_ref(),
                &cli.key(),
                &cache.options().retry,
                &ThreadSleeper,
            )
            .context("Failed to capture segments")?;
            snapshot
                .to_path(output)
                .with_context(|| format!("Failed to write snapshot {:?}", output))?;

            eprintln!(
                "Snapshot written to {:?} in {:.2}s",
                output,
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}
