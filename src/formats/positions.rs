//! Position list adapter
//!
//! Remaps tab-separated `chrom<TAB>pos[<TAB>...]` lines with 1-based
//! positions. Mapped lines are written with the position replaced; lines
//! that cannot be mapped go to a separate writer tagged with the reason.
//! Header lines starting with `#` are copied to the output unchanged.

use crate::core::{CoordinateMapper, MappingError, Result};
use flate2::read::GzDecoder;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Conversion statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub total: usize,
    pub mapped: usize,
    pub unmapped: usize,
    pub unknown_chrom: usize,
    pub invalid: usize,
}

impl ConversionStats {
    pub fn failed(&self) -> usize {
        self.unmapped + self.unknown_chrom + self.invalid
    }
}

/// Reason a line was not remapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Unmapped,
    UnknownChrom,
    InvalidFormat,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Unmapped => "Unmap",
            FailureReason::UnknownChrom => "UnknownChrom",
            FailureReason::InvalidFormat => "InvalidFormat",
        }
    }
}

/// Split a line into chromosome, position and the remaining columns
pub fn parse_position_line(line: &str) -> std::result::Result<(&str, u64, Option<&str>), FailureReason> {
    let mut fields = line.splitn(3, '\t');
    let chrom = fields
        .next()
        .filter(|c| !c.is_empty())
        .ok_or(FailureReason::InvalidFormat)?;
    let pos = fields
        .next()
        .and_then(|p| p.trim().parse::<u64>().ok())
        .filter(|p| *p > 0)
        .ok_or(FailureReason::InvalidFormat)?;
    Ok((chrom, pos, fields.next()))
}

/// Remap every line of `reader`
pub fn remap_positions<R, W, U>(
    reader: R,
    mut writer: W,
    mut unmap_writer: U,
    mapper: &CoordinateMapper,
) -> Result<ConversionStats>
where
    R: BufRead,
    W: Write,
    U: Write,
{
    let mut stats = ConversionStats::default();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_end_matches(['\r', '\n']);

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            writeln!(writer, "{}", trimmed)?;
            continue;
        }

        stats.total += 1;

        let outcome = parse_position_line(trimmed).and_then(|(chrom, pos, rest)| {
            match mapper.map(chrom, pos) {
                Ok(Some(mapped)) => Ok((chrom, mapped, rest)),
                Ok(None) => Err(FailureReason::Unmapped),
                Err(MappingError::UnknownChromosome(_)) => Err(FailureReason::UnknownChrom),
            }
        });

        match outcome {
            Ok((chrom, mapped, rest)) => {
                match rest {
                    Some(rest) => writeln!(writer, "{}\t{}\t{}", chrom, mapped, rest)?,
                    None => writeln!(writer, "{}\t{}", chrom, mapped)?,
                }
                stats.mapped += 1;
            }
            Err(reason) => {
                writeln!(unmap_writer, "{}\tFail\t{}", trimmed, reason.as_str())?;
                match reason {
                    FailureReason::Unmapped => stats.unmapped += 1,
                    FailureReason::UnknownChrom => stats.unknown_chrom += 1,
                    FailureReason::InvalidFormat => stats.invalid += 1,
                }
            }
        }
    }

    writer.flush()?;
    unmap_writer.flush()?;
    Ok(stats)
}

/// Open a plain or gzip-compressed input file; `-` reads standard input
pub fn open_input<P: AsRef<Path>>(path: P) -> std::io::Result<Box<dyn BufRead>> {
    if path.as_ref() == Path::new("-") {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }

    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let is_gzip = reader.fill_buf()?.starts_with(&[0x1f, 0x8b]);

    if is_gzip {
        debug!("Reading gzip input {:?}", path.as_ref());
        Ok(Box::new(BufReader::new(GzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Remap a position file into `output`, with failures in `{output}.unmap`
pub fn convert_positions<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    mapper: &CoordinateMapper,
) -> Result<ConversionStats> {
    let reader = open_input(input.as_ref())?;
    let writer = BufWriter::new(File::create(output.as_ref())?);

    let unmap_path = format!("{}.unmap", output.as_ref().display());
    let unmap_writer = BufWriter::new(File::create(&unmap_path)?);

    remap_positions(reader, writer, unmap_writer, mapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MappingCache, Region, Segment, Strand};
    use crate::source::InMemorySource;

    fn mapper() -> CoordinateMapper {
        let source = InMemorySource::new()
            .with_chromosome("1", 249_000_000)
            .with_segment(Segment::new(
                "1",
                Region::new(1_000_000, 1_000_100, Strand::Plus),
                Region::new(1_064_620, 1_064_720, Strand::Plus),
            ));
        CoordinateMapper::new(&MappingCache::default(), &source, "GRCh37", "GRCh38", "human")
            .unwrap()
    }

    #[test]
    fn test_parse_position_line() {
        assert_eq!(parse_position_line("1\t100"), Ok(("1", 100, None)));
        assert_eq!(
            parse_position_line("X\t5\trs1\tA\tG"),
            Ok(("X", 5, Some("rs1\tA\tG")))
        );
        assert_eq!(parse_position_line("1"), Err(FailureReason::InvalidFormat));
        assert_eq!(parse_position_line("1\tabc"), Err(FailureReason::InvalidFormat));
        assert_eq!(parse_position_line("1\t0"), Err(FailureReason::InvalidFormat));
        assert_eq!(parse_position_line("\t7"), Err(FailureReason::InvalidFormat));
    }

    #[test]
    fn test_remap_positions() {
        let input = "#chrom\tpos\tid\n\
                     1\t1000000\tmut1\n\
                     1\t1000101\tmut2\n\
                     chrZZZ\t1\tmut3\n\
                     1\tnope\n\
                     \n\
                     chr1\t1000100\n";
        let mut out = Vec::new();
        let mut unmap = Vec::new();

        let stats = remap_positions(input.as_bytes(), &mut out, &mut unmap, &mapper()).unwrap();

        assert_eq!(
            stats,
            ConversionStats {
                total: 5,
                mapped: 2,
                unmapped: 1,
                unknown_chrom: 1,
                invalid: 1,
            }
        );
        assert_eq!(stats.failed(), 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "#chrom\tpos\tid\n1\t1064620\tmut1\nchr1\t1064720\n"
        );
        assert_eq!(
            String::from_utf8(unmap).unwrap(),
            "1\t1000101\tmut2\tFail\tUnmap\n\
             chrZZZ\t1\tmut3\tFail\tUnknownChrom\n\
             1\tnope\tFail\tInvalidFormat\n"
        );
    }

    #[test]
    fn test_unmapped_lines_go_to_unmap_writer_only() {
        let input = "#header\n1\t5\trs9\tA\tG\n1\t1000000\trs1\n";
        let mut out = Vec::new();
        let mut unmap = Vec::new();

        let stats = remap_positions(input.as_bytes(), &mut out, &mut unmap, &mapper()).unwrap();

        assert_eq!(stats.unmapped, 1);
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "#header\n1\t1064620\trs1\n");
        assert!(!out.contains("rs9"));
        assert_eq!(String::from_utf8(unmap).unwrap(), "1\t5\trs9\tA\tG\tFail\tUnmap\n");
    }

    #[test]
    fn test_convert_positions_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("positions.tsv");
        let output = dir.path().join("mapped.tsv");
        std::fs::write(&input, "1\t1000050\n1\t5\n").unwrap();

        let stats = convert_positions(&input, &output, &mapper()).unwrap();
        assert_eq!(stats.mapped, 1);
        assert_eq!(stats.unmapped, 1);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "1\t1064670\n");

        let unmap = format!("{}.unmap", output.display());
        assert_eq!(std::fs::read_to_string(unmap).unwrap(), "1\t5\tFail\tUnmap\n");
    }

    #[test]
    fn test_gzip_input() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("positions.tsv.gz");
        let mut encoder = GzEncoder::new(File::create(&input).unwrap(), Compression::default());
        encoder.write_all(b"1\t1000000\n").unwrap();
        encoder.finish().unwrap();

        let mut out = Vec::new();
        let stats = remap_positions(open_input(&input).unwrap(), &mut out, std::io::sink(), &mapper())
            .unwrap();
        assert_eq!(stats.mapped, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "1\t1064620\n");
    }
}
