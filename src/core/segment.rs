//! Assembly mapping data model
//!
//! Segments pair a region of the source assembly with the region it
//! occupies in the target assembly. Coordinates are 1-based and inclusive,
//! following the convention of the mapping service.

use serde::{Deserialize, Serialize};

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Strand {
    #[default]
    Plus,
    Minus,
}

impl Strand {
    /// Parse strand from the integer form used by the mapping service
    ///
    /// # Examples
    /// ```
    /// use asm_remap::core::Strand;
    /// assert_eq!(Strand::from_int(1), Some(Strand::Plus));
    /// assert_eq!(Strand::from_int(-1), Some(Strand::Minus));
    /// assert_eq!(Strand::from_int(0), None);
    /// ```
    pub fn from_int(value: i8) -> Option<Self> {
        match value {
            1 => Some(Strand::Plus),
            -1 => Some(Strand::Minus),
            _ => None,
        }
    }

    /// Integer form (`1` or `-1`)
    pub fn to_int(&self) -> i8 {
        match self {
            Strand::Plus => 1,
            Strand::Minus => -1,
        }
    }
}

impl TryFrom<i8> for Strand {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Strand::from_int(value).ok_or_else(|| format!("strand must be 1 or -1, got {}", value))
    }
}

impl From<Strand> for i8 {
    fn from(strand: Strand) -> Self {
        strand.to_int()
    }
}

/// A closed region `[start, end]` on one strand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

impl Region {
    pub fn new(start: u64, end: u64, strand: Strand) -> Self {
        Self { start, end, strand }
    }
}

/// One mapping record: a source-assembly region and its target-assembly counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub chromosome: String,
    pub original: Region,
    pub mapped: Region,
    /// Target sequence when it differs from `chromosome`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_chromosome: Option<String>,
}

impl Segment {
    pub fn new(chromosome: impl Into<String>, original: Region, mapped: Region) -> Self {
        Self {
            chromosome: chromosome.into(),
            original,
            mapped,
            mapped_chromosome: None,
        }
    }

    /// Segment whose mapped region lies on another sequence
    pub fn with_mapped_chromosome(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.mapped_chromosome = (name != self.chromosome).then_some(name);
        self
    }

    /// Name of the target-assembly sequence the mapped region lies on
    pub fn target_chromosome(&self) -> &str {
        self.mapped_chromosome.as_deref().unwrap_or(&self.chromosome)
    }
}

/// A chromosome of the source assembly and its length
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChromosomeInfo {
    pub name: String,
    pub length: u64,
}

impl ChromosomeInfo {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

/// Assemble a region string as `{chrom}:{start}..{end}:{strand}`
///
/// A single position is expressed by passing `None` as `end`.
///
/// # Examples
/// ```
/// use asm_remap::core::{region_string, Strand};
/// assert_eq!(region_string("X", 1000000, Some(1000100), Strand::Plus), "X:1000000..1000100:1");
/// assert_eq!(region_string("1", 42, None, Strand::Minus), "1:42..42:-1");
/// ```
pub fn region_string(chrom: &str, start: u64, end: Option<u64>, strand: Strand) -> String {
    let end = end.unwrap_or(start);
    format!("{}:{}..{}:{}", chrom, start, end, strand.to_int())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_int_conversion() {
        assert_eq!(Strand::from_int(1), Some(Strand::Plus));
        assert_eq!(Strand::from_int(-1), Some(Strand::Minus));
        assert_eq!(Strand::from_int(2), None);
        assert_eq!(Strand::Plus.to_int(), 1);
        assert_eq!(Strand::Minus.to_int(), -1);
    }

    #[test]
    fn test_strand_serde_as_integer() {
        let strand: Strand = serde_json::from_str("-1").unwrap();
        assert_eq!(strand, Strand::Minus);
        assert_eq!(serde_json::to_string(&Strand::Plus).unwrap(), "1");
        assert!(serde_json::from_str::<Strand>("0").is_err());
    }

    #[test]
    fn test_target_chromosome() {
        let region = Region::new(100, 199, Strand::Plus);
        let same = Segment::new("1", region, region);
        assert_eq!(same.target_chromosome(), "1");
        assert_eq!(same.clone().with_mapped_chromosome("1").mapped_chromosome, None);

        let moved = same.with_mapped_chromosome("21");
        assert_eq!(moved.target_chromosome(), "21");
        assert_eq!(moved.mapped_chromosome.as_deref(), Some("21"));
    }

    #[test]
    fn test_segment_serde_omits_same_chromosome() {
        let region = Region::new(1, 10, Strand::Plus);
        let json = serde_json::to_string(&Segment::new("1", region, region)).unwrap();
        assert!(!json.contains("mapped_chromosome"));

        let segment: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(segment.mapped_chromosome, None);
    }

    #[test]
    fn test_region_string() {
        assert_eq!(
            region_string("1", 1, Some(249000000), Strand::Plus),
            "1:1..249000000:1"
        );
        assert_eq!(region_string("MT", 7, None, Strand::Plus), "MT:7..7:1");
    }
}
