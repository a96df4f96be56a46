//! File format adapters
//!
//! Adapters feeding position streams through a [`CoordinateMapper`](crate::core::CoordinateMapper).

pub mod positions;

pub use positions::{
    convert_positions, open_input, parse_position_line, remap_positions,
    ConversionStats, FailureReason,
};
