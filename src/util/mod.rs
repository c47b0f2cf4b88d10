//! Utility functions module
//!
//! Contains helper functions for units formatting and size and duration parsing.

pub mod units;

// Re-export commonly used functions
pub use units::{
    calculate_ops_per_second, calculate_throughput_mbps, describe_size, format_duration,
    parse_duration, parse_size,
};
