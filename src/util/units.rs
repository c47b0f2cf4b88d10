//! Units formatting and conversion utilities
//!
//! Size and duration parsing for the command line, plus the rate math
//! used by the report.

use byte_unit::{Byte, UnitType};
use std::time::Duration;

/// Bytes in one reported "MB" (MiB)
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Parse a size given as plain bytes or with a unit (`8MiB`, `1 GB`)
///
/// # Examples
/// ```
/// use s3_load_gen::util::units::parse_size;
///
/// assert_eq!(parse_size("1048576").unwrap(), 1048576);
/// assert_eq!(parse_size("8MiB").unwrap(), 8388608);
/// ```
pub fn parse_size(input: &str) -> Result<u64, String> {
    let input = input.trim();
    if let Ok(bytes) = input.parse::<u64>() {
        return Ok(bytes);
    }
    Byte::parse_str(input, true)
        .map(|byte| byte.as_u64())
        .map_err(|e| format!("Invalid size '{}': {}", input, e))
}

/// Parse a duration given as plain seconds or a humantime string (`90s`, `2m`)
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use s3_load_gen::util::units::parse_duration;
///
/// assert_eq!(parse_duration("60").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("1m 30s").unwrap(), Duration::from_secs(90));
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(input).map_err(|e| format!("Invalid duration '{}': {}", input, e))
}

/// Short size label using the largest fitting binary unit
///
/// # Examples
/// ```
/// use s3_load_gen::util::units::describe_size;
///
/// assert_eq!(describe_size(8 * 1024 * 1024), "8.00 MiB");
/// ```
pub fn describe_size(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{adjusted:.2}")
}

/// Format duration into human-readable string
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use s3_load_gen::util::units::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 3600 {
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if total_secs >= 60 {
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{}m {}s", minutes, seconds)
    } else if total_secs > 0 {
        if millis > 0 {
            format!("{}.{:02}s", total_secs, millis / 10)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        format!("{}ms", millis)
    }
}

/// Calculate throughput in MB/s from bytes and duration
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use s3_load_gen::util::units::calculate_throughput_mbps;
///
/// let throughput = calculate_throughput_mbps(1048576, Duration::from_secs(1));
/// assert!((throughput - 1.0).abs() < 0.01);
/// ```
pub fn calculate_throughput_mbps(bytes: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    let duration_secs = duration.as_secs_f64();
    let megabytes = bytes as f64 / BYTES_PER_MB;
    megabytes / duration_secs
}

/// Calculate operations per second
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use s3_load_gen::util::units::calculate_ops_per_second;
///
/// let ops = calculate_ops_per_second(1000, Duration::from_secs(1));
/// assert!((ops - 1000.0).abs() < 0.01);
/// ```
pub fn calculate_ops_per_second(operations: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    operations as f64 / duration.as_secs_f64()
}
