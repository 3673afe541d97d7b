//! LSN parsing/formatting and WAL segment filename computation (§4.4,
//! §4.6 "file rotation"). LSNs are printed as two uppercase-hex halves
//! separated by `/`, matching the wire format logical decoding already uses;
//! segment filenames follow Postgres's standard 24-hex-digit naming scheme.

use crate::error::{Result, TransformError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lsn(pub u64);

impl Lsn {
    pub fn parse(s: &str) -> Result<Self> {
        let (hi, lo) = s
            .split_once('/')
            .ok_or_else(|| TransformError::Parse(format!("malformed lsn: {s}")))?;
        let hi = u32::from_str_radix(hi, 16).map_err(|_| TransformError::Parse(format!("malformed lsn: {s}")))?;
        let lo = u32::from_str_radix(lo, 16).map_err(|_| TransformError::Parse(format!("malformed lsn: {s}")))?;
        Ok(Lsn(((hi as u64) << 32) | lo as u64))
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:08X}", self.0 >> 32, self.0 & 0xFFFF_FFFF)
    }
}

impl TryFrom<String> for Lsn {
    type Error = TransformError;
    fn try_from(s: String) -> Result<Self> {
        Lsn::parse(&s)
    }
}

impl From<Lsn> for String {
    fn from(lsn: Lsn) -> String {
        lsn.to_string()
    }
}

/// `XLogSegmentsPerXLogId` for a given WAL segment size: how many segments
/// fit in one 32-bit "log" unit of LSN space.
fn segments_per_xlogid(wal_seg_size: u64) -> u64 {
    0x1_0000_0000u64 / wal_seg_size
}

/// Computes the standard Postgres WAL segment filename for `lsn` under the
/// given `timeline` and `wal_seg_size`, e.g. `00000001000000000000000A`.
pub fn wal_segment_name(timeline: u32, wal_seg_size: u64, lsn: Lsn) -> Result<String> {
    if wal_seg_size == 0 || !wal_seg_size.is_power_of_two() {
        return Err(TransformError::Rotation(format!("invalid wal segment size: {wal_seg_size}")));
    }
    let seg_no = lsn.0 / wal_seg_size;
    let per_id = segments_per_xlogid(wal_seg_size);
    let log = seg_no / per_id;
    let seg = seg_no % per_id;
    Ok(format!("{timeline:08X}{log:08X}{seg:08X}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display() {
        let lsn = Lsn::parse("16/B374D848").unwrap();
        assert_eq!(lsn.to_string(), "16/B374D848");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Lsn::parse("not-an-lsn").is_err());
    }

    #[test]
    fn segment_name_matches_standard_scheme() {
        // 16MiB segments, timeline 1, lsn 0/A00 -> segment 0 of log 0.
        let name = wal_segment_name(1, 16 * 1024 * 1024, Lsn::parse("0/A00").unwrap()).unwrap();
        assert_eq!(name, "000000010000000000000000");
    }

    #[test]
    fn segment_name_advances_across_log_boundary() {
        // one full "log" worth of 16MiB segments is 256 segments -> 4GiB.
        let lsn = Lsn(0x1_0000_0000);
        let name = wal_segment_name(1, 16 * 1024 * 1024, lsn).unwrap();
        assert_eq!(name, "000000010000000100000000");
    }
}
