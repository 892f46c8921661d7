//! .NET-compatible timestamp record
//!
//! Plugins report their creation date as a pointer to a 64-bit `DateTime`
//! value in the .NET layout: the low 62 bits count 100 ns ticks since
//! 0001-01-01T00:00:00, the top 2 bits carry the kind.

use crate::errors::AbiError;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};

const TICKS_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;
const KIND_SHIFT: u32 = 62;

/// Ticks per second (one tick is 100 ns)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Tick count of 1970-01-01T00:00:00
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Largest valid tick count (9999-12-31T23:59:59.9999999)
pub const MAX_TICKS: u64 = 3_155_378_975_999_999_999;

/// How the wall-clock ticks relate to UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeKind {
    Unspecified = 0,
    Utc = 1,
    Local = 2,
}

/// Raw `DateTime` value as laid out by the host runtime
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeDateTime {
    pub data: u64,
}

impl NativeDateTime {
    pub const fn from_parts(ticks: u64, kind: DateTimeKind) -> Self {
        Self {
            data: (ticks & TICKS_MASK) | ((kind as u64) << KIND_SHIFT),
        }
    }

    /// Build a record from whole seconds since the Unix epoch
    pub const fn from_unix_seconds(secs: i64, kind: DateTimeKind) -> Self {
        let ticks = UNIX_EPOCH_TICKS + secs * TICKS_PER_SECOND;
        Self::from_parts(ticks as u64, kind)
    }

    /// Build a UTC record from a chrono timestamp
    #[cfg(test)]
    pub fn from_utc(value: DateTime<Utc>) -> Self {
        let ticks = UNIX_EPOCH_TICKS
            + value.timestamp() * TICKS_PER_SECOND
            + i64::from(value.timestamp_subsec_nanos() / 100);
        Self::from_parts(ticks as u64, DateTimeKind::Utc)
    }

    pub fn ticks(&self) -> u64 {
        self.data & TICKS_MASK
    }

    /// Kind bits; the host's internal "ambiguous local" marker (3) reads as local
    pub fn kind(&self) -> DateTimeKind {
        match self.data >> KIND_SHIFT {
            0 => DateTimeKind::Unspecified,
            1 => DateTimeKind::Utc,
            _ => DateTimeKind::Local,
        }
    }

    /// Wall-clock value without any zone information
    pub fn to_naive(&self) -> Result<NaiveDateTime, AbiError> {
        let ticks = self.ticks();
        if ticks > MAX_TICKS {
            return Err(AbiError::TicksOutOfRange(ticks));
        }

        let since_epoch = ticks as i64 - UNIX_EPOCH_TICKS;
        let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
        let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * 100) as u32;

        DateTime::from_timestamp(secs, nanos)
            .map(|dt| dt.naive_utc())
            .ok_or(AbiError::TicksOutOfRange(ticks))
    }

    /// Offset-carrying timestamp
    ///
    /// UTC values get `+00:00`. Local and unspecified values are interpreted
    /// in the host time zone and keep the offset in effect at that instant.
    pub fn to_fixed_offset(&self) -> Result<DateTime<FixedOffset>, AbiError> {
        let naive = self.to_naive()?;
        match self.kind() {
            DateTimeKind::Utc => Ok(Utc.from_utc_datetime(&naive).fixed_offset()),
            DateTimeKind::Local | DateTimeKind::Unspecified => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset())
                .ok_or_else(|| AbiError::NonexistentLocalTime(naive.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unix_epoch() {
        let value = NativeDateTime::from_unix_seconds(0, DateTimeKind::Utc);
        assert_eq!(value.ticks(), UNIX_EPOCH_TICKS as u64);
        assert_eq!(value.kind(), DateTimeKind::Utc);

        let converted = value.to_fixed_offset().expect("epoch converts");
        assert_eq!(converted.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_known_instant() {
        let value = NativeDateTime::from_parts(638_501_616_000_000_000, DateTimeKind::Utc);
        let converted = value.to_fixed_offset().expect("valid ticks");
        assert_eq!(converted.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_kind_bits() {
        let local = NativeDateTime::from_parts(0, DateTimeKind::Local);
        assert_eq!(local.kind(), DateTimeKind::Local);
        assert_eq!(local.ticks(), 0);

        let ambiguous = NativeDateTime { data: 3 << 62 };
        assert_eq!(ambiguous.kind(), DateTimeKind::Local);
    }

    #[test]
    fn test_ticks_out_of_range() {
        let value = NativeDateTime::from_parts(MAX_TICKS + 1, DateTimeKind::Utc);
        assert_eq!(
            value.to_naive(),
            Err(AbiError::TicksOutOfRange(MAX_TICKS + 1))
        );
    }

    #[test]
    fn test_local_kind_keeps_wall_clock() {
        let value = NativeDateTime::from_unix_seconds(1_714_564_800, DateTimeKind::Local);
        let converted = value.to_fixed_offset().expect("valid local time");
        assert_eq!(
            converted.naive_local(),
            value.to_naive().expect("valid ticks")
        );
    }

    proptest! {
        #[test]
        fn test_from_utc_round_trip(secs in 0i64..4_000_000_000, hundreds in 0u32..10_000_000) {
            let original = DateTime::from_timestamp(secs, hundreds * 100).expect("in range");
            let record = NativeDateTime::from_utc(original);
            let back = record.to_fixed_offset().expect("valid ticks");
            prop_assert_eq!(back, original.fixed_offset());
        }
    }
}
