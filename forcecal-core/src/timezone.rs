//! IANA timezone conversion with DST awareness.
//!
//! Wall-clock times only pin down an instant together with a zone, and the
//! mapping is not total: during a DST spring-forward some local times don't
//! exist, and during fall-back some occur twice. The conversions here resolve
//! both cases deterministically so callers never have to branch on them.

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};

use crate::error::{ForceCalError, ForceCalResult};

pub use chrono_tz::Tz;

/// Resolve an IANA timezone name ("America/New_York") to a zone handle.
pub fn parse_tz(name: &str) -> ForceCalResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ForceCalError::Timezone(format!("Unknown IANA timezone '{}'", name)))
}

/// Detect the host timezone, falling back to UTC when detection fails.
pub fn system_tz() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC)
}

/// Convert a wall-clock time in `tz` to the UTC instant it names.
///
/// Ambiguous times (fall-back overlap) resolve to the earlier instant.
/// Nonexistent times (spring-forward gap) resolve to the first valid
/// wall-clock time after the gap.
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> ForceCalResult<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
        LocalResult::None => {
            // DST gaps are at most an hour (half an hour in a few zones), so
            // probing forward in 30-minute steps finds the far edge quickly.
            let mut probe = naive;
            for _ in 0..4 {
                probe += Duration::minutes(30);
                if let LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) =
                    tz.from_local_datetime(&probe)
                {
                    return Ok(dt.with_timezone(&Utc));
                }
            }
            Err(ForceCalError::Timezone(format!(
                "No valid instant for {} in {}",
                naive, tz
            )))
        }
    }
}

/// Convert a UTC instant to the wall-clock time it has in `tz`.
pub fn utc_to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Convert a wall-clock time from one zone to another.
pub fn convert(naive: NaiveDateTime, from: Tz, to: Tz) -> ForceCalResult<NaiveDateTime> {
    Ok(utc_to_local(local_to_utc(naive, from)?, to))
}

/// The zone's UTC offset at a given instant (differs across DST transitions).
pub fn utc_offset(tz: Tz, at: DateTime<Utc>) -> FixedOffset {
    at.with_timezone(&tz).offset().fix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_tz_rejects_unknown_zone() {
        assert!(parse_tz("America/New_York").is_ok());
        let err = parse_tz("Mars/Olympus_Mons").unwrap_err();
        assert!(
            err.to_string().contains("Mars/Olympus_Mons"),
            "Error should name the bad zone, got: {}",
            err
        );
    }

    #[test]
    fn test_offset_changes_across_dst_transition() {
        let tz = parse_tz("America/New_York").unwrap();

        // January: EST (-05:00)
        let winter = naive(2024, 1, 15, 12, 0).and_utc();
        assert_eq!(utc_offset(tz, winter).local_minus_utc(), -5 * 3600);

        // July: EDT (-04:00)
        let summer = naive(2024, 7, 15, 12, 0).and_utc();
        assert_eq!(utc_offset(tz, summer).local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_ambiguous_local_time_resolves_to_earlier_instant() {
        let tz = parse_tz("America/New_York").unwrap();

        // 2024-11-03 01:30 happens twice (EDT then EST after fall-back).
        let utc = local_to_utc(naive(2024, 11, 3, 1, 30), tz).unwrap();

        // Earlier occurrence is still EDT (-04:00): 05:30 UTC.
        assert_eq!(utc, naive(2024, 11, 3, 5, 30).and_utc());
    }

    #[test]
    fn test_nonexistent_local_time_resolves_past_gap() {
        let tz = parse_tz("America/New_York").unwrap();

        // 2024-03-10 02:30 does not exist (clocks jump 02:00 -> 03:00).
        let utc = local_to_utc(naive(2024, 3, 10, 2, 30), tz).unwrap();

        // First valid wall-clock after the gap is 03:00 EDT = 07:00 UTC.
        assert_eq!(utc, naive(2024, 3, 10, 7, 0).and_utc());
    }

    #[test]
    fn test_roundtrip_for_unambiguous_time() {
        let tz = parse_tz("Europe/Stockholm").unwrap();
        let local = naive(2024, 5, 17, 9, 45);

        let utc = local_to_utc(local, tz).unwrap();
        assert_eq!(utc_to_local(utc, tz), local);
    }

    #[test]
    fn test_convert_between_zones() {
        let ny = parse_tz("America/New_York").unwrap();
        let la = parse_tz("America/Los_Angeles").unwrap();

        // Both on daylight time in July: 3 hours apart.
        let converted = convert(naive(2024, 7, 1, 15, 0), ny, la).unwrap();
        assert_eq!(converted, naive(2024, 7, 1, 12, 0));
    }

    #[test]
    fn test_system_tz_never_panics() {
        // Whatever the host reports, we get a usable zone back.
        let _ = system_tz();
    }
}
