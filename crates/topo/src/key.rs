//! Key range helpers
//!
//! Shards partition a keyspace into half-open byte-string intervals
//! `[start, end)`. An empty `start` means unbounded below, an empty `end`
//! means unbounded above. Range boundaries travel as hex strings inside
//! shard names.

use proto::KeyRange;

use crate::errors::TopoError;

/// Parse the two hex sides of a range shard name into a key range.
pub fn parse_key_range_parts(start: &str, end: &str) -> Result<KeyRange, TopoError> {
    let start = hex::decode(start)
        .map_err(|err| TopoError::InvalidArgument(format!("invalid hex key {start}: {err}")))?;
    let end = hex::decode(end)
        .map_err(|err| TopoError::InvalidArgument(format!("invalid hex key {end}: {err}")))?;
    Ok(KeyRange { start, end })
}

/// Canonical `start-end` form of a range, both sides hex. The inverse of
/// [`parse_key_range_parts`] over a `-`-split name.
pub fn key_range_string(key_range: &KeyRange) -> String {
    format!("{}-{}", hex::encode(&key_range.start), hex::encode(&key_range.end))
}

/// Whether two ranges overlap. Lexicographic byte comparison, with an
/// empty `end` standing in for plus infinity.
pub fn key_ranges_intersect(first: &KeyRange, second: &KeyRange) -> bool {
    (first.end.is_empty() || second.start < first.end)
        && (second.end.is_empty() || first.start < second.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> KeyRange {
        let (start, end) = name.split_once('-').unwrap();
        parse_key_range_parts(start, end).unwrap()
    }

    #[test]
    fn test_parse_unbounded_sides() {
        let below = parse("-80");
        assert!(below.start.is_empty());
        assert_eq!(below.end, vec![0x80]);

        let above = parse("80-");
        assert_eq!(above.start, vec![0x80]);
        assert!(above.end.is_empty());
    }

    #[test]
    fn test_round_trip() {
        for name in ["-80", "80-", "40-c0", "-", "dead-beef00"] {
            assert_eq!(key_range_string(&parse(name)), name);
        }
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(parse_key_range_parts("zz", "80").is_err());
        assert!(parse_key_range_parts("80", "8").is_err());
    }

    #[test]
    fn test_intersection() {
        let low = parse("-80");
        let high = parse("80-");
        let mid = parse("40-c0");
        let all = parse("-");

        assert!(!key_ranges_intersect(&low, &high));
        assert!(key_ranges_intersect(&mid, &low));
        assert!(key_ranges_intersect(&mid, &high));
        assert!(key_ranges_intersect(&all, &low));
        assert!(key_ranges_intersect(&all, &high));
        // "0-" intersects "-80" because 0x00 < 0x80.
        assert!(key_ranges_intersect(&parse("00-"), &low));
    }
}
