//! Identifiers on the m-bit ring.
//!
//! An [`Identifier`] is a point on the identifier circle consisting of all
//! non-negative integers modulo 2^m, where m is the configured ring width.
//! Node identifiers are obtained by hashing the node's address with SHA-1
//! and reducing modulo 2^m; key identifiers are derived the same way from
//! the raw key string, so every peer maps a given key to the same point.
//!
//! The interesting operation is [`in_range`], the circular interval test
//! used by lookup, stabilization and the notify handler. Each call site
//! needs a different combination of open and closed endpoints, so both
//! inclusivity flags are explicit parameters.
//!
//! [`Identifier`]: struct.Identifier.html
//! [`in_range`]: struct.Identifier.html#method.in_range

use bigint::U256;
use ring::digest;
use std::fmt;

/// Largest supported ring width in bits.
///
/// SHA-1 yields 160 bits, so wider rings would gain nothing.
pub const MAX_RING_BITS: u8 = 160;

/// A point in the identifier space [0, 2^m)
///
/// The value is stored in a 256 bit integer; constructors reduce modulo
/// 2^m so that all arithmetic stays inside the ring.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Identifier(U256);

impl Identifier {
    /// Hashes an address or key string into the ring.
    ///
    /// This computes SHA-1 over the UTF-8 encoding of `input` and keeps
    /// the lowest `bits` bits of the digest. Every peer must use the same
    /// `bits` value for identifiers to be comparable.
    pub fn hash(input: &str, bits: u8) -> Self {
        let digest = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, input.as_bytes());

        let mut bytes = [0; 32];
        bytes[12..].copy_from_slice(digest.as_ref());

        Identifier(U256::from_big_endian(&bytes) & Self::mask(bits))
    }

    /// Parses the decimal wire encoding of an identifier.
    ///
    /// Returns `None` for anything that is not a plain decimal number
    /// small enough for the identifier space.
    pub fn from_decimal(encoded: &str) -> Option<Self> {
        if encoded.is_empty() || encoded.len() > 77 {
            return None;
        }

        let ten = U256::from(10u64);
        let mut value = U256::zero();

        for character in encoded.chars() {
            let digit = character.to_digit(10)?;
            value = value * ten + U256::from(u64::from(digit));
        }

        Some(Identifier(value))
    }

    /// Formats the identifier as the decimal string used on the wire.
    pub fn to_decimal(&self) -> String {
        if self.0.is_zero() {
            return "0".to_string();
        }

        let ten = U256::from(10u64);
        let mut remaining = self.0;
        let mut digits = Vec::new();

        while !remaining.is_zero() {
            let digit = (remaining % ten).low_u64() as u8;
            digits.push(char::from(b'0' + digit));
            remaining = remaining / ten;
        }

        digits.iter().rev().collect()
    }

    /// Returns the start of the i-th finger interval, (self + 2^i) mod 2^m.
    pub fn finger_start(&self, index: usize, bits: u8) -> Identifier {
        let (sum, _) = self.0.overflowing_add(U256::one() << index);

        Identifier(sum & Self::mask(bits))
    }

    /// Returns whether this identifier lies on the arc from `start` to
    /// `end`, walking the ring clockwise.
    ///
    /// `include_start` and `include_end` control whether the endpoints
    /// themselves belong to the arc. When `start == end` the test reduces
    /// to `include_start || include_end`; the full-ring reading of an
    /// empty arc is deliberately not used.
    ///
    /// # Examples
    ///
    /// ```
    /// # use chord::routing::identifier::Identifier;
    /// #
    /// let k = Identifier::from(5u64);
    /// let a = Identifier::from(250u64);
    /// let b = Identifier::from(10u64);
    ///
    /// assert!(k.in_range(&a, &b, false, false));
    /// assert!(!b.in_range(&a, &b, false, false));
    /// assert!(b.in_range(&a, &b, false, true));
    /// ```
    pub fn in_range(
        &self,
        start: &Identifier,
        end: &Identifier,
        include_start: bool,
        include_end: bool,
    ) -> bool {
        let key = self.0;
        let start = start.0;
        let end = end.0;

        if start == end {
            return include_start || include_end;
        }

        if start < end {
            match (include_start, include_end) {
                (true, true) => start <= key && key <= end,
                (true, false) => start <= key && key < end,
                (false, true) => start < key && key <= end,
                (false, false) => start < key && key < end,
            }
        } else {
            // the arc wraps through 2^m - 1 -> 0
            match (include_start, include_end) {
                (true, true) => key >= start || key <= end,
                (true, false) => key >= start || key < end,
                (false, true) => key > start || key <= end,
                (false, false) => key > start || key < end,
            }
        }
    }

    fn mask(bits: u8) -> U256 {
        (U256::one() << usize::from(bits)) - U256::one()
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Identifier(U256::from(value))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BITS: u8 = 4;
    const RING: u64 = 16;

    /// Naive clockwise walk from `start` to `end`, collecting the arc.
    fn oracle(key: u64, start: u64, end: u64, include_start: bool, include_end: bool) -> bool {
        if start == end {
            return include_start || include_end;
        }

        let mut arc = Vec::new();
        if include_start {
            arc.push(start);
        }

        let mut point = (start + 1) % RING;
        while point != end {
            arc.push(point);
            point = (point + 1) % RING;
        }

        if include_end {
            arc.push(end);
        }

        arc.contains(&key)
    }

    #[test]
    fn in_range_matches_clockwise_walk() {
        for start in 0..RING {
            for end in 0..RING {
                for key in 0..RING {
                    for &include_start in &[false, true] {
                        for &include_end in &[false, true] {
                            let expected = oracle(key, start, end, include_start, include_end);
                            let actual = Identifier::from(key).in_range(
                                &Identifier::from(start),
                                &Identifier::from(end),
                                include_start,
                                include_end,
                            );

                            assert_eq!(
                                expected, actual,
                                "in_range({}, {}, {}, {}, {})",
                                key, start, end, include_start, include_end
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn equal_endpoints_follow_the_tie_break() {
        let point = Identifier::from(3u64);
        let other = Identifier::from(9u64);

        assert!(!other.in_range(&point, &point, false, false));
        assert!(other.in_range(&point, &point, true, false));
        assert!(other.in_range(&point, &point, false, true));
        assert!(other.in_range(&point, &point, true, true));
    }

    #[test]
    fn hash_is_deterministic_and_reduced() {
        let first = Identifier::hash("127.0.0.1:8000", 8);
        let second = Identifier::hash("127.0.0.1:8000", 8);

        assert_eq!(first, second);
        assert!(first < Identifier::from(256u64));
    }

    #[test]
    fn hash_matches_sha1_reference_values() {
        // SHA-1 of the address string, reduced modulo 2^8
        assert_eq!(Identifier::from(67u64), Identifier::hash("127.0.0.1:40100", 8));
        assert_eq!(Identifier::from(247u64), Identifier::hash("127.0.0.1:40101", 8));
        assert_eq!(Identifier::from(124u64), Identifier::hash("127.0.0.1:40102", 8));
    }

    #[test]
    fn decimal_codec_round_trips() {
        for &value in &[0u64, 1, 9, 10, 255, 65535, u64::max_value()] {
            let identifier = Identifier::from(value);
            let decoded = Identifier::from_decimal(&identifier.to_decimal()).unwrap();
            assert_eq!(identifier, decoded);
        }

        // a value above u64, near the top of a 160 bit ring
        let top = Identifier::from(12345u64).finger_start(159, 160);
        assert_eq!(top, Identifier::from_decimal(&top.to_decimal()).unwrap());
    }

    #[test]
    fn decimal_parse_rejects_garbage() {
        assert!(Identifier::from_decimal("").is_none());
        assert!(Identifier::from_decimal("12a").is_none());
        assert!(Identifier::from_decimal("-5").is_none());
        assert!(Identifier::from_decimal(&"9".repeat(78)).is_none());
    }

    #[test]
    fn finger_starts_wrap_around() {
        let identifier = Identifier::from(250u64);

        assert_eq!(Identifier::from(251u64), identifier.finger_start(0, 8));
        assert_eq!(Identifier::from(2u64), identifier.finger_start(3, 8));
        assert_eq!(Identifier::from(122u64), identifier.finger_start(7, 8));
    }

    #[test]
    fn finger_starts_cover_all_offsets() {
        let identifier = Identifier::from(7u64);

        for index in 0..usize::from(BITS) {
            let expected = (7 + (1 << index)) % RING;
            assert_eq!(
                Identifier::from(expected),
                identifier.finger_start(index, BITS)
            );
        }
    }
}
