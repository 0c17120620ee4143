//! Universal hash families `h_i(x) = (a_i * x + b_i) mod P`.
//!
//! Coefficients are drawn uniformly from the `u32` range. Within each
//! coefficient set values are distinct; the two sets are checked
//! independently, so `a_i == b_j` is allowed.
//!
//! Generation draws until enough distinct values are seen. A source whose
//! effective range is smaller than the requested count would never finish,
//! so the number of draws is capped by [`MinHashConfig::draw_budget`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{CoefficientSet, MinHashConfig, MinHashError};
use crate::random::{uniform_u32, RandomSource};

/// First prime above `2^32`.
pub const NEXT_PRIME: u64 = 4_294_967_311;

/// Immutable set of `(a_i, b_i)` coefficient pairs.
///
/// Deserialization goes through [`HashFamily::from_coefficients`], so a
/// restored family holds the same invariants as a generated one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFamily")]
pub struct HashFamily {
    a: Vec<u32>,
    b: Vec<u32>,
}

/// Unchecked wire form of [`HashFamily`].
#[derive(Deserialize)]
struct RawFamily {
    a: Vec<u32>,
    b: Vec<u32>,
}

impl TryFrom<RawFamily> for HashFamily {
    type Error = MinHashError;

    fn try_from(raw: RawFamily) -> Result<Self, Self::Error> {
        Self::from_coefficients(raw.a, raw.b)
    }
}

impl HashFamily {
    /// Draw a fresh family of `config.hash_count` functions from `source`.
    pub fn generate<R>(config: &MinHashConfig, source: &mut R) -> Result<Self, MinHashError>
    where
        R: RandomSource + ?Sized,
    {
        config.validate()?;

        let max_draws = config.max_draws();
        let (a, draws_a) =
            draw_distinct(config.hash_count, max_draws, CoefficientSet::A, source)?;
        let (b, draws_b) =
            draw_distinct(config.hash_count, max_draws, CoefficientSet::B, source)?;

        debug!(
            hash_count = config.hash_count,
            draws_a, draws_b, "hash_family_generated"
        );

        Ok(Self { a, b })
    }

    /// Build a family from explicit coefficients.
    ///
    /// Both sets must have the same non-zero length and hold distinct values.
    pub fn from_coefficients(a: Vec<u32>, b: Vec<u32>) -> Result<Self, MinHashError> {
        if a.len() != b.len() {
            return Err(MinHashError::MismatchedCoefficients {
                a: a.len(),
                b: b.len(),
            });
        }
        if a.is_empty() {
            return Err(MinHashError::InvalidHashCount { hash_count: 0 });
        }
        check_distinct(&a, CoefficientSet::A)?;
        check_distinct(&b, CoefficientSet::B)?;
        Ok(Self { a, b })
    }

    /// Number of hash functions.
    pub fn len(&self) -> usize {
        self.a.len()
    }

    /// Always `false` for a constructed family.
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Multipliers `a_i`.
    pub fn a(&self) -> &[u32] {
        &self.a
    }

    /// Offsets `b_i`.
    pub fn b(&self) -> &[u32] {
        &self.b
    }

    /// Evaluate `h_i(token)`.
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    pub fn hash(&self, i: usize, token: u32) -> u64 {
        universal_hash(self.a[i], self.b[i], token)
    }

    /// Iterate coefficient pairs in slot order.
    pub(crate) fn pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.a.iter().copied().zip(self.b.iter().copied())
    }
}

/// `(a * x + b) mod NEXT_PRIME`, evaluated in `u64`.
///
/// With every operand below `2^32` the sum is at most `2^64 - 2^32`, so it
/// never wraps. Narrowing any operand product to 32 bits before the
/// reduction gives wrong results.
#[inline]
pub fn universal_hash(a: u32, b: u32, x: u32) -> u64 {
    (u64::from(a) * u64::from(x) + u64::from(b)) % NEXT_PRIME
}

fn draw_distinct<R>(
    wanted: usize,
    max_draws: usize,
    which: CoefficientSet,
    source: &mut R,
) -> Result<(Vec<u32>, usize), MinHashError>
where
    R: RandomSource + ?Sized,
{
    let mut seen = HashSet::with_capacity(wanted);
    let mut values = Vec::with_capacity(wanted);
    let mut draws = 0usize;

    while values.len() < wanted {
        if draws >= max_draws {
            warn!(
                coefficient = %which,
                wanted,
                found = values.len(),
                draws,
                "hash_family_draw_budget_exhausted"
            );
            return Err(MinHashError::CoefficientsExhausted {
                which,
                wanted,
                found: values.len(),
                draws,
            });
        }
        let value = uniform_u32(source)?;
        draws += 1;
        if seen.insert(value) {
            values.push(value);
        }
    }

    Ok((values, draws))
}

fn check_distinct(values: &[u32], which: CoefficientSet) -> Result<(), MinHashError> {
    let mut seen = HashSet::with_capacity(values.len());
    for &value in values {
        if !seen.insert(value) {
            return Err(MinHashError::DuplicateCoefficient { which, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededSource;

    fn seeded(hash_count: usize, seed: u64) -> HashFamily {
        let cfg = MinHashConfig::new().with_hash_count(hash_count);
        HashFamily::generate(&cfg, &mut SeededSource::new(seed)).unwrap()
    }

    #[test]
    fn generate_produces_requested_count() {
        for n in [1, 4, 128, 500] {
            let family = seeded(n, 3);
            assert_eq!(family.len(), n);
            assert_eq!(family.a().len(), n);
            assert_eq!(family.b().len(), n);
        }
    }

    #[test]
    fn generated_coefficients_are_distinct_per_set() {
        let family = seeded(1024, 11);
        let a: HashSet<u32> = family.a().iter().copied().collect();
        let b: HashSet<u32> = family.b().iter().copied().collect();
        assert_eq!(a.len(), 1024);
        assert_eq!(b.len(), 1024);
    }

    #[test]
    fn same_seed_same_family() {
        assert_eq!(seeded(64, 5), seeded(64, 5));
        assert_ne!(seeded(64, 5), seeded(64, 6));
    }

    #[test]
    fn degenerate_source_hits_draw_budget() {
        let cfg = MinHashConfig::new().with_hash_count(4).with_draw_budget(8);
        let mut constant = || 0.25;
        let err = HashFamily::generate(&cfg, &mut constant).unwrap_err();
        assert_eq!(
            err,
            MinHashError::CoefficientsExhausted {
                which: CoefficientSet::A,
                wanted: 4,
                found: 1,
                draws: 32,
            }
        );
    }

    #[test]
    fn narrow_source_exhausts_draw_budget() {
        // Only four distinct values ever come out of this source.
        let mut i = 0u32;
        let mut cycle = move || {
            i = (i + 1) % 4;
            f64::from(i) / 4.0
        };
        let cfg = MinHashConfig::new().with_hash_count(4).with_draw_budget(2);
        let family = HashFamily::generate(&cfg, &mut cycle).unwrap();
        assert_eq!(family.len(), 4);

        let cfg = MinHashConfig::new().with_hash_count(5).with_draw_budget(2);
        let err = HashFamily::generate(&cfg, &mut cycle).unwrap_err();
        assert!(matches!(
            err,
            MinHashError::CoefficientsExhausted {
                which: CoefficientSet::A,
                wanted: 5,
                found: 4,
                draws: 10,
            }
        ));
    }

    #[test]
    fn invalid_random_value_propagates() {
        let cfg = MinHashConfig::new().with_hash_count(2);
        let mut broken = || f64::NAN;
        assert!(matches!(
            HashFamily::generate(&cfg, &mut broken),
            Err(MinHashError::InvalidRandomValue { .. })
        ));
    }

    #[test]
    fn generate_validates_config() {
        let cfg = MinHashConfig::new().with_hash_count(0);
        assert!(matches!(
            HashFamily::generate(&cfg, &mut SeededSource::new(1)),
            Err(MinHashError::InvalidHashCount { hash_count: 0 })
        ));
    }

    #[test]
    fn from_coefficients_checks_invariants() {
        assert!(HashFamily::from_coefficients(vec![1, 2], vec![1, 2]).is_ok());

        assert_eq!(
            HashFamily::from_coefficients(vec![1, 2], vec![3]),
            Err(MinHashError::MismatchedCoefficients { a: 2, b: 1 })
        );
        assert_eq!(
            HashFamily::from_coefficients(vec![], vec![]),
            Err(MinHashError::InvalidHashCount { hash_count: 0 })
        );
        assert_eq!(
            HashFamily::from_coefficients(vec![9, 9], vec![1, 2]),
            Err(MinHashError::DuplicateCoefficient {
                which: CoefficientSet::A,
                value: 9
            })
        );
        assert_eq!(
            HashFamily::from_coefficients(vec![1, 2], vec![4, 4]),
            Err(MinHashError::DuplicateCoefficient {
                which: CoefficientSet::B,
                value: 4
            })
        );
    }

    #[test]
    fn universal_hash_small_values() {
        assert_eq!(universal_hash(3, 5, 7), 26);
        assert_eq!(universal_hash(0, 0, u32::MAX), 0);

        let family = HashFamily::from_coefficients(vec![3, 4], vec![5, 6]).unwrap();
        assert_eq!(family.hash(0, 7), 26);
        assert_eq!(family.hash(1, 7), 34);
    }

    #[test]
    fn universal_hash_matches_wide_reference_at_extremes() {
        let cases = [
            (u32::MAX, u32::MAX, u32::MAX),
            (u32::MAX, 0, u32::MAX),
            (u32::MAX - 1, 17, u32::MAX - 3),
            (1 << 31, u32::MAX, 1 << 31),
            (0x9E37_79B9, 0x7F4A_7C15, 0xDEAD_BEEF),
        ];
        for (a, b, x) in cases {
            let reference =
                (u128::from(a) * u128::from(x) + u128::from(b)) % u128::from(NEXT_PRIME);
            assert_eq!(u128::from(universal_hash(a, b, x)), reference);
            assert!(universal_hash(a, b, x) < NEXT_PRIME);
        }
    }

    #[test]
    fn universal_hash_differs_from_narrow_arithmetic() {
        let (a, b, x) = (u32::MAX, 0u32, 2u32);
        let narrow = u64::from(a.wrapping_mul(x).wrapping_add(b)) % NEXT_PRIME;
        assert_ne!(universal_hash(a, b, x), narrow);
        assert_eq!(universal_hash(a, b, x), 2 * u64::from(u32::MAX) - NEXT_PRIME);
    }

    #[test]
    fn family_serde_roundtrip() {
        let family = seeded(16, 21);
        let json = serde_json::to_string(&family).unwrap();
        let back: HashFamily = serde_json::from_str(&json).unwrap();
        assert_eq!(family, back);
    }

    #[test]
    fn deserialize_rejects_mismatched_lengths() {
        let err = serde_json::from_str::<HashFamily>(r#"{"a":[1,1,2],"b":[5]}"#).unwrap_err();
        assert!(err.to_string().contains("a has 3, b has 1"), "{err}");
    }

    #[test]
    fn deserialize_rejects_empty_family() {
        assert!(serde_json::from_str::<HashFamily>(r#"{"a":[],"b":[]}"#).is_err());
    }

    #[test]
    fn deserialize_rejects_duplicate_coefficients() {
        assert!(serde_json::from_str::<HashFamily>(r#"{"a":[7,7],"b":[1,2]}"#).is_err());
        assert!(serde_json::from_str::<HashFamily>(r#"{"a":[1,2],"b":[3,3]}"#).is_err());

        let family: HashFamily = serde_json::from_str(r#"{"a":[3,4],"b":[5,6]}"#).unwrap();
        assert_eq!(family, HashFamily::from_coefficients(vec![3, 4], vec![5, 6]).unwrap());
    }
}
