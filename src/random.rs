//! Random sources for hash-family generation.
//!
//! A source yields floats in `[0, 1)`. Coefficients are derived from those
//! floats as uniform integers over the full `u32` range.

use crate::config::MinHashError;

/// `2^32` as a float, the width of the coefficient range.
const U32_SPAN: f64 = 4_294_967_296.0;

/// Uniform random source producing values in `[0, 1)`.
///
/// Implemented for any `FnMut() -> f64` closure, so a plain function can be
/// plugged in the same way as [`SeededSource`].
pub trait RandomSource {
    /// Next value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl<F> RandomSource for F
where
    F: FnMut() -> f64,
{
    fn next_unit(&mut self) -> f64 {
        self()
    }
}

/// Random source backed by [`fastrand::Rng`].
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: fastrand::Rng,
}

impl SeededSource {
    /// Deterministic source for the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Source seeded from process entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(seed),
            None => Self::from_entropy(),
        }
    }
}

impl RandomSource for SeededSource {
    fn next_unit(&mut self) -> f64 {
        self.rng.f64()
    }
}

/// Draw a uniform integer in `[0, 2^32 - 1]`.
///
/// Values outside `[0, 1)`, including NaN, are rejected.
pub fn uniform_u32<R>(source: &mut R) -> Result<u32, MinHashError>
where
    R: RandomSource + ?Sized,
{
    let value = source.next_unit();
    if !(0.0..1.0).contains(&value) {
        return Err(MinHashError::InvalidRandomValue { value });
    }
    // value < 1.0, so the product is strictly below 2^32 and truncation is floor.
    Ok((value * U32_SPAN) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_a_source() {
        let mut source = || 0.5;
        assert_eq!(uniform_u32(&mut source).unwrap(), 1u32 << 31);
    }

    #[test]
    fn range_ends_map_to_u32_ends() {
        let mut zero = || 0.0;
        assert_eq!(uniform_u32(&mut zero).unwrap(), 0);

        let mut top = || 1.0 - f64::EPSILON / 2.0;
        assert_eq!(uniform_u32(&mut top).unwrap(), u32::MAX);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for bad in [1.0, -0.1, 2.5, f64::NAN, f64::INFINITY] {
            let mut source = move || bad;
            assert!(matches!(
                uniform_u32(&mut source),
                Err(MinHashError::InvalidRandomValue { .. })
            ));
        }
    }

    #[test]
    fn seeded_source_is_deterministic() {
        let mut a = SeededSource::new(42);
        let mut b = SeededSource::new(42);
        for _ in 0..64 {
            assert_eq!(
                uniform_u32(&mut a).unwrap(),
                uniform_u32(&mut b).unwrap()
            );
        }
    }

    #[test]
    fn seeded_source_stays_in_unit_interval() {
        let mut source = SeededSource::new(7);
        for _ in 0..1000 {
            let v = source.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededSource::new(1);
        let mut b = SeededSource::new(2);
        let xs: Vec<u32> = (0..8).map(|_| uniform_u32(&mut a).unwrap()).collect();
        let ys: Vec<u32> = (0..8).map(|_| uniform_u32(&mut b).unwrap()).collect();
        assert_ne!(xs, ys);
    }
}
