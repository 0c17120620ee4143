//! Configuration and error types for MinHash signature generation.
//!
//! The configuration is plain data with no I/O or environment-dependent
//! behavior. The only source of nondeterminism is an unseeded random source,
//! which is selected by leaving [`MinHashConfig::seed`] unset.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of hash functions (and signature slots).
pub const DEFAULT_HASH_COUNT: usize = 128;

/// Default number of draws allowed per requested coefficient.
pub const DEFAULT_DRAW_BUDGET: usize = 16;

/// Configuration for building a [`crate::MinHasher`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinHashConfig {
    /// Configuration schema version.
    ///
    /// Bump whenever a change can affect the produced signatures, so stored
    /// signatures stay comparable only with signatures of the same version.
    pub version: u32,
    /// Number of universal hash functions, equal to the signature length.
    pub hash_count: usize,
    /// Seed for the coefficient random source.
    ///
    /// Two hashers built from configs with the same seed and `hash_count`
    /// produce bit-identical signatures. `None` seeds from process entropy.
    pub seed: Option<u64>,
    /// Draws allowed per requested coefficient before giving up.
    ///
    /// Generating `hash_count` distinct coefficients may take at most
    /// `hash_count * draw_budget` draws for each coefficient set.
    pub draw_budget: usize,
}

impl MinHashConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of hash functions. Typical values: 64-512.
    /// More hashes = lower estimator variance, slower signatures.
    pub fn with_hash_count(mut self, hash_count: usize) -> Self {
        self.hash_count = hash_count;
        self
    }

    /// Set a fixed seed for reproducible hash families.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed from process entropy instead of a fixed seed.
    pub fn with_entropy_seed(mut self) -> Self {
        self.seed = None;
        self
    }

    /// Set the per-coefficient draw budget.
    pub fn with_draw_budget(mut self, draw_budget: usize) -> Self {
        self.draw_budget = draw_budget;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), MinHashError> {
        if self.version < 1 {
            return Err(MinHashError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.hash_count < 1 {
            return Err(MinHashError::InvalidHashCount {
                hash_count: self.hash_count,
            });
        }
        if self.draw_budget < 1 {
            return Err(MinHashError::InvalidDrawBudget {
                draw_budget: self.draw_budget,
            });
        }
        Ok(())
    }

    /// Maximum draws allowed per coefficient set.
    pub(crate) fn max_draws(&self) -> usize {
        self.hash_count.saturating_mul(self.draw_budget)
    }
}

impl Default for MinHashConfig {
    fn default() -> Self {
        Self {
            version: 1,
            hash_count: DEFAULT_HASH_COUNT,
            seed: None,
            draw_budget: DEFAULT_DRAW_BUDGET,
        }
    }
}

/// Which coefficient set of a hash family a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoefficientSet {
    /// Multipliers `a_i`.
    A,
    /// Offsets `b_i`.
    B,
}

impl std::fmt::Display for CoefficientSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoefficientSet::A => f.write_str("a"),
            CoefficientSet::B => f.write_str("b"),
        }
    }
}

/// Errors returned while building hash families or comparing signatures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MinHashError {
    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },

    #[error("invalid config: hash_count must be >= 1 (got {hash_count})")]
    InvalidHashCount { hash_count: usize },

    #[error("invalid config: draw_budget must be >= 1 (got {draw_budget})")]
    InvalidDrawBudget { draw_budget: usize },

    #[error(
        "random source exhausted: found {found} of {wanted} distinct {which} coefficients after {draws} draws"
    )]
    CoefficientsExhausted {
        which: CoefficientSet,
        wanted: usize,
        found: usize,
        draws: usize,
    },

    #[error("random source returned {value}; expected a value in [0, 1)")]
    InvalidRandomValue { value: f64 },

    #[error("coefficient sets differ in length: a has {a}, b has {b}")]
    MismatchedCoefficients { a: usize, b: usize },

    #[error("duplicate {which} coefficient {value}")]
    DuplicateCoefficient { which: CoefficientSet, value: u32 },

    #[error("signature length mismatch: {left} vs {right}")]
    SignatureLengthMismatch { left: usize, right: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = MinHashConfig::default();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.hash_count, 128);
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.draw_budget, 16);
    }

    #[test]
    fn config_builder_chain() {
        let cfg = MinHashConfig::new()
            .with_hash_count(64)
            .with_seed(7)
            .with_draw_budget(4);

        assert_eq!(cfg.hash_count, 64);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.draw_budget, 4);
        assert_eq!(cfg.max_draws(), 256);

        let cfg = cfg.with_entropy_seed();
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn config_validate_valid() {
        assert!(MinHashConfig::default().validate().is_ok());
    }

    #[test]
    fn config_validate_rejects_zero_hash_count() {
        let cfg = MinHashConfig::new().with_hash_count(0);
        assert!(matches!(
            cfg.validate(),
            Err(MinHashError::InvalidHashCount { hash_count: 0 })
        ));
    }

    #[test]
    fn config_validate_rejects_zero_draw_budget() {
        let cfg = MinHashConfig::new().with_draw_budget(0);
        assert!(matches!(
            cfg.validate(),
            Err(MinHashError::InvalidDrawBudget { draw_budget: 0 })
        ));
    }

    #[test]
    fn config_validate_rejects_version_zero() {
        let cfg = MinHashConfig {
            version: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(MinHashError::InvalidConfigVersion { version: 0 })
        ));
    }

    #[test]
    fn max_draws_saturates() {
        let cfg = MinHashConfig::new()
            .with_hash_count(usize::MAX)
            .with_draw_budget(2);
        assert_eq!(cfg.max_draws(), usize::MAX);
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = MinHashConfig::new().with_hash_count(32).with_seed(99);
        let serialized = serde_json::to_string(&cfg).unwrap();
        let deserialized: MinHashConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn error_display_exhausted() {
        let err = MinHashError::CoefficientsExhausted {
            which: CoefficientSet::B,
            wanted: 8,
            found: 1,
            draws: 128,
        };
        let msg = err.to_string();
        assert!(msg.contains("random source exhausted"));
        assert!(msg.contains("1 of 8 distinct b coefficients"));
        assert!(msg.contains("128 draws"));
    }

    #[test]
    fn error_display_invalid_hash_count() {
        let err = MinHashError::InvalidHashCount { hash_count: 0 };
        assert!(err.to_string().contains("hash_count must be >= 1"));
    }
}
