//! Algebraic properties a caller asserts about a combine function.
//!
//! The options are a contract, not something we can verify: a combine that
//! is not associative cannot be split into per-partition partials and
//! re-combined, so the parallel inlined pattern refuses to run it.

use serde::{Deserialize, Serialize};

use partix_core::error::{Error, Result};

const ASSOCIATIVE: u32 = 0b01;
const COMMUTATIVE: u32 = 0b10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum AggregationOptions {
    None = 0,
    Associative = ASSOCIATIVE,
    Commutative = COMMUTATIVE,
    AssociativeCommutative = ASSOCIATIVE | COMMUTATIVE,
}

/// Accepts exactly the four defined combinations.
pub fn is_valid(bits: u32) -> bool {
    bits & !(ASSOCIATIVE | COMMUTATIVE) == 0
}

impl AggregationOptions {
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(Self::None),
            ASSOCIATIVE => Ok(Self::Associative),
            COMMUTATIVE => Ok(Self::Commutative),
            b if b == ASSOCIATIVE | COMMUTATIVE => Ok(Self::AssociativeCommutative),
            other => Err(Error::InvalidArgument(format!(
                "invalid aggregation options: {other:#b}"
            ))),
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn is_associative(self) -> bool {
        self.bits() & ASSOCIATIVE != 0
    }

    pub fn is_commutative(self) -> bool {
        self.bits() & COMMUTATIVE != 0
    }

    /// Partials may be computed per partition and combined in partition order.
    pub fn permits_parallel(self) -> bool {
        self.is_associative()
    }

    /// Partials may be combined in any order.
    pub fn permits_unordered_combine(self) -> bool {
        self.is_associative() && self.is_commutative()
    }
}

impl TryFrom<u32> for AggregationOptions {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self> {
        Self::from_bits(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_four_values_are_valid() {
        let valid: Vec<u32> = (0..64).filter(|b| is_valid(*b)).collect();
        assert_eq!(valid, vec![0, 1, 2, 3]);
        assert!(!is_valid(u32::MAX));
        for b in 0..64 {
            assert_eq!(AggregationOptions::from_bits(b).is_ok(), is_valid(b));
        }
    }

    #[test]
    fn flags_decode() {
        let both = AggregationOptions::try_from(3).unwrap();
        assert_eq!(both, AggregationOptions::AssociativeCommutative);
        assert!(both.permits_unordered_combine());
        assert!(AggregationOptions::Associative.permits_parallel());
        assert!(!AggregationOptions::Associative.permits_unordered_combine());
        assert!(!AggregationOptions::Commutative.permits_parallel());
        assert!(!AggregationOptions::None.is_commutative());
        assert_eq!(AggregationOptions::Commutative.bits(), 2);
    }
}
