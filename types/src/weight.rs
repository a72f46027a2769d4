//! Cumulative chain weight (total difficulty).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing scalar accumulated along a chain, used to compare
/// competing chain segments. `u128` gives enough headroom for any reachable
/// total difficulty.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug,
)]
pub struct Weight(u128);

impl Weight {
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn saturating_add(self, other: Weight) -> Weight {
        Weight(self.0.saturating_add(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_value() {
        assert!(Weight::new(1) < Weight::new(2));
        assert_eq!(Weight::new(5), Weight::new(5));
    }

    #[test]
    fn saturating_add_caps_at_max() {
        let max = Weight::new(u128::MAX);
        assert_eq!(max.saturating_add(Weight::new(1)), max);
        assert_eq!(
            Weight::new(2).saturating_add(Weight::new(3)),
            Weight::new(5)
        );
    }
}
