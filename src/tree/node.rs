//! Node type and the Collatz recurrence.
//!
//! Each node in the canonical tree carries:
//! - A unique arbitrary-precision value
//! - Up to two children, held by the graph edges and tagged with a [`ChildSlot`]
//!
//! The recurrence helpers live here too, since every other stage reasons about
//! values through them.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::error::{CollatzError, Result};

/// A node of the canonical Collatz tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollatzNode {
    /// The integer this node represents. Unique across the tree.
    pub value: BigUint,
}

impl CollatzNode {
    /// Create a node for `value`.
    #[inline]
    pub fn new(value: BigUint) -> Self {
        Self { value }
    }
}

impl fmt::Display for CollatzNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.value)
    }
}

/// Which of the two child positions an edge occupies.
///
/// Slots fill in discovery order: the first predecessor attached to a node
/// lands in `First`, the second in `Second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildSlot {
    /// The first child discovered.
    First,
    /// The second child discovered.
    Second,
}

impl ChildSlot {
    /// Both slots, in fill order.
    pub const ALL: [ChildSlot; 2] = [ChildSlot::First, ChildSlot::Second];

    /// Position of the slot in a two-element array.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            ChildSlot::First => 0,
            ChildSlot::Second => 1,
        }
    }
}

/// Forward step of the recurrence: `v / 2` if even, else `3v + 1`.
pub fn next_value(value: &BigUint) -> BigUint {
    if value.is_even() {
        value >> 1u32
    } else {
        value * 3u32 + 1u32
    }
}

/// Values whose forward step lands on `value`.
///
/// `2v` always qualifies; `(v - 1) / 3` qualifies when it is a positive odd
/// integer. The root's own successor (4, via 1) is reported like any other
/// predecessor; the tree never attaches the root as a child.
pub fn predecessors(value: &BigUint) -> Vec<BigUint> {
    let mut result = vec![value << 1u32];
    if value.is_zero() {
        return result;
    }
    let shifted = value - 1u32;
    let (quotient, remainder) = shifted.div_rem(&BigUint::from(3u32));
    if remainder.is_zero() && !quotient.is_zero() && quotient.is_odd() {
        result.push(quotient);
    }
    result
}

/// Parse a positive decimal integer into a tree value.
pub fn parse_value(input: &str) -> Result<BigUint> {
    let trimmed = input.trim();
    let value = BigUint::from_str(trimmed).map_err(|_| CollatzError::InvalidValue {
        value: input.to_string(),
        reason: "not a decimal integer",
    })?;
    ensure_positive(&value)?;
    Ok(value)
}

pub(crate) fn ensure_positive(value: &BigUint) -> Result<()> {
    if value.is_zero() {
        return Err(CollatzError::InvalidValue {
            value: value.to_string(),
            reason: "trajectories start at a positive integer",
        });
    }
    Ok(())
}

/// Forward trajectory of a start value, ending with 1.
///
/// Termination relies on the Collatz conjecture; there is no iteration cap.
#[derive(Debug, Clone)]
pub struct Trajectory {
    current: Option<BigUint>,
}

impl Trajectory {
    /// Start a trajectory at `start`. Zero yields an empty trajectory.
    pub fn new(start: BigUint) -> Self {
        let current = if start.is_zero() { None } else { Some(start) };
        Self { current }
    }
}

impl Iterator for Trajectory {
    type Item = BigUint;

    fn next(&mut self) -> Option<BigUint> {
        let value = self.current.take()?;
        if !value.is_one() {
            self.current = Some(next_value(&value));
        }
        Some(value)
    }
}

/// Serde helpers encoding values as decimal strings, so JS callers never see
/// a digit vector.
pub(crate) mod decimal {
    use std::str::FromStr;

    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(crate) fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::from_str(text.trim()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_next_value() {
        assert_eq!(next_value(&big(6)), big(3));
        assert_eq!(next_value(&big(3)), big(10));
        assert_eq!(next_value(&big(1)), big(4));
    }

    #[test]
    fn test_predecessors() {
        // 16 ← 32 and 16 ← 5
        assert_eq!(predecessors(&big(16)), vec![big(32), big(5)]);
        // 10 ← 20 and 10 ← 3
        assert_eq!(predecessors(&big(10)), vec![big(20), big(3)]);
        // (28 - 1) / 3 = 9 is odd, so 28 ← 9
        assert_eq!(predecessors(&big(28)), vec![big(56), big(9)]);
        // (22 - 1) / 3 = 7 is odd
        assert_eq!(predecessors(&big(22)), vec![big(44), big(7)]);
        // (7 - 1) / 3 = 2 is even, so only 14
        assert_eq!(predecessors(&big(7)), vec![big(14)]);
        // 1 ← 2 only; (1 - 1) / 3 = 0 is not positive
        assert_eq!(predecessors(&big(1)), vec![big(2)]);
    }

    #[test]
    fn test_predecessors_step_forward_to_value() {
        for v in 1..200u64 {
            for p in predecessors(&big(v)) {
                assert_eq!(next_value(&p), big(v), "predecessor {p} of {v}");
            }
        }
    }

    #[test]
    fn test_trajectory() {
        let steps: Vec<BigUint> = Trajectory::new(big(6)).collect();
        let expected: Vec<BigUint> = [6u64, 3, 10, 5, 16, 8, 4, 2, 1].into_iter().map(big).collect();
        assert_eq!(steps, expected);
    }

    #[test]
    fn test_trajectory_of_one_and_zero() {
        assert_eq!(Trajectory::new(big(1)).collect::<Vec<_>>(), vec![big(1)]);
        assert_eq!(Trajectory::new(big(0)).count(), 0);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 27 ").unwrap(), big(27));
        let huge = "123456789012345678901234567890";
        assert_eq!(parse_value(huge).unwrap().to_string(), huge);
        assert!(matches!(parse_value("0"), Err(CollatzError::InvalidValue { .. })));
        assert!(matches!(parse_value("-3"), Err(CollatzError::InvalidValue { .. })));
        assert!(matches!(parse_value("abc"), Err(CollatzError::InvalidValue { .. })));
    }

    #[test]
    fn test_child_slot_index() {
        assert_eq!(ChildSlot::First.index(), 0);
        assert_eq!(ChildSlot::Second.index(), 1);
        assert!(ChildSlot::First < ChildSlot::Second);
    }

    #[test]
    fn test_node_display() {
        assert_eq!(format!("{}", CollatzNode::new(big(42))), "Node(42)");
    }
}
