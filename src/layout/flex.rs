//! Flex-grow distribution.
//!
//! Leftover space is split proportionally to grow weight, rounding each
//! share down. The last flex child takes whatever rounding left over, so
//! the shares always sum to exactly the leftover space.

/// Incremental splitter: hand out shares one flex child at a time, in order.
#[derive(Debug, Clone)]
pub(crate) struct FlexSplit {
    remaining: u16,
    given: u16,
    total: f32,
    left: usize,
}

impl FlexSplit {
    pub(crate) fn new(remaining: u16, total_weight: f32, count: usize) -> Self {
        Self {
            remaining,
            given: 0,
            total: total_weight,
            left: count,
        }
    }

    /// Share for the next flex child with `weight`.
    pub(crate) fn next(&mut self, weight: f32) -> u16 {
        if self.left == 0 {
            return 0;
        }
        self.left -= 1;

        let rest = self.remaining - self.given;
        let share = if self.left == 0 {
            rest
        } else if self.total > 0.0 {
            ((self.remaining as f32 * weight / self.total).floor() as u16).min(rest)
        } else {
            0
        };
        self.given += share;
        share
    }
}

/// Split `remaining` cells among children with the given grow weights.
pub fn distribute(remaining: u16, weights: &[f32]) -> Vec<u16> {
    let total: f32 = weights.iter().sum();
    let mut split = FlexSplit::new(remaining, total, weights.len());
    weights.iter().map(|&w| split.next(w)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_weights_divide_evenly() {
        assert_eq!(distribute(60, &[1.0, 1.0, 1.0]), vec![20, 20, 20]);
    }

    #[test]
    fn test_last_child_absorbs_remainder() {
        assert_eq!(distribute(10, &[1.0, 1.0, 1.0]), vec![3, 3, 4]);
        assert_eq!(distribute(100, &[1.0, 2.0]), vec![33, 67]);
        // Heavier first child still does not get the remainder
        assert_eq!(distribute(7, &[3.0, 1.0, 1.0]), vec![4, 1, 2]);
    }

    #[test]
    fn test_nothing_to_distribute() {
        assert_eq!(distribute(0, &[1.0, 1.0]), vec![0, 0]);
        assert!(distribute(5, &[]).is_empty());
    }
}
