//! Fill-factor capacity policy.
//!
//! Every growable structure asks the same question before inserting:
//! given this many live entries and this capacity, should the table be
//! rebuilt, and at what size? The answer depends only on the configured
//! thresholds, so the policy is a plain value that can be shared.

use crate::error::{CoreError, Result};

/// Thresholds governing growth and shrinkage. All factors are percents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePolicy {
    fill_factor: u32,
    min_fill_factor: u32,
    growth_factor: u32,
    shrink_to_fill_factor: u32,
    min_capacity: usize,
}

impl SizePolicy {
    /// Validates and builds a policy.
    ///
    /// Ranges: `fill_factor` in 1..=100, `min_fill_factor` in
    /// 0..=fill_factor, `growth_factor` in 1..=200,
    /// `shrink_to_fill_factor` in 1..=fill_factor.
    pub fn new(
        fill_factor: u32,
        min_fill_factor: u32,
        growth_factor: u32,
        shrink_to_fill_factor: u32,
        min_capacity: usize,
    ) -> Result<Self> {
        if !(1..=100).contains(&fill_factor) {
            return Err(CoreError::InvalidConfig(format!(
                "fill_factor must be within 1..=100, got {fill_factor}"
            )));
        }
        if min_fill_factor > fill_factor {
            return Err(CoreError::InvalidConfig(format!(
                "min_fill_factor must be within 0..={fill_factor}, got {min_fill_factor}"
            )));
        }
        if !(1..=200).contains(&growth_factor) {
            return Err(CoreError::InvalidConfig(format!(
                "growth_factor must be within 1..=200, got {growth_factor}"
            )));
        }
        if !(1..=fill_factor).contains(&shrink_to_fill_factor) {
            return Err(CoreError::InvalidConfig(format!(
                "shrink_to_fill_factor must be within 1..={fill_factor}, got {shrink_to_fill_factor}"
            )));
        }

        Ok(Self {
            fill_factor,
            min_fill_factor,
            growth_factor,
            shrink_to_fill_factor,
            min_capacity,
        })
    }

    /// Usage above which a table of `capacity` must grow.
    pub fn max_usage(&self, capacity: usize) -> usize {
        percent_of(capacity, self.fill_factor)
    }

    /// Usage below which a table of `capacity` may shrink.
    pub fn min_usage(&self, capacity: usize) -> usize {
        percent_of(capacity, self.min_fill_factor)
    }

    /// Returns the capacity a table should be rebuilt at, or `None` if
    /// `capacity` is fine for `usage` entries.
    pub fn must_resize(&self, usage: usize, capacity: usize) -> Option<usize> {
        let target = if usage > self.max_usage(capacity) {
            self.grown(capacity)
        } else if usage < self.min_usage(capacity) && usage >= self.min_capacity {
            (usage as u128 * 100 / self.shrink_to_fill_factor as u128) as usize
        } else {
            return None;
        };

        Some(target.max(usage).max(self.min_capacity))
    }

    /// Capacity after one growth step, never smaller than `capacity + 1`.
    pub fn grown(&self, capacity: usize) -> usize {
        let grown = capacity as u128 * (100 + self.growth_factor as u128) / 100;
        (grown as usize).max(capacity + 1).max(self.min_capacity)
    }
}

fn percent_of(capacity: usize, percent: u32) -> usize {
    (capacity as u128 * percent as u128 / 100) as usize
}

/// Cached thresholds for one capacity, recomputed whenever the owning
/// table is rebuilt so the insert fast path is two comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub capacity: usize,
    pub max_usage: usize,
    pub min_usage: usize,
}

impl SizeLimits {
    pub fn for_capacity(policy: &SizePolicy, capacity: usize) -> Self {
        Self {
            capacity,
            max_usage: policy.max_usage(capacity),
            min_usage: policy.min_usage(capacity),
        }
    }

    /// Whether `usage` sits inside the band that never needs a resize.
    pub fn contains(&self, usage: usize) -> bool {
        usage <= self.max_usage && usage >= self.min_usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SizePolicy {
        SizePolicy::new(70, 30, 100, 60, 10).unwrap()
    }

    #[test]
    fn test_grow_boundary() {
        let policy = policy();
        assert_eq!(policy.must_resize(700, 1000), None);
        assert_eq!(policy.must_resize(701, 1000), Some(2000));
    }

    #[test]
    fn test_shrink_boundary() {
        let policy = policy();
        assert_eq!(policy.must_resize(300, 1000), None);
        assert_eq!(policy.must_resize(299, 1000), Some(498));
    }

    #[test]
    fn test_no_shrink_below_min_capacity() {
        let policy = policy();
        assert_eq!(policy.must_resize(9, 1000), None);
        assert_eq!(policy.must_resize(10, 1000), Some(16));
    }

    #[test]
    fn test_result_floored_to_usage_and_min_capacity() {
        let policy = SizePolicy::new(100, 0, 1, 100, 8).unwrap();
        // 1% growth on a tiny table rounds down; still must fit usage.
        assert_eq!(policy.must_resize(5, 4), Some(8));
        assert_eq!(policy.must_resize(1, 0), Some(8));
    }

    #[test]
    fn test_grown_always_increases() {
        let policy = SizePolicy::new(70, 0, 1, 50, 0).unwrap();
        assert_eq!(policy.grown(0), 1);
        assert_eq!(policy.grown(10), 11);
        assert_eq!(policy.grown(1000), 1010);
    }

    #[test]
    fn test_validation() {
        assert!(SizePolicy::new(0, 0, 100, 1, 0).is_err());
        assert!(SizePolicy::new(101, 0, 100, 1, 0).is_err());
        assert!(SizePolicy::new(70, 71, 100, 60, 0).is_err());
        assert!(SizePolicy::new(70, 30, 0, 60, 0).is_err());
        assert!(SizePolicy::new(70, 30, 201, 60, 0).is_err());
        assert!(SizePolicy::new(70, 30, 100, 0, 0).is_err());
        assert!(SizePolicy::new(70, 30, 100, 71, 0).is_err());
        assert!(SizePolicy::new(100, 100, 200, 100, 0).is_ok());
    }

    #[test]
    fn test_limits_band() {
        let limits = SizeLimits::for_capacity(&policy(), 1000);
        assert_eq!(limits.max_usage, 700);
        assert_eq!(limits.min_usage, 300);
        assert!(limits.contains(300));
        assert!(limits.contains(700));
        assert!(!limits.contains(701));
        assert!(!limits.contains(299));
    }
}
