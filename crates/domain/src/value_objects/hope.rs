//! Hope - bounded resource counter

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Allowed range for `Hope::max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopeBounds {
    pub min_max: i32,
    pub max_max: i32,
}

impl Default for HopeBounds {
    fn default() -> Self {
        Self {
            min_max: 0,
            max_max: 10,
        }
    }
}

impl HopeBounds {
    pub fn new(min_max: i32, max_max: i32) -> Result<Self, DomainError> {
        if min_max < 0 || min_max > max_max {
            return Err(DomainError::validation(format!(
                "invalid hope bounds {}..={}",
                min_max, max_max
            )));
        }
        Ok(Self { min_max, max_max })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hope {
    #[serde(default)]
    current: i32,
    #[serde(default = "default_hope_max")]
    max: i32,
}

fn default_hope_max() -> i32 {
    Hope::DEFAULT_MAX
}

impl Default for Hope {
    fn default() -> Self {
        Self {
            current: 0,
            max: Self::DEFAULT_MAX,
        }
    }
}

impl Hope {
    pub const DEFAULT_MAX: i32 = 6;

    pub fn new(current: i32, max: i32, bounds: HopeBounds) -> Self {
        let mut hope = Self { current, max };
        hope.reconcile(bounds);
        hope
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    /// Clamp `max` into bounds and `current` into `0..=max`.
    pub fn reconcile(&mut self, bounds: HopeBounds) -> bool {
        let before = *self;
        self.max = self.max.clamp(bounds.min_max, bounds.max_max);
        self.current = self.current.clamp(0, self.max);
        *self != before
    }

    pub fn gain(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + amount.max(0)).min(self.max);
        self.current - before
    }

    pub fn spend(&mut self, amount: i32) -> Result<(), DomainError> {
        if amount > self.current {
            return Err(DomainError::validation(format!(
                "cannot spend {} hope with {} available",
                amount, self.current
            )));
        }
        self.current -= amount.max(0);
        Ok(())
    }

    pub fn set_max(&mut self, max: i32, bounds: HopeBounds) -> Result<(), DomainError> {
        if max < bounds.min_max || max > bounds.max_max {
            return Err(DomainError::validation(format!(
                "hope max {} outside {}..={}",
                max, bounds.min_max, bounds.max_max
            )));
        }
        self.max = max;
        self.current = self.current.min(max);
        Ok(())
    }
}
