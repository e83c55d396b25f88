//! Construction-time configuration for caches and collectors.

/// Number of recently read values a [`TwoTierCache`](crate::TwoTierCache)
/// pins when no capacity is given.
pub const DEFAULT_PIN_CAPACITY: usize = 100;

/// Configuration of a [`TwoTierCache`](crate::TwoTierCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum length of the pin set. Zero disables pinning.
    pub pin_capacity: usize,
}

impl CacheConfig {
    pub fn with_pin_capacity(mut self, pin_capacity: usize) -> Self {
        self.pin_capacity = pin_capacity;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pin_capacity: DEFAULT_PIN_CAPACITY,
        }
    }
}

/// Configuration of a [`Collector`](crate::Collector).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Maximum number of values kept alive by soft retention alone. When
    /// set, registering a value past the budget releases the oldest
    /// retention, which reclaims that value unless something else holds it.
    /// `None` retains every value until the next collection.
    pub soft_budget: Option<usize>,
}

impl CollectorConfig {
    pub fn with_soft_budget(mut self, soft_budget: usize) -> Self {
        self.soft_budget = Some(soft_budget);
        self
    }
}
