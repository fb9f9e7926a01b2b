//! Pool configuration.

use std::time::Duration;

/// Default number of idle resources kept in the primary tier.
pub const DEFAULT_MIN_IDLE: usize = 5;

/// Default cap on idle resources across both tiers.
pub const DEFAULT_MAX_IDLE: usize = 10;

/// Default period between recycler passes.
pub const DEFAULT_RECYCLE_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Configuration for the resource pool.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future minor versions without breaking changes. Use the builder
/// pattern methods or [`Default::default()`] to construct instances.
///
/// A value of zero for any field means "unset" and is replaced by the
/// corresponding default when the pool normalizes its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[non_exhaustive]
pub struct PoolConfig {
    /// Number of idle resources the primary tier holds.
    ///
    /// Released resources fill this tier first, and the recycler moves
    /// overflow residents into it when there is room.
    pub min_idle: usize,

    /// Maximum number of idle resources held across both tiers.
    ///
    /// This bounds idle resources only. Resources that are checked out are
    /// not counted, so the number of live resources may exceed this value.
    pub max_idle: usize,

    /// Wall-clock period between recycler passes.
    pub recycle_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_idle: DEFAULT_MIN_IDLE,
            max_idle: DEFAULT_MAX_IDLE,
            recycle_interval: DEFAULT_RECYCLE_INTERVAL,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary tier capacity.
    #[must_use]
    pub fn min_idle(mut self, count: usize) -> Self {
        self.min_idle = count;
        self
    }

    /// Set the total idle capacity.
    #[must_use]
    pub fn max_idle(mut self, count: usize) -> Self {
        self.max_idle = count;
        self
    }

    /// Set the recycler period.
    #[must_use]
    pub fn recycle_interval(mut self, interval: Duration) -> Self {
        self.recycle_interval = interval;
        self
    }

    /// Return a copy with defaults applied and capacities reconciled.
    ///
    /// Unset (zero) fields take their defaults. If `min_idle` exceeds
    /// `max_idle`, `max_idle` is raised to match rather than rejecting the
    /// configuration.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut config = *self;

        if config.min_idle == 0 {
            config.min_idle = DEFAULT_MIN_IDLE;
        }
        if config.max_idle == 0 {
            config.max_idle = DEFAULT_MAX_IDLE;
        }
        if config.min_idle > config.max_idle {
            tracing::warn!(
                min_idle = config.min_idle,
                max_idle = config.max_idle,
                "min_idle exceeds max_idle; raising max_idle"
            );
            config.max_idle = config.min_idle;
        }
        if config.recycle_interval.is_zero() {
            config.recycle_interval = DEFAULT_RECYCLE_INTERVAL;
        }

        config
    }

    /// Capacity of the overflow tier.
    ///
    /// Only meaningful on a [`normalized`](Self::normalized) configuration.
    #[must_use]
    pub fn overflow_capacity(&self) -> usize {
        self.max_idle.saturating_sub(self.min_idle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.min_idle, 5);
        assert_eq!(config.max_idle, 10);
        assert_eq!(config.recycle_interval, Duration::from_secs(1800));
        assert_eq!(config.overflow_capacity(), 5);
    }

    #[test]
    fn test_config_builder_methods() {
        let config = PoolConfig::new()
            .min_idle(2)
            .max_idle(8)
            .recycle_interval(Duration::from_secs(60));

        assert_eq!(config.min_idle, 2);
        assert_eq!(config.max_idle, 8);
        assert_eq!(config.recycle_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_normalize_fills_unset_fields() {
        let config = PoolConfig::new()
            .min_idle(0)
            .max_idle(0)
            .recycle_interval(Duration::ZERO)
            .normalized();

        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn test_normalize_raises_max_to_min() {
        let config = PoolConfig::new().min_idle(20).max_idle(10).normalized();

        assert_eq!(config.min_idle, 20);
        assert_eq!(config.max_idle, 20);
        assert_eq!(config.overflow_capacity(), 0);
    }

    #[test]
    fn test_normalize_min_above_default_max() {
        // Only min set: max falls back to its default, then gets raised.
        let config = PoolConfig::new().min_idle(12).max_idle(0).normalized();

        assert_eq!(config.max_idle, 12);
    }

    #[test]
    fn test_normalize_keeps_valid_config() {
        let config = PoolConfig::new()
            .min_idle(2)
            .max_idle(3)
            .recycle_interval(Duration::from_millis(10));

        assert_eq!(config.normalized(), config);
        assert_eq!(config.overflow_capacity(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial_config() {
        let config: PoolConfig = serde_json::from_str(r#"{"min_idle": 3}"#).unwrap();
        assert_eq!(config.min_idle, 3);
        assert_eq!(config.max_idle, DEFAULT_MAX_IDLE);
    }
}
