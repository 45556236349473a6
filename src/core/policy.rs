//! Preset resolution: priority, execution timeout and aging thresholds.

use std::collections::HashMap;
use std::time::Duration;

use super::pending::{PromotionRule, PromotionRules};
use crate::config::{PresetConfig, QueueConfig};
use crate::util::serde::Priority;

/// Lower clamp for resolved execution timeouts.
pub const MIN_TASK_TIMEOUT: Duration = Duration::from_secs(15);
/// Upper clamp for resolved execution timeouts.
pub const MAX_TASK_TIMEOUT: Duration = Duration::from_secs(120);
/// Shortest aging threshold.
pub const PROMOTION_FLOOR: Duration = Duration::from_secs(30);
/// Longest aging threshold.
pub const PROMOTION_CEILING: Duration = Duration::from_secs(120);

/// Scale a base timeout by priority and clamp it into
/// `[MIN_TASK_TIMEOUT, MAX_TASK_TIMEOUT]`.
#[must_use]
pub fn timeout_for_priority(priority: Priority, base: Duration) -> Duration {
    let scaled = match priority {
        Priority::Immediate => base / 4,
        Priority::High | Priority::Retry => base / 2,
        Priority::Normal => base,
        Priority::Low => base.saturating_mul(2),
    };
    scaled.clamp(MIN_TASK_TIMEOUT, MAX_TASK_TIMEOUT)
}

/// Aging rules derived from the base timeout: `Low → Normal` after
/// `max(base, 30s)` and `Normal → High` after `max(2 * base, 30s)`, both
/// capped at 120s.
#[must_use]
pub fn promotion_rules(base: Duration) -> PromotionRules {
    let threshold = |d: Duration| d.max(PROMOTION_FLOOR).min(PROMOTION_CEILING);
    let mut rules = PromotionRules::with_capacity(2);
    rules.insert(
        Priority::Low,
        PromotionRule {
            after: threshold(base),
            target: Priority::Normal,
        },
    );
    rules.insert(
        Priority::Normal,
        PromotionRule {
            after: threshold(base.saturating_mul(2)),
            target: Priority::High,
        },
    );
    rules
}

/// Resolves a preset name into scheduling parameters.
#[derive(Debug, Clone)]
pub struct PresetPolicy {
    base_timeout: Duration,
    default_priority: Priority,
    presets: HashMap<String, PresetConfig>,
}

impl PresetPolicy {
    /// Policy with no presets.
    #[must_use]
    pub fn new(base_timeout: Duration, default_priority: Priority) -> Self {
        Self {
            base_timeout,
            default_priority,
            presets: HashMap::new(),
        }
    }

    /// Policy for a (defaulted) queue configuration.
    #[must_use]
    pub fn from_config(cfg: &QueueConfig) -> Self {
        Self {
            base_timeout: cfg.base_timeout(),
            default_priority: cfg.priority,
            presets: cfg.presets.clone(),
        }
    }

    /// Register a preset.
    #[must_use]
    pub fn with_preset(mut self, name: impl Into<String>, preset: PresetConfig) -> Self {
        self.presets.insert(name.into(), preset);
        self
    }

    /// Configured base timeout.
    #[must_use]
    pub const fn base_timeout(&self) -> Duration {
        self.base_timeout
    }

    /// Priority for `preset`: its override, else the queue default.
    #[must_use]
    pub fn priority(&self, preset: &str) -> Priority {
        self.presets
            .get(preset)
            .and_then(|p| p.priority)
            .unwrap_or(self.default_priority)
    }

    /// Execution timeout for `preset`, scaled by its resolved priority.
    #[must_use]
    pub fn timeout(&self, preset: &str) -> Duration {
        let base = self
            .presets
            .get(preset)
            .filter(|p| p.timeout_secs > 0)
            .map_or(self.base_timeout, |p| Duration::from_secs(p.timeout_secs));
        timeout_for_priority(self.priority(preset), base)
    }

    /// Aging rules for the queue's base timeout.
    #[must_use]
    pub fn promotion_rules(&self) -> PromotionRules {
        promotion_rules(self.base_timeout)
    }
}
