//! Key-age rotation policy (spec section 4.2): pure scheduling decisions,
//! independent of the background sweeper's execution. Grounded in the
//! teacher's `domain/pruning` background-sweeper shape, generalized from
//! "prune old blocks" to "rotate stale keys".

use shared_crypto::Layer;
use std::time::Duration;

/// Per-layer rotation cadence and grace window.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    pub rotation_period: Duration,
    pub grace_window: Duration,
}

impl RotationPolicy {
    /// Default rotation periods per layer (spec section 4.2): TRANSACTION
    /// 30d, BRIDGE 7d, CONTRACT 30d, STORAGE 90d. Grace window defaults to
    /// a quarter of the rotation period, capped at 7 days.
    #[must_use]
    pub fn default_for(layer: Layer) -> Self {
        let days = layer.default_rotation_days() as u64;
        let rotation_period = Duration::from_secs(days * 86_400);
        let grace_window = Duration::from_secs((days * 86_400 / 4).min(7 * 86_400));
        Self { rotation_period, grace_window }
    }

    /// Whether a key active since `active_since_secs` (unix time) is due
    /// for rotation at `now_secs`.
    #[must_use]
    pub fn is_due(&self, active_since_secs: u64, now_secs: u64) -> bool {
        now_secs.saturating_sub(active_since_secs) >= self.rotation_period.as_secs()
    }

    /// Whether a retired key, retired at `retired_at_secs`, has exceeded
    /// its grace window and may be securely destroyed.
    #[must_use]
    pub fn grace_expired(&self, retired_at_secs: u64, now_secs: u64) -> bool {
        now_secs.saturating_sub(retired_at_secs) >= self.grace_window.as_secs()
    }
}
