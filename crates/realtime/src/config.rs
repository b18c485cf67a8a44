//! Connection settings and the reconnect schedule.

use parkwatch_core::config::RealtimeConfig;
use parkwatch_core::constants::{
    DEFAULT_REALTIME_CONNECT_TIMEOUT_SECS, DEFAULT_REALTIME_URL, DEFAULT_RECONNECT_BASE_DELAY_MS,
    DEFAULT_RECONNECT_MAX_ATTEMPTS, DEFAULT_RECONNECT_MAX_DELAY_MS,
};
use std::time::Duration;

/// Exponential reconnect backoff: `base`, `2 * base`, `4 * base`, ...
/// capped at `max_delay`, for at most `max_attempts` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
            max_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based), or `None` once the
    /// attempts are used up.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }

    /// Every delay of the schedule, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts)
            .filter_map(|attempt| self.delay_for(attempt))
            .collect()
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_RECONNECT_BASE_DELAY_MS),
            Duration::from_millis(DEFAULT_RECONNECT_MAX_DELAY_MS),
            DEFAULT_RECONNECT_MAX_ATTEMPTS,
        )
    }
}

/// Settings of one [`crate::RealtimeClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeSettings {
    /// HTTP(S) or WS(S) base URL of the event server.
    pub url: String,
    pub reconnect: ReconnectPolicy,
    /// Limit for one connect + handshake.
    pub connect_timeout: Duration,
    /// Initial state of the live-updates toggle.
    pub live_updates: bool,
}

impl RealtimeSettings {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            url: config.url.clone(),
            reconnect: ReconnectPolicy::new(
                Duration::from_millis(config.base_delay_ms),
                Duration::from_millis(config.max_delay_ms),
                config.max_attempts,
            ),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            live_updates: config.live_updates,
        }
    }
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_REALTIME_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(DEFAULT_REALTIME_CONNECT_TIMEOUT_SECS),
            live_updates: true,
        }
    }
}
