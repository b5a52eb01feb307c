//! Socket configuration.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tuning for the event socket connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Seconds between heartbeat frames while connected. `0` disables them.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Capacity of the queue between socket handles and the connection task.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_command_buffer() -> usize {
    256
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            command_buffer: default_command_buffer(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SocketConfig {
    /// Heartbeat period, or `None` when heartbeats are disabled.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }
}

/// Automatic reconnection after the connection is lost.
///
/// Disabled by default: the application is expected to watch connection
/// state changes and decide when to reconnect. An explicit disconnect never
/// triggers a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Give up after this many consecutive failed attempts.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Randomize each delay within `[delay / 2, delay]`.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> bool {
    true
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: None,
            jitter: default_jitter(),
        }
    }
}

impl ReconnectPolicy {
    /// Exponential backoff: `base * 2^attempt`, capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let delay = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        let delay = if self.jitter && delay > 1 {
            rand::rng().random_range(delay / 2..=delay)
        } else {
            delay
        };
        Duration::from_millis(delay)
    }

    /// Returns `true` if another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && self.max_attempts.is_none_or(|max| attempt < max)
    }
}
