//! Live engine configuration

use serde::{Deserialize, Serialize};
use tickbars_core::BarSpec;
use tickbars_streaming::{
    DEFAULT_BAR_CHANNEL_CAPACITY, DEFAULT_TRADE_CHANNEL_CAPACITY, LiveEngineConfig, OverflowPolicy,
};

/// Live engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Completed bars buffered for the consumer
    pub bar_channel_capacity: usize,

    /// Trades buffered between transport and engine
    pub trade_channel_capacity: usize,

    /// Behavior when the bar channel is full
    pub overflow: OverflowPolicy,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            bar_channel_capacity: DEFAULT_BAR_CHANNEL_CAPACITY,
            trade_channel_capacity: DEFAULT_TRADE_CHANNEL_CAPACITY,
            overflow: OverflowPolicy::Backpressure,
        }
    }
}

impl LiveConfig {
    pub fn engine_config(&self, specs: Vec<BarSpec>) -> LiveEngineConfig {
        LiveEngineConfig::new(specs)
            .with_bar_channel_capacity(self.bar_channel_capacity)
            .with_overflow(self.overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config() {
        let live = LiveConfig {
            bar_channel_capacity: 8,
            overflow: OverflowPolicy::DropNewest,
            ..Default::default()
        };
        let config = live.engine_config(vec![BarSpec::tick(3).unwrap()]);
        assert_eq!(config.bar_channel_capacity, 8);
        assert_eq!(config.overflow, OverflowPolicy::DropNewest);
        assert_eq!(config.specs.len(), 1);
    }
}
