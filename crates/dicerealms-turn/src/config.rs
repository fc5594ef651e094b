//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DramaticPause;

/// Settings for the [`ActionPipeline`](crate::ActionPipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How long every table waits between an action's announcement and
    /// its result. Zero disables the pause.
    pub action_delay: Duration,
}

impl PipelineConfig {
    pub const DEFAULT_ACTION_DELAY: Duration = Duration::from_secs(2);

    pub fn with_delay(action_delay: Duration) -> Self {
        Self { action_delay }
    }

    pub fn pause(&self) -> DramaticPause {
        DramaticPause::new(self.action_delay)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            action_delay: Self::DEFAULT_ACTION_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default_is_two_seconds() {
        let config = PipelineConfig::default();
        assert_eq!(config.action_delay, Duration::from_secs(2));
        assert_eq!(config.pause().duration(), Duration::from_secs(2));
    }
}
