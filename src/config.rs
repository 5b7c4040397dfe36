use anyhow::{Context, Result};

// ============================================================================
// Lifecycle Configuration
// ============================================================================
//
// Read once at startup. Every setting has a default; environment variables
// override them, usually loaded from a .env file by the binary.
//
// ============================================================================

pub const LOG_FILTER_VAR: &str = "ORDER_LIFECYCLE_LOG_FILTER";
pub const NOTIFICATION_CAPACITY_VAR: &str = "ORDER_LIFECYCLE_NOTIFICATION_CAPACITY";
pub const METRICS_ENABLED_VAR: &str = "ORDER_LIFECYCLE_METRICS_ENABLED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// tracing-subscriber EnvFilter directive
    pub log_filter: String,
    /// Bound of the outbound notification channel
    pub notification_capacity: usize,
    pub metrics_enabled: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            log_filter: "info,order_lifecycle=debug".to_string(),
            notification_capacity: 256,
            metrics_enabled: true,
        }
    }
}

impl LifecycleConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(filter) = lookup(LOG_FILTER_VAR) {
            config.log_filter = filter;
        }

        if let Some(raw) = lookup(NOTIFICATION_CAPACITY_VAR) {
            config.notification_capacity = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer, got {:?}", NOTIFICATION_CAPACITY_VAR, raw))?;
            if config.notification_capacity == 0 {
                anyhow::bail!("{} must be greater than zero", NOTIFICATION_CAPACITY_VAR);
            }
        }

        if let Some(raw) = lookup(METRICS_ENABLED_VAR) {
            config.metrics_enabled = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be true or false, got {:?}", METRICS_ENABLED_VAR, raw))?;
        }

        Ok(config)
    }
}
