//! Periodic removal of expired cache entries
//!
//! Lookups already ignore expired entries, so sweeping only bounds memory:
//! a token that is never looked at again would otherwise keep its marker
//! resident until the process exits.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tg_shared::MemoryCacheConfig;

/// An in-process cache that can drop its expired entries on demand
pub trait Sweep: Send + Sync {
    /// Name used in sweep logs
    fn name(&self) -> &str;

    /// Drop every expired entry, returning how many were dropped
    fn purge_expired(&self) -> usize;
}

/// Configuration for the store sweeper
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to sweep (in seconds)
    pub interval_seconds: u64,
    /// Whether to run the background task at all
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            enabled: true,
        }
    }
}

impl From<&MemoryCacheConfig> for SweeperConfig {
    fn from(config: &MemoryCacheConfig) -> Self {
        Self {
            interval_seconds: config.sweep_interval,
            enabled: config.sweep_enabled,
        }
    }
}

/// Sweeps a set of in-process caches on a fixed interval
pub struct StoreSweeper {
    targets: Vec<Arc<dyn Sweep>>,
    config: SweeperConfig,
}

impl StoreSweeper {
    pub fn new(config: SweeperConfig) -> Self {
        Self {
            targets: Vec::new(),
            config,
        }
    }

    /// Add a cache to sweep
    pub fn with_target(mut self, target: Arc<dyn Sweep>) -> Self {
        self.targets.push(target);
        self
    }

    /// Run a single sweep over every target
    pub fn run_sweep(&self) -> SweepResult {
        let mut result = SweepResult::default();

        for target in &self.targets {
            let purged = target.purge_expired();
            if purged > 0 {
                debug!(target = target.name(), purged, "expired cache entries purged");
            }
            result.purged.push((target.name().to_string(), purged));
        }

        result
    }

    /// Start sweeping as a background task
    ///
    /// Returns `None` when sweeping is disabled. The task runs until the
    /// handle is aborted or the runtime shuts down.
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Cache sweeper is disabled");
            return None;
        }

        let interval = std::time::Duration::from_secs(self.config.interval_seconds.max(1));

        Some(tokio::spawn(async move {
            info!(
                "Cache sweeper started - will run every {} seconds over {} caches",
                self.config.interval_seconds,
                self.targets.len()
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                let result = self.run_sweep();
                if result.total_purged() > 0 {
                    info!("Cache sweep completed - purged {}", result.total_purged());
                }
            }
        }))
    }
}

/// Result of a sweep
#[derive(Debug, Default)]
pub struct SweepResult {
    /// Entries purged per target, in registration order
    pub purged: Vec<(String, usize)>,
}

impl SweepResult {
    /// Total number of entries purged
    pub fn total_purged(&self) -> usize {
        self.purged.iter().map(|(_, count)| count).sum()
    }
}
