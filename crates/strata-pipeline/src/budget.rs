//! Pre-flight memory guard

use crate::config::{RenderConfig, RendererSettings};
use tracing::debug;

/// Upper bound on the raster a single render may allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    limit_bytes: u64,
}

impl MemoryBudget {
    pub fn new(limit_bytes: u64) -> Self {
        Self { limit_bytes }
    }

    pub fn from_settings(settings: &RendererSettings) -> Self {
        Self::new(settings.memory_limit_bytes())
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    /// Does the output raster of `config` fit?
    pub fn fits(&self, config: &RenderConfig) -> bool {
        config.estimated_memory_bytes() <= self.limit_bytes
    }

    /// Step the quality down until `config` fits
    ///
    /// Returns `None` when even the lowest quality is too large.
    pub fn downgrade(&self, config: &RenderConfig) -> Option<RenderConfig> {
        let mut candidate = config.clone();
        loop {
            if self.fits(&candidate) {
                if candidate.quality != config.quality {
                    debug!(
                        from = config.quality.name(),
                        to = candidate.quality.name(),
                        bytes = candidate.estimated_memory_bytes(),
                        "Downgraded render quality to fit memory budget"
                    );
                }
                return Some(candidate);
            }
            candidate.quality = candidate.quality.lower()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityLevel;
    use strata_core::Size;

    fn config(quality: QualityLevel) -> RenderConfig {
        RenderConfig::default()
            .with_size(Size::new(1000.0, 1000.0))
            .with_quality(quality)
    }

    #[test]
    fn test_fits() {
        let budget = MemoryBudget::new(4_000_000);
        assert!(budget.fits(&config(QualityLevel::Standard)));
        assert!(!budget.fits(&config(QualityLevel::High)));
    }

    #[test]
    fn test_downgrade_steps_quality() {
        // Standard needs 4 MB, High 16 MB, Print 36 MB
        let budget = MemoryBudget::new(10_000_000);
        let downgraded = budget.downgrade(&config(QualityLevel::Print)).unwrap();
        assert_eq!(downgraded.quality, QualityLevel::Standard);

        let unchanged = budget.downgrade(&config(QualityLevel::Preview)).unwrap();
        assert_eq!(unchanged.quality, QualityLevel::Preview);
    }

    #[test]
    fn test_downgrade_gives_up() {
        let budget = MemoryBudget::new(10);
        assert!(budget.downgrade(&config(QualityLevel::High)).is_none());
    }
}
