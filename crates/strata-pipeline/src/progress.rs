//! Render progress reporting
//!
//! Each render task publishes its progress on a `tokio::sync::watch`
//! channel. Fractions only move forward: a report lower than the last one
//! keeps the old fraction and only updates the phase.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Start of the per-layer band
pub const LAYERS_START: f64 = 0.2;
/// End of the per-layer band
pub const LAYERS_END: f64 = 0.8;

/// Render lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum RenderPhase {
    #[default]
    Idle,
    Preparing,
    /// Allocating the surface
    Context,
    Rendering,
    Encoding,
    Finalizing,
    Complete,
    Cancelled,
    Failed,
}

impl RenderPhase {
    /// Is this a final phase?
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }

    /// Progress fraction at which the phase starts
    pub fn start_fraction(&self) -> f64 {
        match self {
            Self::Idle | Self::Preparing => 0.0,
            Self::Context => 0.1,
            Self::Rendering => LAYERS_START,
            Self::Encoding => LAYERS_END,
            Self::Finalizing => 0.9,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// A progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenderProgress {
    pub phase: RenderPhase,
    /// Fraction complete in [0, 1]
    pub fraction: f64,
}

/// Publishing side of a task's progress channel
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<RenderProgress>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RenderProgress::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderProgress> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> RenderProgress {
        *self.tx.borrow()
    }

    /// Enter `phase` at its start fraction
    pub fn enter(&self, phase: RenderPhase) {
        self.report(phase, phase.start_fraction());
    }

    /// Report progress through the per-layer band after `done` of `total` layers
    pub fn layer_done(&self, done: usize, total: usize) {
        let share = if total == 0 {
            1.0
        } else {
            done.min(total) as f64 / total as f64
        };
        self.report(
            RenderPhase::Rendering,
            LAYERS_START + (LAYERS_END - LAYERS_START) * share,
        );
    }

    /// Publish `phase` with `fraction`, never moving the fraction backwards
    pub fn report(&self, phase: RenderPhase, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.tx.send_if_modified(|p| {
            if p.phase.is_terminal() {
                return false;
            }
            let next = RenderProgress {
                phase,
                fraction: p.fraction.max(fraction),
            };
            let changed = next != *p;
            *p = next;
            changed
        });
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
