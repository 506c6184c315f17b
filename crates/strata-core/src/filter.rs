//! Layer filters
//!
//! A filter is a named effect with parameters. Layers carry an ordered list of
//! filters; backends apply them in list order to the layer's rendered pixels.

use crate::color::Color;
use kurbo::Vec2;
use serde::{Deserialize, Serialize};

/// A single layer effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayerFilter {
    None,
    /// Gaussian-like blur, radius in scene units
    Blur { radius: f64 },
    /// Additive brightness in [-1, 1]
    Brightness { amount: f64 },
    /// Contrast factor in [0, 2] (1 = unchanged)
    Contrast { amount: f64 },
    /// Saturation factor in [0, 2] (1 = unchanged)
    Saturation { amount: f64 },
    /// Sepia tone intensity in [0, 1]
    Sepia { intensity: f64 },
    BlackAndWhite,
    Vintage,
    Warm,
    Cool,
    /// Drop shadow painted beneath the layer content
    Shadow { offset: Vec2, blur: f64, color: Color },
}

impl LayerFilter {
    pub fn blur(radius: f64) -> Self {
        Self::Blur {
            radius: radius.max(0.0),
        }
    }

    pub fn brightness(amount: f64) -> Self {
        Self::Brightness {
            amount: amount.clamp(-1.0, 1.0),
        }
    }

    pub fn contrast(amount: f64) -> Self {
        Self::Contrast {
            amount: amount.clamp(0.0, 2.0),
        }
    }

    pub fn saturation(amount: f64) -> Self {
        Self::Saturation {
            amount: amount.clamp(0.0, 2.0),
        }
    }

    pub fn sepia(intensity: f64) -> Self {
        Self::Sepia {
            intensity: intensity.clamp(0.0, 1.0),
        }
    }

    pub fn shadow(offset: Vec2, blur: f64, color: Color) -> Self {
        Self::Shadow {
            offset,
            blur: blur.max(0.0),
            color,
        }
    }

    /// Filter name as used in documents
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Blur { .. } => "blur",
            Self::Brightness { .. } => "brightness",
            Self::Contrast { .. } => "contrast",
            Self::Saturation { .. } => "saturation",
            Self::Sepia { .. } => "sepia",
            Self::BlackAndWhite => "blackAndWhite",
            Self::Vintage => "vintage",
            Self::Warm => "warm",
            Self::Cool => "cool",
            Self::Shadow { .. } => "shadow",
        }
    }

    /// Does this filter leave pixels untouched?
    pub fn is_identity(&self) -> bool {
        match *self {
            Self::None => true,
            Self::Blur { radius } => radius <= 0.0,
            Self::Brightness { amount } => amount == 0.0,
            Self::Contrast { amount } | Self::Saturation { amount } => amount == 1.0,
            Self::Sepia { intensity } => intensity <= 0.0,
            Self::Shadow { color, .. } => color.is_clear(),
            Self::BlackAndWhite | Self::Vintage | Self::Warm | Self::Cool => false,
        }
    }

    /// How far the filter can paint outside the layer's own bounds
    pub fn outset(&self) -> f64 {
        match *self {
            Self::Blur { radius } => radius.max(0.0),
            Self::Shadow { offset, blur, .. } => offset.hypot() + blur.max(0.0),
            _ => 0.0,
        }
    }

    /// Clamp parameters into their documented ranges
    pub fn normalized(self) -> Self {
        match self {
            Self::Blur { radius } => Self::blur(radius),
            Self::Brightness { amount } => Self::brightness(amount),
            Self::Contrast { amount } => Self::contrast(amount),
            Self::Saturation { amount } => Self::saturation(amount),
            Self::Sepia { intensity } => Self::sepia(intensity),
            Self::Shadow {
                offset,
                blur,
                color,
            } => Self::shadow(offset, blur, color),
            other => other,
        }
    }
}

/// Do any filters in the list have a visible effect?
pub fn has_effect(filters: &[LayerFilter]) -> bool {
    filters.iter().any(|f| !f.is_identity())
}

/// Combined outset of a filter list
pub fn total_outset(filters: &[LayerFilter]) -> f64 {
    filters.iter().map(LayerFilter::outset).sum()
}
