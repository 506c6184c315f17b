//! Scene graph errors

use crate::layer::LayerId;
use thiserror::Error;

/// Errors raised by scene mutations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Duplicate layer id: {0}")]
    DuplicateId(LayerId),

    #[error("Layer not found: {0}")]
    InvalidLayer(LayerId),
}
