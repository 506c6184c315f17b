//! Scene document encoding
//!
//! Scenes are persisted as JSON documents with the fields `id`, `name`,
//! `size`, `backgroundColor`, `layers` (each tagged by `kind`), `createdAt`,
//! `modifiedAt`, `version` and `metadata`. Image bytes are embedded as base64.
//! The selection is never written.

use crate::error::SceneError;
use crate::scene::Scene;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

/// Document codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// Compact JSON
    #[default]
    Json,
    /// Indented JSON (human-readable)
    JsonPretty,
}

impl Codec {
    /// Encode a value
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let encoded = match self {
            Self::Json => serde_json::to_vec(value),
            Self::JsonPretty => serde_json::to_vec_pretty(value),
        };
        encoded.map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode a value
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Encode a scene document
    pub fn encode_scene(&self, scene: &Scene) -> Result<Vec<u8>, CodecError> {
        let data = self.encode(scene)?;
        debug!(
            scene = %scene.id(),
            layers = scene.layer_count(),
            bytes = data.len(),
            "Encoded scene document"
        );
        Ok(data)
    }

    /// Decode and validate a scene document
    pub fn decode_scene(&self, data: &[u8]) -> Result<Scene, CodecError> {
        let scene: Scene = self.decode(data)?;
        scene.validate()?;
        debug!(
            scene = %scene.id(),
            layers = scene.layer_count(),
            "Decoded scene document"
        );
        Ok(scene)
    }

    /// MIME type of encoded documents
    pub fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("Invalid scene: {0}")]
    InvalidScene(#[from] SceneError),
}
