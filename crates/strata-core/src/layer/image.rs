//! Raster image layer

use super::{Layer, LayerCommon, LayerKind};
use crate::geometry::{ContentMode, LayerTransform, fit_rect};
use crate::surface::{DrawError, Surface};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A layer that draws encoded image bytes
///
/// The bytes are kept encoded and shared between copies of the layer; the
/// surface decodes them at draw time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    #[serde(flatten)]
    common: LayerCommon,
    #[serde(default, with = "encoded_bytes")]
    image_data: Option<Arc<[u8]>>,
    /// Natural pixel size reported by the asset source
    #[serde(default)]
    pixel_size: Option<Size>,
    #[serde(default)]
    content_mode: ContentMode,
}

impl ImageLayer {
    /// Create an empty image layer
    pub fn new(name: impl Into<String>, transform: LayerTransform) -> Self {
        Self {
            common: LayerCommon::new(name, transform),
            image_data: None,
            pixel_size: None,
            content_mode: ContentMode::default(),
        }
    }

    /// Attach encoded image bytes and their natural pixel size
    pub fn with_image(mut self, data: impl Into<Arc<[u8]>>, pixel_size: Size) -> Self {
        self.image_data = Some(data.into());
        self.pixel_size = Some(pixel_size);
        self
    }

    pub fn with_content_mode(mut self, mode: ContentMode) -> Self {
        self.content_mode = mode;
        self
    }

    pub fn image_data(&self) -> Option<&[u8]> {
        self.image_data.as_deref()
    }

    pub fn pixel_size(&self) -> Option<Size> {
        self.pixel_size
    }

    pub fn content_mode(&self) -> ContentMode {
        self.content_mode
    }

    pub fn set_content_mode(&mut self, mode: ContentMode) {
        self.content_mode = mode;
    }

    pub fn clear_image(&mut self) {
        self.image_data = None;
        self.pixel_size = None;
    }

    /// Destination rectangle of the image in local space
    ///
    /// Scale-to-fill covers the local bounds whether or not the pixel size
    /// is known.
    pub fn content_rect(&self) -> Rect {
        let bounds = self.common.transform.local_bounds();
        match self.content_mode {
            ContentMode::ScaleToFill => bounds,
            mode => fit_rect(mode, self.natural_size(), bounds),
        }
    }
}

impl Layer for ImageLayer {
    fn common(&self) -> &LayerCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut LayerCommon {
        &mut self.common
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Image
    }

    fn natural_size(&self) -> Size {
        match (&self.image_data, self.pixel_size) {
            (Some(_), Some(size)) => size,
            _ => Size::ZERO,
        }
    }

    fn draw_content(&self, surface: &mut dyn Surface, _clip: Rect) -> Result<(), DrawError> {
        let Some(data) = self.image_data.as_deref() else {
            return Ok(());
        };

        let natural = self.natural_size();
        if self.content_mode != ContentMode::ScaleToFill
            && (natural.width <= 0.0 || natural.height <= 0.0)
        {
            return Err(DrawError::Unsupported(format!(
                "{:?} placement needs the image pixel size",
                self.content_mode
            )));
        }

        let dest = self.content_rect();
        if dest.area() <= 0.0 {
            return Ok(());
        }

        surface.clip_to_rect(self.common.transform.local_bounds());
        surface.draw_image(data, dest)
    }
}

/// Base64 (standard alphabet) encoding for embedded image bytes
mod encoded_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(data: &Option<Arc<[u8]>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Arc<[u8]>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| {
                STANDARD
                    .decode(s.as_bytes())
                    .map(Arc::from)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
