//! Compositor configuration.

use serde::{Deserialize, Serialize};

use crate::render::TextureFilter;

/// Settings fixed when a compositor is created.
///
/// Every field has a default, so a partial JSON object (or `{}`) is a
/// valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Declare `iMask`/`iMaskEnabled` in every shader and honor masks.
    pub mask_support: bool,
    /// Sampling filter for every texture and framebuffer.
    pub filter: TextureFilter,
    /// Flip uploaded rows to GL's bottom-up order.
    pub flip_y: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            mask_support: true,
            filter: TextureFilter::Linear,
            flip_y: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_masks_and_flip() {
        let config = CompositorConfig::default();
        assert!(config.mask_support);
        assert!(config.flip_y);
        assert_eq!(config.filter, TextureFilter::Linear);
    }

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let config: CompositorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CompositorConfig::default());
    }

    #[test]
    fn partial_object_overrides_named_fields() {
        let config: CompositorConfig =
            serde_json::from_str(r#"{"filter": "nearest", "mask_support": false}"#).unwrap();
        assert_eq!(config.filter, TextureFilter::Nearest);
        assert!(!config.mask_support);
        assert!(config.flip_y);
    }
}
