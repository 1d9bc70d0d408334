//! Configuration options for pick resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PickError, Result};
use crate::pick::{IdentityColor, BACKGROUND_COLOR};

/// What to do with a pick coordinate outside the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutOfBoundsPolicy {
    /// Reject the pick; the selection becomes none.
    #[default]
    Reject,
    /// Clamp the coordinate to the nearest edge pixel.
    Clamp,
}

/// Options for the picking resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickOptions {
    /// Number of selectable objects drawn in the identity pass.
    pub object_count: u32,

    /// Clear colour of the identity pass. Must not encode a live handle.
    pub background_color: IdentityColor,

    /// Handling of pick coordinates outside the framebuffer.
    pub out_of_bounds: OutOfBoundsPolicy,

    /// Whether to log every sampled pixel at debug level.
    pub log_pixels: bool,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            object_count: 10,
            background_color: BACKGROUND_COLOR,
            out_of_bounds: OutOfBoundsPolicy::Reject,
            log_pixels: true,
        }
    }
}

impl PickOptions {
    /// Creates default options for a scene of `object_count` objects.
    pub fn with_object_count(object_count: u32) -> Self {
        Self {
            object_count,
            ..Self::default()
        }
    }

    /// Parses options from a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serializes the options as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that the background colour cannot be mistaken for an object.
    pub fn validate(&self) -> Result<()> {
        let background = self.background_color.to_u32();
        if background < self.object_count {
            return Err(PickError::configuration(format!(
                "background colour {:?} encodes live handle {background} (object count {})",
                self.background_color.to_array(),
                self.object_count
            )));
        }
        Ok(())
    }
}
